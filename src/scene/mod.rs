pub mod assembler;
pub mod examples;
pub mod material;
pub mod mesh;

use glam::Vec3;

use crate::{
    math::{bounds::Bounds, point::Point},
    ray::Ray,
};

use self::{material::RayTracingMaterial, mesh::Mesh};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Point,
    pub radius: f32,
    pub material: RayTracingMaterial,
}

impl Sphere {
    /// A unit sphere scaled by `scale`. Only uniform scales make sense, `scale.x` is used.
    pub fn from_transform(position: Point, scale: Vec3, material: RayTracingMaterial) -> Self {
        Self {
            center: position,
            radius: scale.x * 0.5,
            material,
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_center_half_size(self.center, Vec3::splat(self.radius.abs()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneObject {
    Sphere(Sphere),
    Mesh(Mesh),
}

impl SceneObject {
    pub fn bounds(&self) -> Bounds {
        match self {
            SceneObject::Sphere(s) => s.bounds(),
            SceneObject::Mesh(m) => m.bounds(),
        }
    }
}

impl From<Sphere> for SceneObject {
    fn from(s: Sphere) -> Self {
        SceneObject::Sphere(s)
    }
}

impl From<Mesh> for SceneObject {
    fn from(m: Mesh) -> Self {
        SceneObject::Mesh(m)
    }
}

/// Margin added to object bounds before hit testing them, so that planar meshes can be hit
pub const BOUNDS_MARGIN: f32 = 1e-4;

/// Handle returned when registering an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

/// Every ray traced object of the scene.
///
/// Objects are kept in registration order, which is the order they are assembled in.
/// The revision changes each time the content may have changed.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    objects: Vec<(ObjectId, SceneObject)>,
    next_id: u64,
    revision: u64,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, object: impl Into<SceneObject>) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.revision += 1;
        self.objects.push((id, object.into()));
        log::trace!("registered object {id:?}");
        id
    }

    pub fn deregister(&mut self, id: ObjectId) -> Option<SceneObject> {
        let index = self.objects.iter().position(|(i, _)| *i == id)?;
        self.revision += 1;
        log::trace!("deregistered object {id:?}");
        Some(self.objects.remove(index).1)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects
            .iter()
            .find_map(|(i, o)| (*i == id).then_some(o))
    }

    /// Mutable access to an object. The object is assumed modified.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        let object = self
            .objects
            .iter_mut()
            .find_map(|(i, o)| (*i == id).then_some(o))?;
        self.revision += 1;
        Some(object)
    }

    pub fn clear(&mut self) {
        if !self.objects.is_empty() {
            self.revision += 1;
        }
        self.objects.clear();
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter().map(|(i, o)| (*i, o))
    }

    pub fn spheres(&self) -> impl Iterator<Item = &Sphere> {
        self.objects.iter().filter_map(|(_, o)| match o {
            SceneObject::Sphere(s) => Some(s),
            SceneObject::Mesh(_) => None,
        })
    }

    pub fn meshes(&self) -> impl Iterator<Item = &Mesh> {
        self.objects.iter().filter_map(|(_, o)| match o {
            SceneObject::Mesh(m) => Some(m),
            SceneObject::Sphere(_) => None,
        })
    }

    /// Objects whose bounding box is hit by the ray, in registration order
    pub fn pick(&self, ray: &Ray) -> Vec<ObjectId> {
        self.iter()
            .filter(|(_, o)| o.bounds().padded(BOUNDS_MARGIN).hit(ray))
            .map(|(id, _)| id)
            .collect()
    }
}
