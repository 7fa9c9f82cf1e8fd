use std::hash::{Hash, Hasher};

use bytemuck::{Pod, Zeroable};

use super::{
    material::RayTracingMaterial,
    mesh::{Mesh, MeshChunk, Triangle, TRIANGLE_LIMIT},
    SceneRegistry, Sphere,
};
use crate::utils::{counter::counter, timer::timed_scope_accumulate};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuSphere {
    pub position: [f32; 3],
    pub radius: f32,
    pub material: RayTracingMaterial,
}

impl From<&Sphere> for GpuSphere {
    fn from(s: &Sphere) -> Self {
        Self {
            position: s.center.to_array(),
            radius: s.radius,
            material: s.material,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuTriangle {
    pub pos_a: [f32; 3],
    pub pos_b: [f32; 3],
    pub pos_c: [f32; 3],
    pub normal_a: [f32; 3],
    pub normal_b: [f32; 3],
    pub normal_c: [f32; 3],
}

impl From<&Triangle> for GpuTriangle {
    fn from(t: &Triangle) -> Self {
        Self {
            pos_a: t.a.to_array(),
            pos_b: t.b.to_array(),
            pos_c: t.c.to_array(),
            normal_a: t.normal_a.to_array(),
            normal_b: t.normal_b.to_array(),
            normal_c: t.normal_c.to_array(),
        }
    }
}

/// Header of a mesh chunk: where its triangles are in the triangle buffer, and what they look like
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuMeshInfo {
    pub first_triangle: u32,
    pub num_triangles: u32,
    pub material: RayTracingMaterial,
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error("mesh `{mesh}`: chunk {chunk} has {triangles} triangles, over the limit of {limit}. It is left out of the scene")]
    ChunkTooLarge {
        mesh: String,
        chunk: usize,
        triangles: usize,
        limit: usize,
    },
}

/// Flat primitive lists, ready to be uploaded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneBuffers {
    pub spheres: Vec<GpuSphere>,
    pub triangles: Vec<GpuTriangle>,
    pub mesh_info: Vec<GpuMeshInfo>,
    /// Indices into `mesh_info` of the emissive chunks
    pub lights: Vec<u32>,
}

impl SceneBuffers {
    /// Hash of the whole content. Two assemblies of the same scene have the same fingerprint.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        hash_pod(&self.spheres, &mut hasher);
        hash_pod(&self.triangles, &mut hasher);
        hash_pod(&self.mesh_info, &mut hasher);
        hash_pod(&self.lights, &mut hasher);
        hasher.finish()
    }
}

fn hash_pod<T: Pod, H: Hasher>(data: &[T], hasher: &mut H) {
    data.len().hash(hasher);
    bytemuck::cast_slice::<T, u8>(data).hash(hasher);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub num_spheres: usize,
    pub num_mesh_chunks: usize,
    pub num_triangles: usize,
    pub num_lights: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub buffers: SceneBuffers,
    pub fingerprint: u64,
    /// Configuration errors found while assembling. The faulty parts are not in `buffers`.
    pub errors: Vec<SceneError>,
}

impl Assembly {
    pub fn stats(&self) -> AssemblyStats {
        AssemblyStats {
            num_spheres: self.buffers.spheres.len(),
            num_mesh_chunks: self.buffers.mesh_info.len(),
            num_triangles: self.buffers.triangles.len(),
            num_lights: self.buffers.lights.len(),
        }
    }
}

fn push_chunk(buffers: &mut SceneBuffers, mesh: &Mesh, chunk: &MeshChunk) {
    let material = mesh.material(chunk);
    let mesh_index = buffers.mesh_info.len() as u32;

    buffers.mesh_info.push(GpuMeshInfo {
        first_triangle: buffers.triangles.len() as u32,
        num_triangles: chunk.len() as u32,
        material,
        bounds_min: chunk.bounds.min.to_array(),
        bounds_max: chunk.bounds.max.to_array(),
    });
    buffers
        .triangles
        .extend(chunk.triangles.iter().map(GpuTriangle::from));

    if material.is_emissive() {
        buffers.lights.push(mesh_index);
    }
}

/// Flatten every registered object into [SceneBuffers].
///
/// Chunks over [TRIANGLE_LIMIT] are reported and skipped, the rest of the scene is kept.
pub fn assemble(registry: &SceneRegistry) -> Assembly {
    let mut buffers = SceneBuffers {
        spheres: registry.spheres().map(GpuSphere::from).collect(),
        ..Default::default()
    };
    let mut errors = Vec::new();

    for mesh in registry.meshes() {
        for (index, chunk) in mesh.chunks.iter().enumerate() {
            if chunk.len() > TRIANGLE_LIMIT {
                let err = SceneError::ChunkTooLarge {
                    mesh: mesh.label.clone(),
                    chunk: index,
                    triangles: chunk.len(),
                    limit: TRIANGLE_LIMIT,
                };
                log::error!("{err}");
                errors.push(err);
                continue;
            }
            push_chunk(&mut buffers, mesh, chunk);
        }
    }

    Assembly {
        fingerprint: buffers.fingerprint(),
        buffers,
        errors,
    }
}

/// Keeps the last assembly and only rebuilds it when the registry changed
#[derive(Debug, Default)]
pub struct SceneAssembler {
    revision: Option<u64>,
    assembly: Assembly,
}

impl SceneAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the buffers were rebuilt
    pub fn refresh(&mut self, registry: &SceneRegistry) -> bool {
        if self.revision == Some(registry.revision()) {
            return false;
        }

        counter!("Scene assemblies");
        self.assembly = timed_scope_accumulate!("Scene assembly", || assemble(registry));
        self.revision = Some(registry.revision());

        let stats = self.assembly.stats();
        log::debug!(
            "scene assembled: {} spheres, {} mesh chunks, {} triangles, {} lights",
            stats.num_spheres,
            stats.num_mesh_chunks,
            stats.num_triangles,
            stats.num_lights
        );
        true
    }

    pub fn assembly(&self) -> &Assembly {
        &self.assembly
    }

    pub fn buffers(&self) -> &SceneBuffers {
        &self.assembly.buffers
    }

    pub fn fingerprint(&self) -> u64 {
        self.assembly.fingerprint
    }

    pub fn errors(&self) -> &[SceneError] {
        &self.assembly.errors
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::math::point::Point;

    fn triangles(n: usize, z: f32) -> Vec<Triangle> {
        (0..n)
            .map(|i| {
                let x = i as f32;
                Triangle::flat(
                    Point::new(x, 0., z),
                    Point::new(x + 1., 0., z),
                    Point::new(x, 1., z),
                )
            })
            .collect()
    }

    fn material(emission: f32) -> RayTracingMaterial {
        RayTracingMaterial {
            emission_strength: emission,
            ..Default::default()
        }
    }

    #[test]
    fn layouts() {
        assert_eq!(std::mem::size_of::<GpuSphere>(), 80);
        assert_eq!(std::mem::size_of::<GpuTriangle>(), 72);
        assert_eq!(std::mem::size_of::<GpuMeshInfo>(), 96);
    }

    #[test]
    fn light_indices() {
        let mut scene = SceneRegistry::new();
        scene.register(Mesh::from_chunks(
            "abc",
            vec![
                MeshChunk::new(triangles(2, 0.), 0),
                MeshChunk::new(triangles(3, 1.), 1),
                MeshChunk::new(triangles(1, 2.), 2),
            ],
            vec![material(0.0), material(0.5), material(0.0)],
        ));

        let assembly = assemble(&scene);
        assert_eq!(assembly.buffers.lights, vec![1]);
        assert!(assembly.errors.is_empty());
    }

    #[test]
    fn ranges_are_contiguous() {
        let mut scene = SceneRegistry::new();
        scene.register(Mesh::from_triangles("a", triangles(4, 0.), material(0.)));
        scene.register(Mesh::from_triangles("b", triangles(1600, 1.), material(1.)));

        let assembly = assemble(&scene);
        let info = &assembly.buffers.mesh_info;
        let ranges: Vec<_> = info
            .iter()
            .map(|i| (i.first_triangle, i.num_triangles))
            .collect();
        assert_eq!(ranges, vec![(0, 4), (4, 1500), (1504, 100)]);
        assert_eq!(assembly.buffers.triangles.len(), 1604);
        assert_eq!(assembly.buffers.lights, vec![1, 2]);
        assert_eq!(info[2].bounds_min, [1500., 0., 1.]);
        assert_eq!(info[2].bounds_max, [1600., 1., 1.]);

        // Triangles of a chunk are where its header says
        let t = &assembly.buffers.triangles[info[1].first_triangle as usize];
        assert_eq!(t.pos_a, [0., 0., 1.]);
    }

    #[test]
    fn oversized_chunk_is_reported_and_skipped() {
        let mut scene = SceneRegistry::new();
        scene.register(Mesh::from_chunks(
            "big",
            vec![
                MeshChunk::new(triangles(10, 0.), 0),
                MeshChunk::new(triangles(1501, 0.), 0),
                MeshChunk::new(triangles(1500, 0.), 1),
            ],
            vec![material(0.), material(2.)],
        ));
        scene.register(Sphere {
            center: Point::ORIGIN,
            radius: 1.0,
            material: material(0.),
        });

        let assembly = assemble(&scene);
        assert_eq!(
            assembly.errors,
            vec![SceneError::ChunkTooLarge {
                mesh: "big".into(),
                chunk: 1,
                triangles: 1501,
                limit: TRIANGLE_LIMIT
            }]
        );
        assert!(assembly.errors[0].to_string().contains("big"));

        let stats = assembly.stats();
        assert_eq!(stats.num_mesh_chunks, 2);
        assert_eq!(stats.num_triangles, 1510);
        assert_eq!(stats.num_spheres, 1);
        // The index of the light is its position after the skipped chunk
        assert_eq!(assembly.buffers.lights, vec![1]);
        assert_eq!(assembly.buffers.mesh_info[1].first_triangle, 10);
    }

    #[test]
    fn spheres() {
        let mut scene = SceneRegistry::new();
        scene.register(Sphere::from_transform(
            Point::new(1., 2., 3.),
            Vec3::splat(2.),
            material(0.),
        ));
        let assembly = assemble(&scene);
        assert_eq!(assembly.buffers.spheres[0].position, [1., 2., 3.]);
        assert_eq!(assembly.buffers.spheres[0].radius, 1.);
        // Emissive spheres are not in the light list, only mesh chunks are
        assert!(assembly.buffers.lights.is_empty());
    }

    #[test]
    fn refresh_only_on_change() {
        let mut scene = SceneRegistry::new();
        let id = scene.register(Sphere::from_transform(Point::ORIGIN, Vec3::ONE, material(0.)));

        let mut assembler = SceneAssembler::new();
        assert!(assembler.refresh(&scene));
        let fingerprint = assembler.fingerprint();
        assert!(!assembler.refresh(&scene));

        // A mutable access rebuilds, but an unchanged content keeps its fingerprint
        scene.get_mut(id);
        assert!(assembler.refresh(&scene));
        assert_eq!(assembler.fingerprint(), fingerprint);

        if let Some(crate::scene::SceneObject::Sphere(s)) = scene.get_mut(id) {
            s.radius = 3.0;
        }
        assert!(assembler.refresh(&scene));
        assert_ne!(assembler.fingerprint(), fingerprint);
        assert_eq!(assembler.buffers().spheres[0].radius, 3.0);
    }

    #[test]
    fn empty_scene() {
        let assembly = assemble(&SceneRegistry::new());
        assert_eq!(assembly.stats(), AssemblyStats::default());
        assert!(assembly.errors.is_empty());
    }
}
