use glam::Vec3;

use crate::{
    camera::CameraFrame,
    math::point::Point,
    scene::{
        material::RayTracingMaterial,
        mesh::{Mesh, Triangle},
        SceneRegistry, Sphere,
    },
};

/// A box open towards +z, red on the left, green on the right, with a light in the ceiling.
///
/// The box spans `[-1, 1] x [0, 2] x [-1, 1]`.
pub struct CornellBoxScene;

fn quad(scene: &mut SceneRegistry, label: &str, origin: Point, u: Vec3, v: Vec3, material: RayTracingMaterial) {
    let triangles: Vec<Triangle> = Mesh::quad_triangles(origin, u, v).to_vec();
    scene.register(Mesh::from_triangles(label, triangles, material));
}

impl CornellBoxScene {
    pub fn insert_into(scene: &mut SceneRegistry) {
        let white = RayTracingMaterial::diffuse(Vec3::splat(0.75));
        let red = RayTracingMaterial::diffuse(Vec3::new(0.75, 0.1, 0.1));
        let green = RayTracingMaterial::diffuse(Vec3::new(0.1, 0.75, 0.1));
        let light = RayTracingMaterial::emissive(Vec3::new(1.0, 0.9, 0.75), 10.0);

        let corner = Point::new(-1.0, 0.0, -1.0);
        quad(scene, "floor", corner, 2.0 * Vec3::X, 2.0 * Vec3::Z, white);
        quad(scene, "ceiling", corner + 2.0 * Vec3::Y, 2.0 * Vec3::X, 2.0 * Vec3::Z, white);
        quad(scene, "back wall", corner, 2.0 * Vec3::X, 2.0 * Vec3::Y, white);
        quad(scene, "left wall", corner, 2.0 * Vec3::Z, 2.0 * Vec3::Y, red);
        quad(scene, "right wall", corner + 2.0 * Vec3::X, 2.0 * Vec3::Z, 2.0 * Vec3::Y, green);
        quad(
            scene,
            "light",
            Point::new(-0.3, 1.99, -0.3),
            0.6 * Vec3::X,
            0.6 * Vec3::Z,
            light,
        );

        scene.register(Sphere {
            center: Point::new(-0.45, 0.4, -0.35),
            radius: 0.4,
            material: RayTracingMaterial::glossy(Vec3::splat(0.9), Vec3::ONE, 1.0, 1.0),
        });
        scene.register(Sphere {
            center: Point::new(0.45, 0.35, 0.3),
            radius: 0.35,
            material: RayTracingMaterial::glossy(Vec3::new(0.8, 0.8, 0.3), Vec3::ONE, 0.8, 0.1),
        });
    }

    pub fn camera(aspect: f32) -> CameraFrame {
        CameraFrame::look_at(
            Point::new(0.0, 1.0, 3.6),
            Point::new(0.0, 1.0, 0.0),
            Vec3::Y,
            f32::to_radians(40.0),
            3.6,
            aspect,
        )
    }
}
