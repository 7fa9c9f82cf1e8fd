use glam::Vec3;

use crate::{
    camera::CameraFrame,
    math::point::Point,
    scene::{
        material::{MaterialFlag, RayTracingMaterial},
        SceneRegistry, Sphere,
    },
};

/// A few spheres lying on a checkered ground sphere, lit by the sky and one emissive sphere
pub struct SpheresScene;

impl SpheresScene {
    pub fn insert_into(scene: &mut SceneRegistry) {
        let ground = RayTracingMaterial {
            emission_color: [0.35, 0.35, 0.4, 1.0],
            ..RayTracingMaterial::diffuse(Vec3::new(0.8, 0.8, 0.85))
        }
        .with_flag(MaterialFlag::CheckerPattern);
        scene.register(Sphere::from_transform(
            Point::new(0.0, -100.5, 0.0),
            Vec3::splat(200.0),
            ground,
        ));

        scene.register(Sphere {
            center: Point::new(-1.1, 0.0, -0.2),
            radius: 0.5,
            material: RayTracingMaterial::diffuse(Vec3::new(0.2, 0.9, 0.7)),
        });
        scene.register(Sphere {
            center: Point::new(0.0, 0.0, -0.6),
            radius: 0.5,
            material: RayTracingMaterial::glossy(Vec3::new(0.2, 0.4, 0.8), Vec3::ONE, 0.95, 0.3),
        });
        scene.register(Sphere {
            center: Point::new(1.1, -0.1, -0.2),
            radius: 0.4,
            material: RayTracingMaterial::glossy(Vec3::splat(0.9), Vec3::ONE, 1.0, 1.0),
        });
        scene.register(Sphere {
            center: Point::new(0.3, -0.35, 0.6),
            radius: 0.15,
            material: RayTracingMaterial::emissive(Vec3::new(1.0, 0.8, 0.5), 6.0),
        });
    }

    pub fn camera(aspect: f32) -> CameraFrame {
        CameraFrame::look_at(
            Point::new(0.0, 0.6, 3.0),
            Point::new(0.0, 0.0, -0.2),
            Vec3::Y,
            f32::to_radians(40.0),
            3.2,
            aspect,
        )
    }
}
