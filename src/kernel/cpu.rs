use rayon::prelude::*;

use super::{GpuEnvironment, TraceInputs, TraceKernel, TraceParams};
use crate::{
    camera::{CameraRayGenerator, Jitter},
    math::{
        bounds::Bounds,
        distributions::{Samplable, UniformTriangle, UniformUnitSphere3},
        point::Point,
        vec::{ColorExt, ReflectVecExt, Vec3, Vec3SameDirExt},
    },
    ray::Ray,
    resources::{RenderTarget, Texel},
    rng::HashRng,
    scene::{
        assembler::{GpuMeshInfo, GpuSphere, GpuTriangle},
        material::{MaterialFlag, RayTracingMaterial},
        BOUNDS_MARGIN,
    },
    utils::{counter::counter, log_once::error_once},
};

/// Offset applied to secondary ray origins to leave the surface they start on
const SURFACE_EPSILON: f32 = 1e-4;

/// Reference path tracer, one rayon task per row.
///
/// Every pixel is seeded with [HashRng::for_pixel], so the image only depends on the inputs.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuTraceKernel;

impl TraceKernel for CpuTraceKernel {
    fn name(&self) -> &str {
        "cpu path tracer"
    }

    fn dispatch(&self, inputs: &TraceInputs<'_>, output: &RenderTarget) -> anyhow::Result<()> {
        let params = &inputs.params;
        let spheres = inputs.spheres.read()?;
        let triangles = inputs.triangles.read()?;
        let meshes = inputs.mesh_info.read()?;
        let lights = inputs.lights.read()?;

        let world = World {
            spheres: &spheres[..(params.num_spheres as usize).min(spheres.len())],
            triangles: &triangles,
            meshes: &meshes[..(params.num_meshes as usize).min(meshes.len())],
            lights: &lights[..(params.num_lights as usize).min(lights.len())],
            params,
        };

        let (width, height) = output.size();
        anyhow::ensure!(
            (width, height) == (params.width, params.height),
            "output is {width}x{height} but the parameters are for {}x{}",
            params.width,
            params.height
        );

        let generator = CameraRayGenerator::new(
            params.camera.frame(),
            width,
            height,
            Jitter {
                diverge_strength: params.diverge_strength,
                defocus_strength: params.defocus_strength,
            },
        );

        let mut texels = vec![Texel::default(); width as usize * height as usize];
        texels
            .par_chunks_mut(width.max(1) as usize)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, texel) in row.iter_mut().enumerate() {
                    counter!("Pixels traced");
                    let (x, y) = (x as u32, y as u32);
                    let mut rng = HashRng::for_pixel(x, y, width, params.frame);

                    let rays = params.num_rays_per_pixel.max(1);
                    let mut total = Vec3::ZERO;
                    for _ in 0..rays {
                        let ray = generator.ray(x, y, &mut rng);
                        total += world.trace(ray, &mut rng);
                    }

                    let color = total / rays as f32;
                    *texel = color.extend(1.0).to_array();
                }
            });

        output.write_texels(&texels)?;
        Ok(())
    }
}

struct Hit {
    t: f32,
    point: Point,
    normal: Vec3,
    material: RayTracingMaterial,
    /// Index of the mesh chunk, None for spheres
    mesh: Option<usize>,
}

struct World<'a> {
    spheres: &'a [GpuSphere],
    triangles: &'a [GpuTriangle],
    meshes: &'a [GpuMeshInfo],
    lights: &'a [u32],
    params: &'a TraceParams,
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn v3(a: [f32; 3]) -> Vec3 {
    Vec3::from_array(a)
}

fn v4(a: [f32; 4]) -> Vec3 {
    Vec3::new(a[0], a[1], a[2])
}

/// Sky gradient, ground and sun. Black when the environment is disabled.
pub fn environment_light(env: &GpuEnvironment, direction: Vec3) -> Vec3 {
    if env.enabled == 0 {
        return Vec3::ZERO;
    }
    let sky_gradient_t = smoothstep(0.0, 0.4, direction.y).powf(0.35);
    let ground_to_sky_t = smoothstep(-0.01, 0.0, direction.y);
    let sky_gradient = v4(env.sky_color_horizon).lerp(v4(env.sky_color_zenith), sky_gradient_t);

    let sun = direction.dot(-v4(env.sun_direction)).max(0.0).powf(env.sun_focus) * env.sun_intensity;
    let sun_mask = if ground_to_sky_t >= 1.0 { 1.0 } else { 0.0 };

    v4(env.ground_color).lerp(sky_gradient, ground_to_sky_t) + Vec3::splat(sun * sun_mask)
}

fn hit_sphere(sphere: &GpuSphere, ray: &Ray) -> Option<f32> {
    let oc = ray.origin.vec() - v3(sphere.position);
    let b = oc.dot(ray.direction);
    let c = oc.length_squared() - sphere.radius * sphere.radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let t = -b - discriminant.sqrt();
    (t > 0.0).then_some(t)
}

/// Möller-Trumbore, both faces. Returns the distance and the barycentric weights of b and c.
fn hit_triangle(tri: &GpuTriangle, ray: &Ray) -> Option<(f32, f32, f32)> {
    let a = v3(tri.pos_a);
    let edge_ab = v3(tri.pos_b) - a;
    let edge_ac = v3(tri.pos_c) - a;
    let p = ray.direction.cross(edge_ac);
    let det = edge_ab.dot(p);
    if det.abs() < 1e-9 {
        return None;
    }
    let inv_det = 1.0 / det;
    let ao = ray.origin.vec() - a;
    let u = ao.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = ao.cross(edge_ab);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge_ac.dot(q) * inv_det;
    (t > 0.0).then_some((t, u, v))
}

impl<'a> World<'a> {
    fn mesh_bounds(mesh: &GpuMeshInfo) -> Bounds {
        Bounds {
            min: Point::from_array(mesh.bounds_min),
            max: Point::from_array(mesh.bounds_max),
        }
        .padded(BOUNDS_MARGIN)
    }

    fn closest_hit(&self, ray: &Ray) -> Option<Hit> {
        let mut closest: Option<Hit> = None;
        let mut t_max = f32::INFINITY;

        for sphere in self.spheres {
            if let Some(t) = hit_sphere(sphere, ray).filter(|t| *t < t_max) {
                t_max = t;
                let point = ray.at(t);
                closest = Some(Hit {
                    t,
                    point,
                    normal: (point.vec() - v3(sphere.position)).normalize(),
                    material: sphere.material,
                    mesh: None,
                });
            }
        }

        for (index, mesh) in self.meshes.iter().enumerate() {
            if !Self::mesh_bounds(mesh).hit(ray) {
                continue;
            }
            let first = mesh.first_triangle as usize;
            let last = (first + mesh.num_triangles as usize).min(self.triangles.len());
            for tri in &self.triangles[first.min(last)..last] {
                if let Some((t, u, v)) = hit_triangle(tri, ray).filter(|(t, ..)| *t < t_max) {
                    t_max = t;
                    let w = 1.0 - u - v;
                    let normal = (v3(tri.normal_a) * w + v3(tri.normal_b) * u + v3(tri.normal_c) * v)
                        .try_normalize()
                        .unwrap_or_else(|| {
                            (v3(tri.pos_b) - v3(tri.pos_a))
                                .cross(v3(tri.pos_c) - v3(tri.pos_a))
                                .normalize_or_zero()
                        });
                    closest = Some(Hit {
                        t,
                        point: ray.at(t),
                        normal,
                        material: mesh.material,
                        mesh: Some(index),
                    });
                }
            }
        }

        closest
    }

    /// True if something is hit before `distance`
    fn occluded(&self, ray: &Ray, distance: f32) -> bool {
        self.closest_hit(ray)
            .map(|hit| hit.t < distance * (1.0 - 1e-3))
            .unwrap_or(false)
    }

    /// Radiance reaching `point` from the emissive mesh chunks, for a white lambertian surface
    fn direct_light(&self, point: Point, normal: Vec3, rng: &mut HashRng) -> Vec3 {
        let samples = self.params.light_samples.max(1);
        let mut total = Vec3::ZERO;
        for _ in 0..samples {
            let pick = (rng.next_value() * self.lights.len() as f32) as usize;
            let light = self.lights[pick.min(self.lights.len() - 1)];
            let Some(mesh) = self.meshes.get(light as usize) else {
                error_once!("light {light} is not a mesh chunk, {} chunks", self.meshes.len());
                continue;
            };
            if mesh.num_triangles == 0 {
                continue;
            }
            let tri_pick = (rng.next_value() * mesh.num_triangles as f32) as usize;
            let tri_index = mesh.first_triangle as usize + tri_pick.min(mesh.num_triangles as usize - 1);
            let Some(tri) = self.triangles.get(tri_index) else {
                continue;
            };

            let bary = UniformTriangle.sample_hashed(rng);
            let a = v3(tri.pos_a);
            let b = v3(tri.pos_b);
            let c = v3(tri.pos_c);
            let light_point = Point(a + (b - a) * bary.x + (c - a) * bary.y);
            let light_normal = (b - a).cross(c - a);
            let area = 0.5 * light_normal.length();
            if area <= 0.0 {
                continue;
            }

            let to_light = point.to(light_point);
            let distance = to_light.length();
            let dir = to_light / distance;
            let cos_surface = normal.dot(dir);
            let cos_light = light_normal.normalize().dot(-dir).abs();
            if cos_surface <= 0.0 || distance <= SURFACE_EPSILON {
                continue;
            }

            let shadow_ray = Ray::leaving(point, normal * SURFACE_EPSILON, dir);
            if self.occluded(&shadow_ray, distance) {
                continue;
            }

            let inv_pdf = self.lights.len() as f32 * mesh.num_triangles as f32 * area;
            total += mesh.material.emitted() * cos_surface * cos_light * inv_pdf
                / (std::f32::consts::PI * distance * distance);
        }
        total / samples as f32
    }

    fn is_light(&self, mesh: Option<usize>) -> bool {
        mesh.map(|m| self.lights.contains(&(m as u32)))
            .unwrap_or(false)
    }

    fn trace(&self, mut ray: Ray, rng: &mut HashRng) -> Vec3 {
        let params = self.params;
        let importance = params.use_importance_sampling != 0 && !self.lights.is_empty();

        let mut incoming = Vec3::ZERO;
        let mut throughput = Vec3::ONE;
        // Light chunks already sampled at the previous vertex must not be counted twice
        let mut light_sampled = false;

        for bounce in 0..=params.max_bounce_count {
            let Some(hit) = self.closest_hit(&ray) else {
                incoming += environment_light(&params.environment, ray.direction) * throughput;
                break;
            };

            let mut material = hit.material;
            match material.flag() {
                MaterialFlag::InvisibleLight if bounce == 0 => {
                    ray = Ray::leaving(hit.point, ray.direction * 1e-3, ray.direction);
                    continue;
                }
                MaterialFlag::CheckerPattern => {
                    let p = hit.point.vec();
                    let cx = p.x.floor().rem_euclid(2.0);
                    let cz = p.z.floor().rem_euclid(2.0);
                    if cx != cz {
                        material.color = material.emission_color;
                    }
                }
                _ => (),
            }

            let normal = hit.normal.same_direction(-ray.direction);

            if !(light_sampled && self.is_light(hit.mesh)) {
                incoming += material.emitted() * throughput;
            }

            let is_specular = rng.next_value() < material.specular_probability;
            let diffuse_dir = (normal + UniformUnitSphere3.sample_hashed(rng))
                .try_normalize()
                .unwrap_or(normal);
            let specular_dir = ray.direction.reflect(normal);
            let smoothness = if is_specular { material.smoothness } else { 0.0 };
            let direction = diffuse_dir
                .lerp(specular_dir, smoothness)
                .try_normalize()
                .unwrap_or(normal);

            let albedo = if is_specular {
                material.specular_color()
            } else {
                material.color()
            };

            // The light found by the next segment, so never past the last bounce
            light_sampled = importance && !is_specular && bounce < params.max_bounce_count;
            if light_sampled {
                incoming += throughput * albedo * self.direct_light(hit.point, normal, rng);
            }

            throughput *= albedo;

            // Russian roulette
            let p = throughput.max_channel();
            if p <= 0.0 || rng.next_value() >= p {
                break;
            }
            throughput /= p;

            ray = Ray::leaving(hit.point, normal * SURFACE_EPSILON, direction);
        }

        incoming
    }
}
