use std::sync::Arc;

use image::Rgba32FImage;
use progressive_rt::{
    kernel::CpuKernels,
    math::{point::Point, vec::Vec3},
    renderer::Renderer,
    resources::{CpuDevice, Device},
    scene::{
        examples::CornellBoxScene,
        material::RayTracingMaterial,
        mesh::{Mesh, MeshChunk, Triangle, TRIANGLE_LIMIT},
        SceneRegistry,
    },
    settings::RenderSettings,
};

const WIDTH: u32 = 16;
const HEIGHT: u32 = 12;

fn settings() -> RenderSettings {
    RenderSettings {
        num_rays_per_pixel: 2,
        max_bounce_count: 3,
        ..Default::default()
    }
}

fn cornell() -> SceneRegistry {
    let mut scene = SceneRegistry::new();
    CornellBoxScene::insert_into(&mut scene);
    scene
}

fn accumulate(scene: &SceneRegistry, settings: RenderSettings, frames: u32) -> Rgba32FImage {
    let device: Arc<dyn Device> = Arc::new(CpuDevice::new());
    let mut renderer = Renderer::new(device.clone(), Box::new(CpuKernels), settings);
    renderer.initialize().unwrap();
    let camera = CornellBoxScene::camera(WIDTH as f32 / HEIGHT as f32);
    let mut image = Rgba32FImage::new(WIDTH, HEIGHT);
    for _ in 0..frames {
        renderer.render_frame(scene, &camera, &mut image).unwrap();
    }
    assert_eq!(renderer.frame_index(), frames);
    renderer.shutdown();
    assert_eq!(device.live_buffers(), 0);
    image
}

fn distance(a: &Rgba32FImage, b: &Rgba32FImage) -> f32 {
    let sum: f32 = a
        .pixels()
        .zip(b.pixels())
        .map(|(p, q)| (0..3).map(|c| (p.0[c] - q.0[c]).powi(2)).sum::<f32>())
        .sum();
    (sum / (a.width() * a.height()) as f32).sqrt()
}

#[test]
fn accumulated_image_is_well_formed() {
    let image = accumulate(&cornell(), settings(), 4);
    for p in image.pixels() {
        assert!(p.0.iter().all(|c| c.is_finite() && *c >= 0.0), "{p:?}");
        assert_eq!(p.0[3], 1.0);
    }
    // The box is lit
    let mean: f32 = image.pixels().map(|p| p.0[0]).sum::<f32>() / (WIDTH * HEIGHT) as f32;
    assert!(mean > 0.0);
}

#[test]
fn reproducible() {
    let a = accumulate(&cornell(), settings(), 3);
    let b = accumulate(&cornell(), settings(), 3);
    assert_eq!(a, b);
}

#[test]
fn converges() {
    let scene = cornell();
    let reference = accumulate(&scene, settings(), 96);
    let early = distance(&accumulate(&scene, settings(), 1), &reference);
    let late = distance(&accumulate(&scene, settings(), 24), &reference);
    assert!(late < early, "{late} >= {early}");
}

#[test]
fn importance_sampling_agrees() {
    let scene = cornell();
    let plain = accumulate(&scene, settings(), 48);
    let sampled = accumulate(
        &scene,
        RenderSettings {
            use_importance_sampling: true,
            ..settings()
        },
        48,
    );
    let mean = |image: &Rgba32FImage| {
        image
            .pixels()
            .map(|p| Vec3::new(p.0[0], p.0[1], p.0[2]))
            .fold(Vec3::ZERO, |a, b| a + b)
            / (WIDTH * HEIGHT) as f32
    };
    let (plain, sampled) = (mean(&plain), mean(&sampled));
    assert!((plain - sampled).length() < 0.2 * plain.length(), "{plain} {sampled}");
}

#[test]
fn oversized_chunk_is_left_out() {
    let mut scene = cornell();
    let reference = accumulate(&scene, settings(), 2);

    // A wall of tiny triangles in front of the camera, in a single chunk over the limit
    let triangles: Vec<Triangle> = (0..TRIANGLE_LIMIT + 1)
        .map(|i| {
            let x = -1.0 + 2.0 * i as f32 / TRIANGLE_LIMIT as f32;
            Triangle::flat(
                Point::new(x, 0.0, 2.0),
                Point::new(x + 0.01, 0.0, 2.0),
                Point::new(x, 2.0, 2.0),
            )
        })
        .collect();
    scene.register(Mesh::from_chunks(
        "too large",
        vec![MeshChunk::new(triangles, 0)],
        vec![RayTracingMaterial::diffuse(Vec3::ZERO)],
    ));

    let image = accumulate(&scene, settings(), 2);
    assert_eq!(image, reference);
}
