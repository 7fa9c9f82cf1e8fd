mod output;
mod progress;
mod utils;

use std::{io::Write, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use image::Rgba32FImage;
use itertools::Itertools;
use output::FileOutput;
use progress::FrameProgress;
use progressive_rt::{
    accumulation::RenderMode,
    kernel::CpuKernels,
    renderer::Renderer,
    resources::{CpuDevice, Device},
    scene::SceneRegistry,
    settings::{EnvironmentSettings, RenderSettings},
    math::stat::RunningStats,
    utils::timer::{format_elapsed, timed_scope_log},
};
use utils::{AvailableScene, Dimensions};

#[derive(Parser, Debug)]
/// Progressive path tracer: renders and accumulates frames of an example scene, then saves the
/// converged image.
pub struct Args {
    #[arg(short, long, default_value = "400x300")]
    /// Screen dimension in format `width`x`height`
    dimensions: Dimensions,

    #[arg(short, long, default_value_t = 64)]
    /// Number of accumulated frames
    frames: u32,

    #[arg(long, default_value_t = 10)]
    /// Rays per pixel and per frame
    rays: u32,

    #[arg(long, default_value_t = 4)]
    /// Maximum number of bounces of a path
    bounces: u32,

    #[arg(long, default_value_t = 0.3)]
    /// Anti aliasing jitter radius, in pixel
    diverge: f32,

    #[arg(long, default_value_t = 0.0)]
    /// Lens blur radius, in pixel
    defocus: f32,

    #[arg(long)]
    /// Sample the emissive mesh chunks directly at each bounce
    importance: bool,

    #[arg(long, default_value_t = 1)]
    /// Light samples per bounce when `--importance` is set
    light_samples: u32,

    #[arg(long)]
    /// Render with a black environment
    no_environment: bool,

    #[arg(long, value_enum, default_value_t)]
    /// Scene selector
    scene: AvailableScene,

    #[arg(short, long, default_value = "output")]
    /// Output directory, images are written in `hdr/` and `ldr/` subdirectories
    output: PathBuf,

    #[arg(long)]
    /// Render a single frame without accumulation
    preview: bool,

    #[arg(long)]
    /// Fail on out of range options instead of clamping them
    strict: bool,
}

impl Args {
    fn settings(&self) -> Result<RenderSettings> {
        let mut settings = RenderSettings {
            max_bounce_count: self.bounces,
            num_rays_per_pixel: self.rays,
            diverge_strength: self.diverge,
            defocus_strength: self.defocus,
            light_samples: self.light_samples,
            use_importance_sampling: self.importance,
            environment: EnvironmentSettings {
                enabled: !self.no_environment,
                ..Default::default()
            },
        };

        if self.strict {
            return settings.validated().context("invalid render settings");
        }
        let adjustments = settings.validate();
        if !adjustments.is_empty() {
            log::info!("settings adjusted: {}", adjustments.iter().join(", "));
        }
        Ok(settings)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let settings = args.settings()?;

    log::info!("loading scene {:?}", args.scene);
    let mut scene = SceneRegistry::new();
    args.scene.insert_into(&mut scene);
    let camera = args.scene.camera(args.dimensions.aspect());

    let device: Arc<dyn Device> = Arc::new(CpuDevice::new());
    let mut renderer = Renderer::new(device, Box::new(CpuKernels), settings);
    renderer.initialize()?;

    let frames = if args.preview {
        renderer.set_mode(RenderMode::Preview);
        1
    } else {
        args.frames.max(1)
    };

    let mut image = Rgba32FImage::new(args.dimensions.width, args.dimensions.height);
    log::info!("rendering {frames} frames at {}", args.dimensions);
    let mut trace_times = RunningStats::new();
    timed_scope_log("Progressive render", || -> Result<()> {
        for done in 1..=frames {
            let report = renderer
                .render_frame(&scene, &camera, &mut image)
                .with_context(|| format!("rendering frame {}", done - 1))?;
            if !report.passed_through {
                trace_times.push(report.trace_time.as_secs_f32());
            }
            print!("\r{}", FrameProgress { done, total: frames });
            std::io::stdout().flush()?;
        }
        println!();
        Ok(())
    })
    .res?;

    if trace_times.count() > 1 {
        log::info!(
            "trace kernel: {} per frame, std dev {}",
            format_elapsed(Duration::from_secs_f32(trace_times.mean())),
            format_elapsed(Duration::from_secs_f32(trace_times.std_dev()))
        );
    }

    if let Some(stats) = renderer.scene_stats() {
        log::info!(
            "scene: {} spheres, {} mesh chunks, {} triangles, {} lights",
            stats.num_spheres,
            stats.num_mesh_chunks,
            stats.num_triangles,
            stats.num_lights
        );
    }

    let name = format!("{:?}", args.scene).to_lowercase();
    for path in FileOutput::new(&args.output).commit(&image, &name)? {
        log::info!("wrote {}", path.display());
    }

    renderer.shutdown();
    log::info!("Done");
    Ok(())
}
