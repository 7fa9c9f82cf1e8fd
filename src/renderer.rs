//! The render loop.
//!
//! [Renderer] is driven by the host: [Renderer::initialize] once, [Renderer::render_frame] for
//! every displayed frame, then [Renderer::shutdown]. Everything that lives across frames is
//! held by a single [RendererState].

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use image::Rgba32FImage;

use crate::{
    accumulation::{AccumulationController, AccumulationPhase, FrameSignature, RenderMode},
    camera::CameraFrame,
    kernel::{AccumulateKernel, KernelProvider, PrimitiveCounts, TraceInputs, TraceKernel, TraceParams},
    resources::{Device, RenderTarget, StructuredBuffer, TargetSlot},
    scene::{
        assembler::{AssemblyStats, GpuMeshInfo, GpuSphere, GpuTriangle, SceneAssembler},
        SceneRegistry,
    },
    settings::{Adjustment, RenderSettings},
    utils::{
        counter::{counter, report_counters},
        log_once::warn_once,
        timer::timed_scope,
    },
};

/// What happened during a call to [Renderer::render_frame]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Index of the rendered frame in the accumulation
    pub frame_index: u32,
    /// The accumulated image was discarded before this frame
    pub reset: bool,
    /// The frame was blended into the accumulated image
    pub blended: bool,
    /// No trace kernel was available, the target was left untouched
    pub passed_through: bool,
    pub trace_time: Duration,
}

impl FrameReport {
    fn passed_through(frame_index: u32) -> Self {
        Self {
            frame_index,
            reset: false,
            blended: false,
            passed_through: true,
            trace_time: Duration::ZERO,
        }
    }
}

struct Kernels {
    trace: Box<dyn TraceKernel>,
    accumulate: Option<Box<dyn AccumulateKernel>>,
}

/// Everything kept from one frame to the next
pub struct RendererState {
    accumulation: AccumulationController,
    assembler: SceneAssembler,
    mode: RenderMode,

    spheres: StructuredBuffer<GpuSphere>,
    triangles: StructuredBuffer<GpuTriangle>,
    mesh_info: StructuredBuffer<GpuMeshInfo>,
    lights: StructuredBuffer<u32>,
    result: TargetSlot,

    /// Loaded on first use
    kernels: Option<Kernels>,
}

impl RendererState {
    fn new() -> Self {
        Self {
            accumulation: AccumulationController::new(),
            assembler: SceneAssembler::new(),
            mode: RenderMode::default(),
            spheres: StructuredBuffer::new("spheres"),
            triangles: StructuredBuffer::new("triangles"),
            mesh_info: StructuredBuffer::new("mesh info"),
            lights: StructuredBuffer::new("lights"),
            result: TargetSlot::new("result"),
            kernels: None,
        }
    }

    fn load_kernels(&mut self, provider: &dyn KernelProvider) -> Option<&Kernels> {
        if self.kernels.is_none() {
            let trace = provider.trace_kernel()?;
            let accumulate = provider.accumulate_kernel();
            match &accumulate {
                Some(k) => log::info!("kernels loaded: {}, {}", trace.name(), k.name()),
                None => log::warn!(
                    "kernel loaded: {}, no accumulate kernel: frames are shown without accumulation",
                    trace.name()
                ),
            }
            self.kernels = Some(Kernels { trace, accumulate });
        }
        self.kernels.as_ref()
    }

    /// Rebuild and upload the scene buffers if the registry changed
    fn sync_scene(&mut self, device: &Arc<dyn Device>, scene: &SceneRegistry) -> Result<()> {
        if !self.assembler.refresh(scene) {
            return Ok(());
        }

        let buffers = self.assembler.buffers();
        let uploaded = (|| -> Result<()> {
            self.spheres
                .upload(device, &buffers.spheres)
                .context("uploading spheres")?;
            self.triangles
                .upload(device, &buffers.triangles)
                .context("uploading triangles")?;
            self.mesh_info
                .upload(device, &buffers.mesh_info)
                .context("uploading mesh info")?;
            self.lights
                .upload(device, &buffers.lights)
                .context("uploading lights")?;
            Ok(())
        })();

        if uploaded.is_err() {
            // Upload again next frame
            self.assembler = SceneAssembler::new();
        }
        uploaded
    }

    fn counts(&self) -> PrimitiveCounts {
        PrimitiveCounts {
            spheres: self.spheres.len() as u32,
            meshes: self.mesh_info.len() as u32,
            lights: self.lights.len() as u32,
        }
    }
}

/// Progressive renderer driving a trace kernel and an accumulate kernel on a device
pub struct Renderer {
    device: Arc<dyn Device>,
    provider: Box<dyn KernelProvider>,
    settings: RenderSettings,
    state: Option<RendererState>,
}

impl Renderer {
    pub fn new(device: Arc<dyn Device>, provider: Box<dyn KernelProvider>, settings: RenderSettings) -> Self {
        Self {
            device,
            provider,
            settings,
            state: None,
        }
    }

    /// Validate the settings and get ready to render. Calling it again keeps the current state.
    pub fn initialize(&mut self) -> Result<()> {
        self.settings.validate();
        if self.state.is_none() {
            log::info!("renderer initialized on device `{}`", self.device.name());
            self.state = Some(RendererState::new());
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Replace the settings. Values out of range are clamped. The accumulation restarts at the
    /// next frame if anything changed.
    pub fn set_settings(&mut self, mut settings: RenderSettings) -> Vec<Adjustment> {
        let adjustments = settings.validate();
        self.settings = settings;
        adjustments
    }

    pub fn mode(&self) -> RenderMode {
        self.state
            .as_ref()
            .map(|s| s.mode)
            .unwrap_or_default()
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        if let Some(state) = &mut self.state {
            state.mode = mode;
        }
    }

    /// Stop accumulating until the next frame
    pub fn suspend(&mut self) {
        if let Some(state) = &mut self.state {
            state.accumulation.suspend();
        }
    }

    /// Drop the accumulated image at the next frame
    pub fn invalidate(&mut self) {
        if let Some(state) = &mut self.state {
            state.accumulation.invalidate();
        }
    }

    /// Number of frames in the accumulated image
    pub fn frame_index(&self) -> u32 {
        self.state
            .as_ref()
            .map(|s| s.accumulation.frame_index())
            .unwrap_or(0)
    }

    pub fn phase(&self) -> AccumulationPhase {
        self.state
            .as_ref()
            .map(|s| s.accumulation.phase())
            .unwrap_or(AccumulationPhase::Idle)
    }

    /// Content of the last assembled scene
    pub fn scene_stats(&self) -> Option<AssemblyStats> {
        self.state.as_ref().map(|s| s.assembler.assembly().stats())
    }

    /// Render one frame of `scene` seen from `camera` into `target`.
    ///
    /// The aspect ratio of the camera is taken from the target. In [RenderMode::Accumulate],
    /// `target` receives the running average of every frame since the last change.
    pub fn render_frame(
        &mut self,
        scene: &SceneRegistry,
        camera: &CameraFrame,
        target: &mut Rgba32FImage,
    ) -> Result<FrameReport> {
        let Self {
            device,
            provider,
            settings,
            state,
        } = self;
        let state = state
            .as_mut()
            .context("render_frame called on a renderer that is not initialized")?;

        let (width, height) = target.dimensions();
        anyhow::ensure!(width > 0 && height > 0, "cannot render a {width}x{height} image");
        let camera = camera.with_aspect(width as f32 / height as f32);

        if state.load_kernels(&**provider).is_none() {
            warn_once!("no trace kernel available, frames are passed through");
            counter!("Frames passed through");
            return Ok(FrameReport::passed_through(state.accumulation.frame_index()));
        }

        if state
            .result
            .ensure(device, width, height)
            .context("allocating the result target")?
        {
            state.accumulation.invalidate();
        }

        state
            .sync_scene(device, scene)
            .context("scene upload failed")?;

        let signature = FrameSignature {
            camera,
            width,
            height,
            scene: state.assembler.fingerprint(),
            settings: *settings,
        };
        let plan = state.accumulation.begin_frame(signature, state.mode);

        let result = state.result.get().context("result target missing")?;
        if plan.reset {
            log::debug!("accumulation restarted");
            result.clear()?;
        }

        let inputs = TraceInputs {
            params: TraceParams::new(&camera, settings, plan.frame_index, state.counts(), (width, height)),
            spheres: state.spheres.buffer().context("sphere buffer missing")?,
            triangles: state
                .triangles
                .buffer()
                .context("triangle buffer missing")?,
            mesh_info: state
                .mesh_info
                .buffer()
                .context("mesh info buffer missing")?,
            lights: state.lights.buffer().context("light buffer missing")?,
        };

        let kernels = state.kernels.as_ref().context("kernels missing")?;

        // Snapshot of the accumulation, taken before the new frame is computed. The accumulate
        // kernel must not read the image it writes.
        let previous = if plan.blend {
            let previous = RenderTarget::new(device.clone(), "previous frame", width, height)?;
            previous.copy_from(result)?;
            Some(previous)
        } else {
            None
        };

        let current = RenderTarget::new(device.clone(), "current frame", width, height)?;
        let traced = timed_scope(|| kernels.trace.dispatch(&inputs, &current));
        traced
            .res
            .with_context(|| format!("{} failed", kernels.trace.name()))?;

        let shown = if let Some(previous) = &previous {
            match &kernels.accumulate {
                Some(accumulate) => accumulate
                    .dispatch(&current, previous, plan.frame_index, result)
                    .with_context(|| format!("{} failed", accumulate.name()))?,
                None => result.copy_from(&current)?,
            }
            result
        } else {
            &current
        };
        *target = shown.read_image()?;

        state.accumulation.end_frame(plan);
        counter!("Frames rendered");
        log::trace!("frame {} rendered", plan.frame_index);

        Ok(FrameReport {
            frame_index: plan.frame_index,
            reset: plan.reset,
            blended: plan.blend,
            passed_through: false,
            trace_time: traced.elapsed,
        })
    }

    /// Release every device resource. The renderer can be initialized again afterwards.
    pub fn shutdown(&mut self) {
        if let Some(state) = self.state.take() {
            log::info!(
                "renderer shut down after {} accumulated frames",
                state.accumulation.frame_index()
            );
            drop(state);
            report_counters();
        }
    }
}
