use crate::{camera::CameraFrame, settings::RenderSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulationPhase {
    /// Nothing is rendered, e.g. the view is inactive
    Idle,
    Accumulating,
    /// The accumulated image is stale, the next frame restarts from scratch
    Invalidated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Each frame is blended into the accumulated image
    #[default]
    Accumulate,
    /// Each frame is shown as is, the frame index does not move
    Preview,
}

/// Everything a frame depends on. Accumulated frames must share the same signature.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSignature {
    pub camera: CameraFrame,
    pub width: u32,
    pub height: u32,
    /// Fingerprint of the assembled scene buffers
    pub scene: u64,
    pub settings: RenderSettings,
}

/// What the renderer has to do for the coming frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePlan {
    pub frame_index: u32,
    /// The accumulated image must be cleared (or reallocated) before use
    pub reset: bool,
    /// The frame is blended with the accumulated image
    pub blend: bool,
}

/// Weight of the newest sample in the running average
pub fn blend_weight(frame_index: u32) -> f32 {
    1.0 / (frame_index as f32 + 1.0)
}

/// Running average of the frames `0..=frame_index`, `current` being the frame `frame_index`
pub fn blend(previous: [f32; 4], current: [f32; 4], frame_index: u32) -> [f32; 4] {
    let w = blend_weight(frame_index);
    std::array::from_fn(|i| previous[i] * (1.0 - w) + current[i] * w)
}

/// Owns the progressive frame counter
#[derive(Debug)]
pub struct AccumulationController {
    phase: AccumulationPhase,
    frame_index: u32,
    signature: Option<FrameSignature>,
}

impl Default for AccumulationController {
    fn default() -> Self {
        Self::new()
    }
}

impl AccumulationController {
    pub fn new() -> Self {
        Self {
            phase: AccumulationPhase::Idle,
            frame_index: 0,
            signature: None,
        }
    }

    pub fn phase(&self) -> AccumulationPhase {
        self.phase
    }

    /// Index of the next accumulated frame, i.e. the number of frames in the accumulated image
    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    /// Discard the accumulated image at the next frame
    pub fn invalidate(&mut self) {
        self.phase = AccumulationPhase::Invalidated;
    }

    /// Stop rendering. The accumulated image is kept, rendering the same frame again resumes it.
    pub fn suspend(&mut self) {
        if self.phase == AccumulationPhase::Accumulating {
            self.phase = AccumulationPhase::Idle;
        }
    }

    pub fn begin_frame(&mut self, signature: FrameSignature, mode: RenderMode) -> FramePlan {
        if mode == RenderMode::Preview {
            return FramePlan {
                frame_index: self.frame_index,
                reset: false,
                blend: false,
            };
        }

        if let Some(previous) = &self.signature {
            if *previous != signature {
                log::debug!(
                    "accumulation invalidated after {} frames",
                    self.frame_index
                );
                self.phase = AccumulationPhase::Invalidated;
            }
        }

        let reset = self.signature.is_none() || self.phase == AccumulationPhase::Invalidated;
        if reset {
            self.frame_index = 0;
            self.signature = Some(signature);
        }
        self.phase = AccumulationPhase::Accumulating;

        FramePlan {
            frame_index: self.frame_index,
            reset,
            blend: true,
        }
    }

    /// To be called once the planned frame has been rendered
    pub fn end_frame(&mut self, plan: FramePlan) {
        if plan.blend && self.phase == AccumulationPhase::Accumulating {
            self.frame_index = self.frame_index.saturating_add(1);
        }
    }
}
