use std::fmt::Display;

pub struct PercentBar {
    pub percent: f32,
    pub width: usize,
}

impl Display for PercentBar {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let percent = self.percent.clamp(0.0, 1.0);
        let filled = ((self.width - 1) as f32 * percent).round() as usize;
        write!(
            f,
            "[{empty:=>width_left$}>{empty:.<width_right$}] {percent:.1}%",
            empty = "",
            width_left = filled,
            width_right = self.width - 1 - filled,
            percent = 100. * percent
        )
    }
}

/// Progress of the frame loop, shown as `frame i/n` next to a [PercentBar]
pub struct FrameProgress {
    pub done: u32,
    pub total: u32,
}

impl Display for FrameProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bar = PercentBar {
            percent: self.done as f32 / self.total.max(1) as f32,
            width: 50,
        };
        write!(f, "{bar} frame {}/{}", self.done, self.total)
    }
}
