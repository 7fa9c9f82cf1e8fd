use rayon::prelude::*;

use super::AccumulateKernel;
use crate::{accumulation::blend, resources::RenderTarget};

/// Running average of the frames, one texel at a time
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuAccumulateKernel;

impl AccumulateKernel for CpuAccumulateKernel {
    fn name(&self) -> &str {
        "cpu accumulate"
    }

    fn dispatch(
        &self,
        current: &RenderTarget,
        previous: &RenderTarget,
        frame: u32,
        output: &RenderTarget,
    ) -> anyhow::Result<()> {
        anyhow::ensure!(
            current.size() == previous.size() && current.size() == output.size(),
            "accumulating images of different sizes: {:?}, {:?} into {:?}",
            current.size(),
            previous.size(),
            output.size()
        );

        let current = current.read_texels()?;
        let previous = previous.read_texels()?;
        let texels: Vec<_> = current
            .par_iter()
            .zip(previous.par_iter())
            .map(|(cur, prev)| blend(*prev, *cur, frame))
            .collect();
        output.write_texels(&texels)?;
        Ok(())
    }
}
