use std::path::PathBuf;

use anyhow::{Context, Result};
use image::{buffer::ConvertBuffer, ImageBuffer, Rgb, Rgba32FImage};

/// Writes the final image: linear HDR as OpenEXR, clamped LDR as PNG
pub struct FileOutput {
    pub hdr_outdir: Option<PathBuf>,
    pub ldr_outdir: Option<PathBuf>,
}

impl FileOutput {
    pub fn new(outdir: impl Into<PathBuf>) -> Self {
        let outdir = outdir.into();
        Self {
            hdr_outdir: Some(outdir.join("hdr")),
            ldr_outdir: Some(outdir.join("ldr")),
        }
    }

    pub fn commit(&self, image: &Rgba32FImage, name: &str) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        if let Some(ref hdr_output) = self.hdr_outdir {
            std::fs::create_dir_all(hdr_output)
                .with_context(|| format!("creating {}", hdr_output.display()))?;
            let path = hdr_output.join(format!("{name}.exr"));

            log::info!("Saving HDR image...");
            ConvertBuffer::<ImageBuffer<Rgb<f32>, Vec<f32>>>::convert(image)
                .save(&path)
                .with_context(|| format!("saving {}", path.display()))?;
            written.push(path);
        }

        if let Some(ref ldr_output) = self.ldr_outdir {
            std::fs::create_dir_all(ldr_output)
                .with_context(|| format!("creating {}", ldr_output.display()))?;
            let path = ldr_output.join(format!("{name}.png"));

            log::info!("Saving LDR image...");
            ConvertBuffer::<ImageBuffer<Rgb<u8>, Vec<u8>>>::convert(image)
                .save(&path)
                .with_context(|| format!("saving {}", path.display()))?;
            written.push(path);
        }

        Ok(written)
    }
}
