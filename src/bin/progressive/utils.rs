use core::fmt::Display;

use clap::ValueEnum;
use progressive_rt::{
    camera::CameraFrame,
    scene::{
        examples::{CornellBoxScene, SpheresScene},
        SceneRegistry,
    },
};

#[derive(Debug, Default, Clone, Copy, ValueEnum)]
pub enum AvailableScene {
    #[default]
    Cornell,
    Spheres,
}

impl AvailableScene {
    pub fn insert_into(self, scene: &mut SceneRegistry) {
        match self {
            AvailableScene::Cornell => CornellBoxScene::insert_into(scene),
            AvailableScene::Spheres => SpheresScene::insert_into(scene),
        }
    }

    pub fn camera(self, aspect: f32) -> CameraFrame {
        match self {
            AvailableScene::Cornell => CornellBoxScene::camera(aspect),
            AvailableScene::Spheres => SpheresScene::camera(aspect),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

impl std::str::FromStr for Dimensions {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((a, b)) = s.split_once('x') else {
            return Err(anyhow::anyhow!("Incorrect format, expected `width`x`height`"));
        };
        let width: u32 = a.parse()?;
        let height: u32 = b.parse()?;
        anyhow::ensure!(width > 0 && height > 0, "Dimensions must be non zero, got {s}");

        Ok(Dimensions { width, height })
    }
}

impl Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}x{}", self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dimensions() {
        let d: Dimensions = "800x600".parse().unwrap();
        assert_eq!(d, Dimensions { width: 800, height: 600 });
        assert_eq!(d.to_string(), "800x600");
        assert!("800".parse::<Dimensions>().is_err());
        assert!("0x600".parse::<Dimensions>().is_err());
        assert!("ax2".parse::<Dimensions>().is_err());
    }
}
