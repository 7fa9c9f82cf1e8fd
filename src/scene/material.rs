use bytemuck::{Pod, Zeroable};

use crate::math::vec::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum MaterialFlag {
    #[default]
    None = 0,
    /// Alternate between `color` and `emission_color` on a unit grid of the xz plane
    CheckerPattern = 1,
    /// Not seen by camera rays, but still lights the scene
    InvisibleLight = 2,
}

impl MaterialFlag {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => MaterialFlag::CheckerPattern,
            2 => MaterialFlag::InvisibleLight,
            _ => MaterialFlag::None,
        }
    }
}

/// Surface description, laid out as the shading kernel reads it
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct RayTracingMaterial {
    pub color: [f32; 4],
    pub emission_color: [f32; 4],
    pub specular_color: [f32; 4],
    pub emission_strength: f32,
    /// In [0;1], 1 is a perfect mirror for the specular bounces
    pub smoothness: f32,
    /// In [0;1], probability of a bounce to be specular
    pub specular_probability: f32,
    pub flag: u32,
}

impl Default for RayTracingMaterial {
    fn default() -> Self {
        Self {
            color: [1.0; 4],
            emission_color: [1.0; 4],
            specular_color: [1.0; 4],
            emission_strength: 0.0,
            smoothness: 0.0,
            specular_probability: 0.0,
            flag: MaterialFlag::None as u32,
        }
    }
}

impl RayTracingMaterial {
    pub fn diffuse(color: Vec3) -> Self {
        Self {
            color: color.extend(1.0).to_array(),
            ..Default::default()
        }
    }

    pub fn emissive(color: Vec3, strength: f32) -> Self {
        Self {
            color: [0.0, 0.0, 0.0, 1.0],
            emission_color: color.extend(1.0).to_array(),
            emission_strength: strength,
            ..Default::default()
        }
    }

    pub fn glossy(color: Vec3, specular: Vec3, smoothness: f32, specular_probability: f32) -> Self {
        Self {
            color: color.extend(1.0).to_array(),
            specular_color: specular.extend(1.0).to_array(),
            smoothness: smoothness.clamp(0.0, 1.0),
            specular_probability: specular_probability.clamp(0.0, 1.0),
            ..Default::default()
        }
    }

    pub fn with_flag(self, flag: MaterialFlag) -> Self {
        Self {
            flag: flag as u32,
            ..self
        }
    }

    pub fn flag(&self) -> MaterialFlag {
        MaterialFlag::from_raw(self.flag)
    }

    pub fn is_emissive(&self) -> bool {
        self.emission_strength > 0.0
    }

    pub fn color(&self) -> Vec3 {
        Vec3::from_slice(&self.color[..3])
    }

    pub fn specular_color(&self) -> Vec3 {
        Vec3::from_slice(&self.specular_color[..3])
    }

    /// Emitted radiance
    pub fn emitted(&self) -> Vec3 {
        Vec3::from_slice(&self.emission_color[..3]) * self.emission_strength
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        assert_eq!(std::mem::size_of::<RayTracingMaterial>(), 64);
    }

    #[test]
    fn default_is_white_and_dark() {
        let m = RayTracingMaterial::default();
        assert_eq!(m.color(), Vec3::ONE);
        assert!(!m.is_emissive());
        assert_eq!(m.flag(), MaterialFlag::None);
    }

    #[test]
    fn emission() {
        let m = RayTracingMaterial::emissive(Vec3::new(1.0, 0.5, 0.0), 2.0);
        assert!(m.is_emissive());
        assert_eq!(m.emitted(), Vec3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn flags() {
        let m = RayTracingMaterial::default().with_flag(MaterialFlag::InvisibleLight);
        assert_eq!(m.flag(), MaterialFlag::InvisibleLight);
        assert_eq!(MaterialFlag::from_raw(42), MaterialFlag::None);
    }
}
