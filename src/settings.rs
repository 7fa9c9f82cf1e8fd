use std::fmt::Display;

use crate::math::vec::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentSettings {
    pub enabled: bool,
    pub ground_color: Vec3,
    pub sky_color_horizon: Vec3,
    pub sky_color_zenith: Vec3,
    /// Direction the sun light travels towards
    pub sun_direction: Vec3,
    /// Exponent of the sun lobe, higher is a smaller sun. At least 1.
    pub sun_focus: f32,
    pub sun_intensity: f32,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ground_color: Vec3::new(0.35, 0.3, 0.35),
            sky_color_horizon: Vec3::new(1.0, 1.0, 1.0),
            sky_color_zenith: Vec3::new(0.08, 0.37, 0.73),
            sun_direction: Vec3::new(-0.3, -1.0, -0.4).normalize(),
            sun_focus: 500.0,
            sun_intensity: 1.0,
        }
    }
}

/// Options of the shading kernel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub max_bounce_count: u32,
    pub num_rays_per_pixel: u32,
    /// Anti aliasing jitter radius, in pixel
    pub diverge_strength: f32,
    /// Lens blur radius, in pixel
    pub defocus_strength: f32,
    /// Light samples per hit when importance sampling is enabled
    pub light_samples: u32,
    pub use_importance_sampling: bool,
    pub environment: EnvironmentSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            max_bounce_count: 4,
            num_rays_per_pixel: 10,
            diverge_strength: 0.3,
            defocus_strength: 0.0,
            light_samples: 1,
            use_importance_sampling: false,
            environment: EnvironmentSettings::default(),
        }
    }
}

/// A value brought back in its valid range by [RenderSettings::validate]
#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    pub option: &'static str,
    pub from: f32,
    pub to: f32,
}

impl Display for Adjustment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} adjusted from {} to {}", self.option, self.from, self.to)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("{option} must be {expected}, got {value}")]
    OutOfRange {
        option: &'static str,
        expected: &'static str,
        value: f32,
    },
}

fn clamp_f32(
    adjustments: &mut Vec<Adjustment>,
    option: &'static str,
    value: &mut f32,
    min: f32,
    max: f32,
) {
    // NaN goes to the lower bound
    let clamped = if value.is_nan() { min } else { value.clamp(min, max) };
    if clamped.to_bits() != value.to_bits() {
        adjustments.push(Adjustment {
            option,
            from: *value,
            to: clamped,
        });
        *value = clamped;
    }
}

fn clamp_u32(adjustments: &mut Vec<Adjustment>, option: &'static str, value: &mut u32, min: u32, max: u32) {
    let clamped = (*value).clamp(min, max);
    if clamped != *value {
        adjustments.push(Adjustment {
            option,
            from: *value as f32,
            to: clamped as f32,
        });
        *value = clamped;
    }
}

impl RenderSettings {
    /// Bring every option back in its valid range, returns what was changed
    pub fn validate(&mut self) -> Vec<Adjustment> {
        let mut adjustments = Vec::new();
        let a = &mut adjustments;

        clamp_u32(a, "rays per pixel", &mut self.num_rays_per_pixel, 1, u32::MAX);
        clamp_u32(a, "light samples", &mut self.light_samples, 1, u32::MAX);
        clamp_f32(a, "diverge strength", &mut self.diverge_strength, 0.0, f32::MAX);
        clamp_f32(a, "defocus strength", &mut self.defocus_strength, 0.0, f32::MAX);

        let env = &mut self.environment;
        clamp_f32(a, "sun focus", &mut env.sun_focus, 1.0, f32::MAX);
        clamp_f32(a, "sun intensity", &mut env.sun_intensity, 0.0, f32::MAX);
        env.sun_direction = env.sun_direction.try_normalize().unwrap_or(Vec3::NEG_Y);

        for adjustment in adjustments.iter() {
            log::warn!("render settings: {adjustment}");
        }
        adjustments
    }

    /// Like [RenderSettings::validate], but fails on the first out of range value
    pub fn validated(mut self) -> Result<Self, SettingsError> {
        let expected = |option| match option {
            "rays per pixel" | "light samples" | "sun focus" => "at least 1",
            _ => "non negative",
        };
        match self.validate().into_iter().next() {
            None => Ok(self),
            Some(Adjustment { option, from, .. }) => Err(SettingsError::OutOfRange {
                option,
                expected: expected(option),
                value: from,
            }),
        }
    }
}
