use std::ops::Deref;

use rand::{distributions::Uniform, prelude::Distribution, Rng};

use super::vec::{Vec2, Vec3};
use crate::rng::HashRng;

/// Samples are expected to be in [0;1(^N
pub struct Samples<const N: usize>(pub [f32; N]);

impl<const N: usize> Deref for Samples<N> {
    type Target = [f32; N];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub trait Samplable<T, const N: usize> {
    fn sample_with(&self, samples: Samples<N>) -> T;

    /// Sample using exactly `N` successive draws of the hash generator
    fn sample_hashed(&self, rng: &mut HashRng) -> T {
        self.sample_with(rng.samples())
    }
}

/// Uniform point in the unit disk.
///
/// The first sample gives the angle and the second the squared radius.
pub struct UniformUnitBall2;
impl Samplable<Vec2, 2> for UniformUnitBall2 {
    fn sample_with(&self, samples: Samples<2>) -> Vec2 {
        let phi = std::f32::consts::TAU * samples[0];
        let r = samples[1].sqrt();
        let (s, c) = f32::sin_cos(phi);
        Vec2::new(r * c, r * s)
    }
}

impl Distribution<Vec2> for UniformUnitBall2 {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        let uniform = Uniform::new(0., 1.);
        self.sample_with(Samples([uniform.sample(rng), uniform.sample(rng)]))
    }
}

/// Uniform direction, obtained by normalizing a vector of three normal deviates (Box-Muller)
pub struct UniformUnitSphere3;

impl UniformUnitSphere3 {
    fn normal_deviate(s0: f32, s1: f32) -> f32 {
        let theta = std::f32::consts::TAU * s0;
        // s1 is in [0;1[, 1 - s1 is never 0
        let rho = f32::sqrt(-2.0 * f32::ln(1.0 - s1));
        rho * theta.cos()
    }
}

impl Samplable<Vec3, 6> for UniformUnitSphere3 {
    fn sample_with(&self, samples: Samples<6>) -> Vec3 {
        let v = Vec3::new(
            Self::normal_deviate(samples[0], samples[1]),
            Self::normal_deviate(samples[2], samples[3]),
            Self::normal_deviate(samples[4], samples[5]),
        );
        v.try_normalize().unwrap_or(Vec3::Y)
    }
}

/// Uniform point on a triangle, as barycentric weights of (b, c)
pub struct UniformTriangle;
impl Samplable<Vec2, 2> for UniformTriangle {
    fn sample_with(&self, samples: Samples<2>) -> Vec2 {
        let su = samples[0].sqrt();
        Vec2::new(su * (1.0 - samples[1]), su * samples[1])
    }
}
