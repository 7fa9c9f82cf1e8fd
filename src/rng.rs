use rand::{RngCore, SeedableRng};

use crate::math::distributions::Samples;

/// Largest f32 strictly below 1.0
pub const ONE_MINUS_EPSILON: f32 = 1.0 - f32::EPSILON / 2.0;

/// Multiplier used to decorrelate the seeds of two successive frames of the same pixel
pub const FRAME_SEED_STRIDE: u32 = 719393;

/// PCG-style hash generator.
///
/// The whole state is a single `u32` so that the exact same sequence can be reproduced
/// by a shading kernel seeded with the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashRng {
    state: u32,
}

impl HashRng {
    pub const fn new(state: u32) -> Self {
        Self { state }
    }

    /// Seed of the pixel `(x, y)` of a `width` pixels wide image, for the given frame
    pub fn for_pixel(x: u32, y: u32, width: u32, frame: u32) -> Self {
        let pixel_index = y.wrapping_mul(width).wrapping_add(x);
        Self::new(pixel_index.wrapping_add(frame.wrapping_mul(FRAME_SEED_STRIDE)))
    }

    pub fn state(&self) -> u32 {
        self.state
    }

    /// Advance the state and return the hashed word
    pub fn next_word(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(747796405)
            .wrapping_add(2891336453);
        let state = self.state;
        let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277803737);
        (word >> 22) ^ word
    }

    /// Uniform value in [0;1[
    pub fn next_value(&mut self) -> f32 {
        let value = self.next_word() as f32 / 4294967295.0;
        // f32 rounding maps the highest words to exactly 1.0
        value.min(ONE_MINUS_EPSILON)
    }

    /// Uniform value in [min;max[
    pub fn next_in_range(&mut self, min: f32, max: f32) -> f32 {
        let value = min + (max - min) * self.next_value();
        if value >= max && max > min {
            float_below(max)
        } else {
            value
        }
    }

    /// Draw `N` successive values, in order
    pub fn samples<const N: usize>(&mut self) -> Samples<N> {
        let mut values = [0.0; N];
        for v in values.iter_mut() {
            *v = self.next_value();
        }
        Samples(values)
    }
}

/// Largest f32 strictly below a finite `x`
fn float_below(x: f32) -> f32 {
    let bits = x.to_bits();
    if x == 0.0 {
        -f32::from_bits(1)
    } else if x > 0.0 {
        f32::from_bits(bits - 1)
    } else {
        f32::from_bits(bits + 1)
    }
}

/// Allows the generator to drive `rand` distributions
impl RngCore for HashRng {
    fn next_u32(&mut self) -> u32 {
        self.next_word()
    }

    fn next_u64(&mut self) -> u64 {
        let lo = self.next_word() as u64;
        let hi = self.next_word() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_word().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for HashRng {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}

#[cfg(test)]
mod tests {
    use rand::{distributions::Uniform, prelude::Distribution};

    use super::*;

    fn reference_word(state: &mut u32) -> u32 {
        *state = state.wrapping_mul(747796405).wrapping_add(2891336453);
        let word = ((*state >> ((*state >> 28) + 4)) ^ *state).wrapping_mul(277803737);
        (word >> 22) ^ word
    }

    #[test]
    fn matches_hash_formula() {
        let mut rng = HashRng::new(12345);
        let mut state = 12345u32;
        for _ in 0..1000 {
            assert_eq!(rng.next_word(), reference_word(&mut state));
            assert_eq!(rng.state(), state);
        }
    }

    #[test]
    fn deterministic() {
        let seq = |seed| {
            let mut rng = HashRng::new(seed);
            (0..256).map(|_| rng.next_value()).collect::<Vec<_>>()
        };
        assert_eq!(seq(42), seq(42));
        assert_ne!(seq(42), seq(43));
    }

    #[test]
    fn zero_seed_advances() {
        let mut rng = HashRng::new(0);
        rng.next_value();
        assert_eq!(rng.state(), 2891336453);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            rng.next_word();
            assert!(seen.insert(rng.state()), "state cycled");
        }
    }

    #[test]
    fn values_in_unit_interval() {
        let mut rng = HashRng::new(7);
        for _ in 0..100_000 {
            let v = rng.next_value();
            assert!((0.0..1.0).contains(&v), "{v}");
        }
    }

    #[test]
    fn high_words_stay_below_one() {
        assert_eq!(u32::MAX as f32 / 4294967295.0, 1.0);
        assert!(ONE_MINUS_EPSILON < 1.0);
        assert_eq!(ONE_MINUS_EPSILON.to_bits(), 1.0f32.to_bits() - 1);
    }

    #[test]
    fn range() {
        let mut rng = HashRng::new(3);
        for _ in 0..10_000 {
            let v = rng.next_in_range(-2.0, 5.0);
            assert!((-2.0..5.0).contains(&v));
        }
        let mut a = HashRng::new(9);
        let mut b = HashRng::new(9);
        assert_eq!(a.next_in_range(1.0, 3.0), 1.0 + 2.0 * b.next_value());
    }

    #[test]
    fn range_rounding_stays_below_max() {
        // The next word of this state is high enough for `1 + value` to round to 2
        let mut rng = HashRng::new(60418823);
        let v = rng.next_in_range(1.0, 2.0);
        assert!((1.0..2.0).contains(&v), "{v}");
        assert_eq!(v, float_below(2.0));

        assert!(float_below(1.0) < 1.0);
        assert_eq!(float_below(1.0), ONE_MINUS_EPSILON);
        assert!(float_below(-3.0) < -3.0);
        assert!(float_below(0.0) < 0.0);
    }

    #[test]
    fn mean_is_one_half() {
        let mut rng = HashRng::new(1);
        let n = 100_000;
        let mean = (0..n).map(|_| rng.next_value() as f64).sum::<f64>() / n as f64;
        assert!((mean - 0.5).abs() < 0.01, "{mean}");
    }

    #[test]
    fn pixel_seed() {
        assert_eq!(HashRng::for_pixel(3, 2, 10, 0).state(), 23);
        assert_eq!(HashRng::for_pixel(3, 2, 10, 1).state(), 23 + FRAME_SEED_STRIDE);
    }

    #[test]
    fn drives_rand_distributions() {
        let mut rng = HashRng::seed_from_u64(5);
        let uniform = Uniform::new(0.0f32, 10.0);
        for _ in 0..1000 {
            assert!((0.0..10.0).contains(&uniform.sample(&mut rng)));
        }
        let mut bytes = [0u8; 7];
        rng.fill_bytes(&mut bytes);
    }
}
