//! Online mean and variance.

/// Running statistics over a stream of samples, updated with Welford's method
#[derive(Default, Clone, Copy, Debug)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    /// Sum of squared distances to the mean
    m2: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: f32) {
        let sample = sample as f64;
        self.count += 1;
        let delta = sample - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (sample - self.mean);
    }

    /// Statistics of the union of both sample sets
    pub fn merge(self, other: Self) -> Self {
        if self.count == 0 {
            return other;
        }
        if other.count == 0 {
            return self;
        }
        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        Self {
            count,
            mean: self.mean + delta * other.count as f64 / count as f64,
            m2: self.m2
                + other.m2
                + delta * delta * (self.count as f64 * other.count as f64) / count as f64,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// NaN without samples
    pub fn mean(&self) -> f32 {
        if self.count == 0 {
            f32::NAN
        } else {
            self.mean as f32
        }
    }

    /// Unbiased sample variance, infinite below two samples
    pub fn variance(&self) -> f32 {
        if self.count < 2 {
            return f32::INFINITY;
        }
        (self.m2 / (self.count - 1) as f64) as f32
    }

    pub fn std_dev(&self) -> f32 {
        self.variance().sqrt()
    }
}

impl Extend<f32> for RunningStats {
    fn extend<T: IntoIterator<Item = f32>>(&mut self, iter: T) {
        for sample in iter {
            self.push(sample);
        }
    }
}

impl FromIterator<f32> for RunningStats {
    fn from_iter<T: IntoIterator<Item = f32>>(iter: T) -> Self {
        let mut stats = Self::new();
        stats.extend(iter);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_variance() {
        let s: RunningStats = [1.0, 2.0, 3.0, 4.0].into_iter().collect();
        assert_eq!(s.count(), 4);
        assert!((s.mean() - 2.5).abs() < 1e-6);
        assert!((s.variance() - 5.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn merge_matches_single_pass() {
        let all: RunningStats = (0..100).map(|i| (i as f32 * 0.37).sin()).collect();
        let a: RunningStats = (0..30).map(|i| (i as f32 * 0.37).sin()).collect();
        let b: RunningStats = (30..100).map(|i| (i as f32 * 0.37).sin()).collect();
        let m = a.merge(b);
        assert_eq!(m.count(), 100);
        assert!((m.mean() - all.mean()).abs() < 1e-6);
        assert!((m.variance() - all.variance()).abs() < 1e-6);
        assert_eq!(RunningStats::new().merge(a).count(), 30);
    }

    #[test]
    fn large_offset_is_stable() {
        let s: RunningStats = [1e6 + 1.0, 1e6 + 2.0, 1e6 + 3.0].into_iter().collect();
        assert!((s.variance() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn too_few_samples() {
        assert!(RunningStats::new().mean().is_nan());
        let s: RunningStats = [1.0].into_iter().collect();
        assert!(s.variance().is_infinite());
    }
}
