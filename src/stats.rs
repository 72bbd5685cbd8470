//! Online mean/variance accumulation.

/// Running statistics of a stream of samples: mean, sum of squared
/// deviations from the mean and sample count (Welford). Two bins merge with
/// Chan's parallel update, so batches may be combined in any order.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StatsBin {
    mean: f64,
    m2: f64,
    samples: usize,
}

impl StatsBin {
    pub fn new() -> StatsBin {
        StatsBin::default()
    }

    /// Bin summarising `samples` samples with the given mean and (unbiased)
    /// sample variance.
    pub fn from_summary(mean: f64, variance: f64, samples: usize) -> StatsBin {
        let m2 = if samples > 1 {
            variance * (samples - 1) as f64
        } else {
            0.
        };
        StatsBin { mean, m2, samples }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Unbiased sample variance, zero with fewer than two samples.
    pub fn variance(&self) -> f64 {
        if self.samples < 2 {
            return 0.;
        }
        self.m2 / (self.samples - 1) as f64
    }

    /// Standard error of the mean.
    pub fn error(&self) -> f64 {
        if self.samples == 0 {
            return 0.;
        }
        (self.variance() / self.samples as f64).sqrt()
    }

    pub fn add_sample(&mut self, x: f64) {
        self.samples += 1;
        let delta = x - self.mean;
        self.mean += delta / self.samples as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn combine(&mut self, mean: f64, variance: f64, samples: usize) {
        self.merge(&StatsBin::from_summary(mean, variance, samples));
    }

    pub fn merge(&mut self, other: &StatsBin) {
        if other.samples == 0 {
            return;
        }
        if self.samples == 0 {
            *self = *other;
            return;
        }
        let na = self.samples as f64;
        let nb = other.samples as f64;
        let n = na + nb;
        let delta = other.mean - self.mean;
        self.mean += delta * nb / n;
        self.m2 += other.m2 + delta * delta * na * nb / n;
        self.samples += other.samples;
    }

    pub fn clear(&mut self) {
        *self = StatsBin::default();
    }
}
