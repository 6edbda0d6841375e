//! Latency Distributions
//!
//! The multiset of measurement samples (milliseconds) collected for one
//! operation across all forks. Sample order carries no meaning.

use crate::percentiles::Percentiles;
use crate::welch::{Moments, WelchTest, welch_t_test};

/// Measurement samples for one label, in milliseconds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    samples: Vec<f64>,
}

impl Distribution {
    /// Empty distribution
    pub fn new() -> Self {
        Self::default()
    }

    /// Distribution over the given millisecond samples
    pub fn from_samples(samples: Vec<f64>) -> Self {
        Self { samples }
    }

    /// Add one sample
    pub fn push(&mut self, millis: f64) {
        self.samples.push(millis);
    }

    /// Raw samples in arrival order
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Sample count
    pub fn n(&self) -> usize {
        self.samples.len()
    }

    /// Whether no sample was recorded
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Arithmetic mean, 0.0 when empty
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Sample variance with the n - 1 denominator, 0.0 below two samples
    pub fn variance(&self) -> f64 {
        let n = self.samples.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let ss: f64 = self.samples.iter().map(|x| (x - mean).powi(2)).sum();
        ss / (n - 1) as f64
    }

    /// Sample standard deviation
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Smallest sample, 0.0 when empty
    pub fn min(&self) -> f64 {
        self.samples.iter().copied().reduce(f64::min).unwrap_or(0.0)
    }

    /// Largest sample, 0.0 when empty
    pub fn max(&self) -> f64 {
        self.samples.iter().copied().reduce(f64::max).unwrap_or(0.0)
    }

    /// Tail percentiles over every sample
    pub fn percentiles(&self) -> Percentiles {
        let mut sorted = self.samples.clone();
        sorted.sort_by(f64::total_cmp);
        Percentiles::from_sorted(&sorted)
    }

    /// Mean, variance and size as consumed by the t-test
    pub fn moments(&self) -> Moments {
        Moments {
            mean: self.mean(),
            variance: self.variance(),
            n: self.n(),
        }
    }

    /// Welch's t-test of `self` against `other`
    pub fn welch(&self, other: &Distribution) -> WelchTest {
        welch_t_test(&self.moments(), &other.moments())
    }

    /// Whether the means differ at the given confidence (e.g. 0.999)
    pub fn is_different(&self, other: &Distribution, confidence: f64) -> bool {
        self.welch(other).rejects_at(confidence)
    }
}

impl Extend<f64> for Distribution {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        self.samples.extend(iter);
    }
}

impl FromIterator<f64> for Distribution {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}
