//! Summary Statistics
//!
//! One flat record per distribution for console output.

use crate::distribution::Distribution;

/// Summary of a distribution, all values in milliseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStatistics {
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (n - 1)
    pub std_dev: f64,
    /// Fastest sample
    pub min: f64,
    /// Slowest sample
    pub max: f64,
    /// Median
    pub p50: f64,
    /// 90th percentile
    pub p90: f64,
    /// 99th percentile
    pub p99: f64,
    /// 99.9th percentile
    pub p999: f64,
    /// Number of samples
    pub sample_count: usize,
}

/// Summarize a distribution
pub fn compute_summary(distribution: &Distribution) -> SummaryStatistics {
    let percentiles = distribution.percentiles();
    SummaryStatistics {
        mean: distribution.mean(),
        std_dev: distribution.std_dev(),
        min: distribution.min(),
        max: distribution.max(),
        p50: percentiles.p50,
        p90: percentiles.p90,
        p99: percentiles.p99,
        p999: percentiles.p999,
        sample_count: distribution.n(),
    }
}
