//! Percentile Computation
//!
//! Linear interpolation between nearest ranks over sorted samples. Tail
//! percentiles are taken from every sample; nothing is trimmed.

/// Tail-latency percentiles of a distribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percentiles {
    /// 50th percentile (median)
    pub p50: f64,
    /// 90th percentile
    pub p90: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
    /// 99.9th percentile
    pub p999: f64,
}

impl Percentiles {
    /// Compute from samples already sorted ascending
    pub fn from_sorted(sorted: &[f64]) -> Self {
        Self {
            p50: percentile_of_sorted(sorted, 50.0),
            p90: percentile_of_sorted(sorted, 90.0),
            p95: percentile_of_sorted(sorted, 95.0),
            p99: percentile_of_sorted(sorted, 99.0),
            p999: percentile_of_sorted(sorted, 99.9),
        }
    }
}

/// Percentile `p` (0..=100) of an ascending slice, 0.0 when empty
pub fn percentile_of_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            let fraction = rank - lower as f64;
            sorted[lower] + fraction * (sorted[upper] - sorted[lower])
        }
    }
}

/// Percentile `p` (0..=100) of unsorted samples
pub fn compute_percentile(samples: &[f64], p: f64) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_of_sorted(&sorted, p)
}
