#![warn(missing_docs)]
//! SdxBench Statistical Engine
//!
//! - Latency distributions (mean, sample standard deviation, count)
//! - Percentiles over raw samples, tails included
//! - Welch's t-test for "is different at confidence C"

mod distribution;
mod percentiles;
mod summary;
mod welch;

pub use distribution::Distribution;
pub use percentiles::{Percentiles, compute_percentile, percentile_of_sorted};
pub use summary::{SummaryStatistics, compute_summary};
pub use welch::{Moments, WelchTest, welch_t_test};

/// Confidence levels checked by the verdict, strictest first
pub const CONFIDENCE_LEVELS: [f64; 3] = [0.999, 0.99, 0.95];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_strictest_first() {
        assert!(CONFIDENCE_LEVELS.windows(2).all(|w| w[0] > w[1]));
    }
}
