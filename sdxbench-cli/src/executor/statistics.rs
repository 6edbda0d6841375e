//! Statistics Computation
//!
//! Samples arrive as nanosecond durations; distributions hold milliseconds.

use sdxbench_ipc::Sample;
use sdxbench_stats::{Distribution, SummaryStatistics, compute_summary};

/// Append a fork's samples to `distribution`, converted to ms
pub fn append_samples(distribution: &mut Distribution, samples: &[Sample]) {
    distribution.extend(samples.iter().map(Sample::as_millis_f64));
}

/// Summarize every distribution for console output
pub fn compute_statistics(
    distributions: &[(String, Distribution)],
) -> Vec<(String, SummaryStatistics)> {
    distributions
        .iter()
        .filter(|(_, d)| !d.is_empty())
        .map(|(label, d)| (label.clone(), compute_summary(d)))
        .collect()
}
