//! Report Data Structures

use sdxbench_stats::{CONFIDENCE_LEVELS, Distribution};
use std::fmt;
use thiserror::Error;

/// Label of the hand-written fetch-and-parse operation
pub const BASELINE_LABEL: &str = "baseline";

/// Label of the typed-query operation
pub const CANDIDATE_LABEL: &str = "sdxTest";

/// Errors raised while building or writing a report
#[derive(Debug, Error)]
pub enum ReportError {
    /// A label the verdict needs has no distribution
    #[error("no distribution recorded for label {0:?}")]
    MissingLabel(String),

    /// The result file could not be written
    #[error("failed to write result file: {0}")]
    Io(#[from] std::io::Error),
}

/// Final line of the result file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Means differ at 99.9 %
    Different999,
    /// Means differ at 99 % but not 99.9 %
    Different99,
    /// Means differ at 95 % but not 99 %
    Different95,
    /// No level rejects equal means
    NotDifferent,
}

impl Verdict {
    /// Strictest level at which `a` and `b` differ
    pub fn compare(a: &Distribution, b: &Distribution) -> Self {
        let test = a.welch(b);
        let hit = CONFIDENCE_LEVELS
            .iter()
            .position(|&level| test.rejects_at(level));
        match hit {
            Some(0) => Verdict::Different999,
            Some(1) => Verdict::Different99,
            Some(_) => Verdict::Different95,
            None => Verdict::NotDifferent,
        }
    }

    /// Confidence level of the verdict, `None` when not different
    pub fn confidence(&self) -> Option<f64> {
        match self {
            Verdict::Different999 => Some(0.999),
            Verdict::Different99 => Some(0.99),
            Verdict::Different95 => Some(0.95),
            Verdict::NotDifferent => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = match self {
            Verdict::Different999 => "is different with 99.9% confidence",
            Verdict::Different99 => "is different with 99% confidence",
            Verdict::Different95 => "is different with 95% confidence",
            Verdict::NotDifferent => "is not statistically different",
        };
        f.write_str(line)
    }
}

/// Per-label block of the result file
#[derive(Debug, Clone, PartialEq)]
pub struct OperationStats {
    /// Operation label
    pub label: String,
    /// Mean latency (ms)
    pub mean: f64,
    /// Sample standard deviation (ms)
    pub std_dev: f64,
    /// Sample count
    pub n: usize,
}

impl OperationStats {
    fn from_distribution(label: &str, distribution: &Distribution) -> Self {
        Self {
            label: label.to_string(),
            mean: distribution.mean(),
            std_dev: distribution.std_dev(),
            n: distribution.n(),
        }
    }
}

/// Everything written to the result file
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// One entry per distribution, in run order
    pub operations: Vec<OperationStats>,
    /// Two-tailed p-value of baseline vs candidate
    pub p_value: f64,
    /// Outcome of the comparison
    pub verdict: Verdict,
}

impl RunReport {
    /// Build a report from the ordered distributions of a run.
    ///
    /// Fails when either compared label is absent. Lookup is by exact label.
    pub fn build(distributions: &[(String, Distribution)]) -> Result<Self, ReportError> {
        let baseline = lookup(distributions, BASELINE_LABEL)?;
        let candidate = lookup(distributions, CANDIDATE_LABEL)?;

        Ok(Self {
            operations: distributions
                .iter()
                .map(|(label, d)| OperationStats::from_distribution(label, d))
                .collect(),
            p_value: baseline.welch(candidate).p_value,
            verdict: Verdict::compare(baseline, candidate),
        })
    }
}

fn lookup<'a>(
    distributions: &'a [(String, Distribution)],
    label: &str,
) -> Result<&'a Distribution, ReportError> {
    distributions
        .iter()
        .find(|(l, _)| l == label)
        .map(|(_, d)| d)
        .ok_or_else(|| ReportError::MissingLabel(label.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist(samples: &[f64]) -> Distribution {
        Distribution::from_samples(samples.to_vec())
    }

    fn run(baseline: &[f64], candidate: &[f64]) -> Vec<(String, Distribution)> {
        vec![
            (CANDIDATE_LABEL.to_string(), dist(candidate)),
            (BASELINE_LABEL.to_string(), dist(baseline)),
        ]
    }

    #[test]
    fn test_identical_runs_are_not_different() {
        let samples = [10.0, 10.2, 9.8, 10.1, 9.9, 10.0];
        let report = RunReport::build(&run(&samples, &samples)).unwrap();
        assert_eq!(report.verdict, Verdict::NotDifferent);
        assert!(report.verdict.confidence().is_none());
    }

    #[test]
    fn test_far_apart_is_strictest_level() {
        let baseline: Vec<f64> = (0..40).map(|i| 5.0 + (i % 5) as f64 * 0.1).collect();
        let candidate: Vec<f64> = (0..40).map(|i| 50.0 + (i % 5) as f64 * 0.1).collect();
        let report = RunReport::build(&run(&baseline, &candidate)).unwrap();
        assert_eq!(report.verdict, Verdict::Different999);
        assert_eq!(report.verdict.confidence(), Some(0.999));
    }

    #[test]
    fn test_levels_between_95_and_99() {
        // t = 2.5 on 38 df: p ~= 0.017
        let baseline: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 9.0 } else { 11.0 }).collect();
        let shift = 2.5 * (2.0 * 20.0f64 / 19.0 / 20.0).sqrt();
        let candidate: Vec<f64> = baseline.iter().map(|x| x + shift).collect();
        let report = RunReport::build(&run(&baseline, &candidate)).unwrap();
        assert_eq!(report.verdict, Verdict::Different95);
    }

    #[test]
    fn test_operations_keep_run_order() {
        let report = RunReport::build(&run(&[1.0, 2.0], &[3.0, 4.0])).unwrap();
        let labels: Vec<&str> = report.operations.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec![CANDIDATE_LABEL, BASELINE_LABEL]);
        assert_eq!(report.operations[1].n, 2);
        assert!((report.operations[1].mean - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_label_lookup_is_exact() {
        let distributions = vec![
            ("Baseline".to_string(), dist(&[1.0, 2.0])),
            (CANDIDATE_LABEL.to_string(), dist(&[1.0, 2.0])),
        ];
        match RunReport::build(&distributions) {
            Err(ReportError::MissingLabel(label)) => assert_eq!(label, BASELINE_LABEL),
            other => panic!("expected MissingLabel, got {other:?}"),
        }
    }

    #[test]
    fn test_verdict_lines() {
        assert_eq!(
            Verdict::Different999.to_string(),
            "is different with 99.9% confidence"
        );
        assert_eq!(
            Verdict::Different99.to_string(),
            "is different with 99% confidence"
        );
        assert_eq!(
            Verdict::Different95.to_string(),
            "is different with 95% confidence"
        );
        assert_eq!(
            Verdict::NotDifferent.to_string(),
            "is not statistically different"
        );
    }
}
