#![warn(missing_docs)]
//! SdxBench Report
//!
//! Turns the per-label distributions of a run into the verdict of the
//! candidate-versus-baseline comparison and writes the plain-text result file.

mod report;
mod text;

pub use report::{
    BASELINE_LABEL, CANDIDATE_LABEL, OperationStats, ReportError, RunReport, Verdict,
};
pub use text::{render_result, write_result, write_result_file};

/// Default location of the result file, relative to the working directory
pub const DEFAULT_RESULT_PATH: &str = "./result.txt";
