#![warn(missing_docs)]
//! # SdxBench
//!
//! Measures what a typed query through the SDX client costs compared with
//! fetching and parsing the same Turtle document by hand.
//!
//! - **`sdxTest`**: `GetContactBasic` for `#jdoe`, resolved against the
//!   contacts container
//! - **`baseline`**: one GET of `contacts.ttl`, parsed, first triple about
//!   `#jdoe`
//!
//! Each operation runs in several forked worker processes; the samples of
//! both are compared with Welch's t-test and the verdict is written to
//! `./result.txt`.
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     sdxbench::run(sdxbench::OPERATIONS)
//! }
//! ```

pub mod adapters;

pub use adapters::{BaselineOperation, SdxQueryOperation};

pub use sdxbench_cli::{
    BenchOptions, IsolationMode, RunError, Verbosity, run, run_and_report, run_with_options,
};
pub use sdxbench_core::{Operation, OperationDef, from_fn};
pub use sdxbench_report::{
    BASELINE_LABEL, CANDIDATE_LABEL, ReportError, RunReport, Verdict, render_result,
    write_result_file,
};
pub use sdxbench_stats::{Distribution, SummaryStatistics, compute_summary};

/// Every operation this binary benchmarks, in report order
pub const OPERATIONS: &[OperationDef] = &[
    OperationDef::new(CANDIDATE_LABEL, SdxQueryOperation::setup),
    OperationDef::new(BASELINE_LABEL, BaselineOperation::setup),
];
