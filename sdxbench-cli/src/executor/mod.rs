//! Benchmark Executor
//!
//! ```text
//! ExecutionPlan (planner)
//!       │
//!       ▼
//! ┌─────────────┐
//! │  execution  │  Forks, in-process or isolated, collect samples
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ statistics  │  Samples to ms distributions, summaries
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ formatting  │  Banner, iteration lines, progress, summary
//! └─────────────┘
//! ```

mod execution;
mod formatting;
mod statistics;

pub use execution::Executor;
pub use formatting::{
    ConsoleReporter, format_banner, format_human_output, format_iteration_line,
};
pub use statistics::{append_samples, compute_statistics};
