#![warn(missing_docs)]
//! SdxBench CLI Library
//!
//! Driver side of a benchmark binary: options, planning, fork supervision,
//! console output and the final report. A binary hands its operation
//! descriptors to [`run`]:
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     sdxbench_cli::run(&my_operations())
//! }
//! ```
//!
//! The same binary doubles as the worker: the supervisor re-executes it with
//! the hidden `--sdx-worker` flag.

mod config;
mod executor;
mod planner;
mod supervisor;

pub use config::{
    BenchOptions, CONFIG_FILE_NAME, IsolationMode, OutputConfig, RunnerConfig, SdxConfig,
    Verbosity, parse_duration,
};
pub use executor::{
    ConsoleReporter, Executor, append_samples, compute_statistics, format_banner,
    format_human_output, format_iteration_line,
};
pub use planner::{ExecutionPlan, build_plan};
pub use supervisor::{
    ForkOutcome, ForkState, Supervisor, SupervisorError, WORKER_FLAG, WorkerHandle,
};

use clap::Parser;
use sdxbench_core::{OperationDef, WorkerMain};
use sdxbench_report::{ReportError, RunReport, write_result_file};
use sdxbench_stats::Distribution;
use thiserror::Error;
use tracing::info;

/// Why a run stopped
#[derive(Debug, Error)]
pub enum RunError {
    /// Invalid options, detected before any operation runs
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A fork failed to start, broke the protocol or exited abnormally
    #[error("fork {fork} of {label} failed: {message}")]
    Fork {
        /// Operation label
        label: String,
        /// Zero-based fork index
        fork: u32,
        /// What went wrong
        message: String,
    },

    /// The operation itself returned an error or panicked
    #[error("operation {label} failed: {message}")]
    Operation {
        /// Operation label
        label: String,
        /// Error chain reported by the fork
        message: String,
    },

    /// The report could not be produced
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// SdxBench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "sdxbench")]
#[command(author, version, about = "SdxBench - typed query vs raw fetch microbenchmark")]
pub struct Cli {
    /// Internal: Run as worker process (used by supervisor)
    #[arg(long, hide = true)]
    pub sdx_worker: bool,
}

/// Entry point of a benchmark binary.
///
/// In worker mode, serves one fork over the inherited pipes. Otherwise runs
/// every operation with options from `sdxbench.toml` (or the defaults) and
/// writes the result file.
pub fn run(operations: &[OperationDef]) -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli, operations)
}

/// [`run`] with pre-parsed arguments
pub fn run_with_cli(cli: Cli, operations: &[OperationDef]) -> anyhow::Result<()> {
    // Workers never install a subscriber; their stdout is not a console.
    if cli.sdx_worker {
        return run_worker_mode(operations);
    }

    let options = BenchOptions::load()?;
    init_tracing(options.verbosity);

    run_and_report(operations, &options)?;
    Ok(())
}

fn run_worker_mode(operations: &[OperationDef]) -> anyhow::Result<()> {
    let mut worker = WorkerMain::new(operations);
    worker
        .run()
        .map_err(|e| anyhow::anyhow!("worker error: {e:#}"))
}

fn init_tracing(verbosity: Verbosity) {
    let filter = match verbosity {
        Verbosity::Quiet => "sdxbench=warn",
        Verbosity::Normal => "sdxbench=info",
        Verbosity::Extra => "sdxbench=debug",
    };
    // A subscriber may already be installed by an embedding test harness.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Validate `options`, then run every selected operation.
///
/// Returns one distribution per label, in declaration order. No operation
/// runs when validation fails.
pub fn run_with_options(
    operations: &[OperationDef],
    options: &BenchOptions,
) -> Result<Vec<(String, Distribution)>, RunError> {
    let include = options.validate()?;
    let plan = build_plan(operations, &include)?;
    let labels = plan.labels();

    let mut console = ConsoleReporter::new(options);
    console.banner(options, &labels);
    info!(operations = ?labels, forks = options.forks, "starting run");

    let executor = Executor::new(
        options.to_benchmark_config(),
        options.forks,
        options.isolation,
    );
    let distributions = executor.execute(&plan, &mut console)?;

    console.summary(&compute_statistics(&distributions));
    Ok(distributions)
}

/// Run, then compare and write the result file at `options.result_path`.
pub fn run_and_report(
    operations: &[OperationDef],
    options: &BenchOptions,
) -> Result<RunReport, RunError> {
    let distributions = run_with_options(operations, options)?;

    let stdout = std::io::stdout();
    let mut console = stdout.lock();
    let report = write_result_file(&distributions, &options.result_path, &mut console)?;
    info!(
        path = %options.result_path.display(),
        verdict = %report.verdict,
        "result written"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdxbench_core::{Operation, from_fn};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    static SETUPS: AtomicUsize = AtomicUsize::new(0);

    fn counted() -> anyhow::Result<Box<dyn Operation>> {
        SETUPS.fetch_add(1, Ordering::SeqCst);
        Ok(from_fn(|| Ok(())))
    }

    #[test]
    fn test_cli_parses_worker_flag() {
        let cli = Cli::try_parse_from(["sdxbench", "--sdx-worker"]).unwrap();
        assert!(cli.sdx_worker);

        let cli = Cli::try_parse_from(["sdxbench"]).unwrap();
        assert!(!cli.sdx_worker);

        assert!(Cli::try_parse_from(["sdxbench", "--forks", "3"]).is_err());
        assert!(Cli::try_parse_from(["sdxbench", "--bench"]).is_err());
    }

    #[test]
    fn test_invalid_options_run_nothing() {
        let operations = [OperationDef::new("counted", counted)];
        let options = BenchOptions {
            forks: 0,
            isolation: IsolationMode::InProcess,
            verbosity: Verbosity::Quiet,
            ..Default::default()
        };

        let err = run_with_options(&operations, &options).unwrap_err();
        assert!(matches!(err, RunError::Configuration(_)));
        assert_eq!(SETUPS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_labels_leave_no_file() {
        fn quick() -> anyhow::Result<Box<dyn Operation>> {
            Ok(from_fn(|| Ok(())))
        }
        let operations = [
            OperationDef::new("sdxTest", quick),
            OperationDef::new("Baseline", quick),
        ];

        let dir = tempfile::tempdir().unwrap();
        let options = BenchOptions {
            warmup_iterations: 0,
            measurement_time: Duration::from_millis(1),
            measurement_iterations: 1,
            forks: 1,
            verbosity: Verbosity::Quiet,
            isolation: IsolationMode::InProcess,
            result_path: dir.path().join("result.txt"),
            ..Default::default()
        };

        let err = run_and_report(&operations, &options).unwrap_err();
        assert!(matches!(
            err,
            RunError::Report(ReportError::MissingLabel(ref label)) if label == "baseline"
        ));
        assert!(!options.result_path.exists());
    }

    #[test]
    fn test_error_messages() {
        let err = RunError::Fork {
            label: "sdxTest".to_string(),
            fork: 1,
            message: "worker exited while measuring".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "fork 1 of sdxTest failed: worker exited while measuring"
        );
    }
}
