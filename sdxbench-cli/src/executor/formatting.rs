//! Console Output
//!
//! What the driver prints while it runs, by verbosity:
//!
//! | verbosity | banner | fork headers | iteration lines | progress bar | summary |
//! |-----------|--------|--------------|-----------------|--------------|---------|
//! | quiet     |        |              |                 |              |         |
//! | normal    | yes    |              |                 | yes          | yes     |
//! | extra     | yes    | yes          | yes             |              | yes     |

use crate::config::{BenchOptions, Verbosity};
use indicatif::{ProgressBar, ProgressStyle};
use sdxbench_core::PhaseEvent;
use sdxbench_ipc::Phase;
use sdxbench_stats::SummaryStatistics;

/// `# Warmup Iteration   1: 37 ops, 1000.412 ms`
pub fn format_iteration_line(phase: Phase, index: u32, invocations: u64, elapsed_nanos: u64) -> String {
    let label = match phase {
        Phase::Warmup => "Warmup Iteration",
        Phase::Measurement => "Iteration",
    };
    format!(
        "# {label} {:>3}: {invocations} ops, {:.3} ms",
        index + 1,
        elapsed_nanos as f64 / 1_000_000.0
    )
}

/// Run banner listing the settings and the selected labels
pub fn format_banner(options: &BenchOptions, labels: &[&str]) -> String {
    let mut output = String::new();
    output.push_str("SdxBench\n");
    output.push_str(&"=".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "# Warmup: {} iterations, {:?} each\n",
        options.warmup_iterations, options.warmup_time
    ));
    output.push_str(&format!(
        "# Measurement: {} iterations, {:?} each\n",
        options.measurement_iterations, options.measurement_time
    ));
    output.push_str(&format!(
        "# Forks: {} ({})\n",
        options.forks,
        if options.isolation.is_isolated() {
            "isolated"
        } else {
            "in-process"
        }
    ));
    output.push_str(&format!("# Operations: {}\n", labels.join(", ")));
    output
}

/// Human summary of every distribution, values in ms
pub fn format_human_output(stats: &[(String, SummaryStatistics)]) -> String {
    let mut output = String::new();
    output.push('\n');
    output.push_str("Results (ms)\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');

    for (label, s) in stats {
        output.push_str(&format!("  {label}\n"));
        output.push_str(&format!(
            "      mean: {:.3}  stdev: {:.3}  n: {}\n",
            s.mean, s.std_dev, s.sample_count
        ));
        output.push_str(&format!(
            "      p50: {:.3}  p90: {:.3}  p99: {:.3}  p99.9: {:.3}  max: {:.3}\n",
            s.p50, s.p90, s.p99, s.p999, s.max
        ));
    }
    output
}

/// Prints run progress according to the configured verbosity
pub struct ConsoleReporter {
    verbosity: Verbosity,
    windows_per_fork: u64,
    progress: Option<ProgressBar>,
}

impl ConsoleReporter {
    /// Reporter for a run with `options`
    pub fn new(options: &BenchOptions) -> Self {
        Self {
            verbosity: options.verbosity,
            windows_per_fork: u64::from(options.warmup_iterations)
                + u64::from(options.measurement_iterations),
            progress: None,
        }
    }

    /// Print the banner
    pub fn banner(&self, options: &BenchOptions, labels: &[&str]) {
        if self.verbosity >= Verbosity::Normal {
            println!("{}", format_banner(options, labels));
        }
    }

    /// An operation with `forks` forks is about to start
    pub fn operation_started(&mut self, label: &str, forks: u32) {
        match self.verbosity {
            Verbosity::Quiet => {}
            Verbosity::Normal => {
                let pb = ProgressBar::new(u64::from(forks) * self.windows_per_fork);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template(
                            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                        )
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("#>-"),
                );
                pb.set_message(label.to_string());
                self.progress = Some(pb);
            }
            Verbosity::Extra => println!("# Operation: {label}"),
        }
    }

    /// Fork `fork` (zero-based) of `forks` is about to start
    pub fn fork_started(&self, fork: u32, forks: u32) {
        if self.verbosity == Verbosity::Extra {
            println!("# Fork: {} of {forks}", fork + 1);
        }
    }

    /// A window closed or warmup ended inside the current fork
    pub fn phase_event(&self, event: &PhaseEvent) {
        match *event {
            PhaseEvent::IterationComplete {
                phase,
                index,
                invocations,
                elapsed_nanos,
            } => {
                if let Some(pb) = &self.progress {
                    pb.inc(1);
                }
                if self.verbosity == Verbosity::Extra {
                    println!(
                        "{}",
                        format_iteration_line(phase, index, invocations, elapsed_nanos)
                    );
                }
            }
            PhaseEvent::WarmupComplete { .. } => {}
        }
    }

    /// The current operation ran all of its forks
    pub fn operation_finished(&mut self) {
        if let Some(pb) = self.progress.take() {
            pb.finish_with_message("done");
        }
        if self.verbosity == Verbosity::Extra {
            println!();
        }
    }

    /// Print the per-label summary
    pub fn summary(&self, stats: &[(String, SummaryStatistics)]) {
        if self.verbosity >= Verbosity::Normal {
            println!("{}", format_human_output(stats));
        }
    }
}
