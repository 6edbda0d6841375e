//! Benchmark Execution
//!
//! Runs every fork of every planned operation, one after another, and folds
//! the samples into one distribution per label.
//!
//! ## Execution Modes
//!
//! - **Isolated**: each fork is a fresh worker process driven by the
//!   [`Supervisor`]. The default.
//! - **In-process**: each fork builds a fresh operation inside the driver.
//!   Phases and sampling are identical; only the process boundary is missing.

use super::formatting::ConsoleReporter;
use super::statistics::append_samples;
use crate::RunError;
use crate::config::IsolationMode;
use crate::planner::ExecutionPlan;
use crate::supervisor::{ForkOutcome, Supervisor, SupervisorError};
use sdxbench_core::{OperationDef, PhaseError, PhaseEvent, run_fork};
use sdxbench_ipc::BenchmarkConfig;
use sdxbench_stats::Distribution;
use tracing::{debug, info};

/// Where forks run and how each one is configured
pub struct Executor {
    config: BenchmarkConfig,
    forks: u32,
    mode: ForkMode,
}

enum ForkMode {
    InProcess,
    Isolated(Supervisor),
}

impl Executor {
    /// Executor for `forks` forks per operation in `isolation` mode
    pub fn new(config: BenchmarkConfig, forks: u32, isolation: IsolationMode) -> Self {
        let mode = match isolation {
            IsolationMode::Process => ForkMode::Isolated(Supervisor::new(config.clone())),
            IsolationMode::InProcess => ForkMode::InProcess,
        };
        Self { config, forks, mode }
    }

    /// Isolated executor that spawns `supervisor`'s workers
    pub fn with_supervisor(config: BenchmarkConfig, forks: u32, supervisor: Supervisor) -> Self {
        Self {
            config,
            forks,
            mode: ForkMode::Isolated(supervisor),
        }
    }

    /// Run the plan; distributions come back in plan order.
    pub fn execute(
        &self,
        plan: &ExecutionPlan<'_>,
        console: &mut ConsoleReporter,
    ) -> Result<Vec<(String, Distribution)>, RunError> {
        let mut distributions = Vec::with_capacity(plan.operations.len());

        for def in &plan.operations {
            console.operation_started(def.label, self.forks);
            let mut distribution = Distribution::new();

            for fork in 0..self.forks {
                console.fork_started(fork, self.forks);
                let outcome = self.run_one_fork(def, fork, console)?;
                debug!(
                    label = def.label,
                    fork,
                    samples = outcome.samples.len(),
                    warmup_invocations = outcome.warmup_invocations,
                    "fork complete"
                );
                append_samples(&mut distribution, &outcome.samples);
            }

            console.operation_finished();
            info!(label = def.label, samples = distribution.n(), "operation complete");
            distributions.push((def.label.to_string(), distribution));
        }

        Ok(distributions)
    }

    fn run_one_fork(
        &self,
        def: &OperationDef,
        fork: u32,
        console: &ConsoleReporter,
    ) -> Result<ForkOutcome, RunError> {
        match &self.mode {
            ForkMode::InProcess => {
                let result = run_fork(def, &self.config, |event: PhaseEvent| {
                    console.phase_event(&event);
                    Ok(())
                });
                match result {
                    Ok(result) => Ok(ForkOutcome {
                        samples: result.samples,
                        warmup_invocations: result.warmup_invocations,
                        invocations: result.invocations,
                    }),
                    Err(PhaseError::Sink(e)) => Err(RunError::Fork {
                        label: def.label.to_string(),
                        fork,
                        message: format!("{e:#}"),
                    }),
                    Err(e) => Err(RunError::Operation {
                        label: def.label.to_string(),
                        message: e.to_string(),
                    }),
                }
            }
            ForkMode::Isolated(supervisor) => supervisor
                .run_fork(def.label, |event| console.phase_event(&event))
                .map_err(|e| fork_error(def.label, fork, e)),
        }
    }
}

fn fork_error(label: &str, fork: u32, error: SupervisorError) -> RunError {
    if error.is_operation_failure() {
        RunError::Operation {
            label: label.to_string(),
            message: error.to_string(),
        }
    } else {
        RunError::Fork {
            label: label.to_string(),
            fork,
            message: error.to_string(),
        }
    }
}
