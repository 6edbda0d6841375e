//! Bencher - Warmup and Measurement Windows
//!
//! A fork runs `warmup_iterations` windows whose timings are thrown away,
//! then `measurement_iterations` windows in which every invocation becomes a
//! sample. Inside a window the operation is called back-to-back until the
//! window has elapsed; a call that started before the deadline still counts.

use crate::measure::{Timer, duration_nanos};
use crate::{Operation, OperationDef};
use sdxbench_ipc::{BenchmarkConfig, Phase, Sample};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Why a fork stopped early
#[derive(Debug, Error)]
pub enum PhaseError {
    /// `setup` returned an error or panicked
    #[error("setup failed: {0}")]
    Setup(String),

    /// An invocation returned an error
    #[error("{phase} iteration {iteration} failed: {message}")]
    Operation {
        /// Phase the failing call ran in
        phase: Phase,
        /// Zero-based iteration index within the phase
        iteration: u32,
        /// Error chain of the failing call
        message: String,
    },

    /// An invocation panicked
    #[error("operation panicked: {0}")]
    Panic(String),

    /// The progress callback could not deliver an event
    #[error("progress sink failed: {0}")]
    Sink(#[source] anyhow::Error),
}

/// Progress notifications emitted between windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// A window closed
    IterationComplete {
        /// Phase the window belonged to
        phase: Phase,
        /// Zero-based window index within the phase
        index: u32,
        /// Calls started inside the window
        invocations: u64,
        /// Real window length, including the overshoot of the last call
        elapsed_nanos: u64,
    },
    /// Every warmup window closed; measurement starts next
    WarmupComplete {
        /// Warmup windows run
        iterations: u32,
        /// Calls across all warmup windows
        invocations: u64,
    },
}

/// Outcome of one fork
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    /// One sample per measured call, in call order
    pub samples: Vec<Sample>,
    /// Calls made during warmup
    pub warmup_invocations: u64,
    /// Calls made during measurement (equals `samples.len()`)
    pub invocations: u64,
    /// Sum of all sample durations
    pub total_time_ns: u64,
}

#[derive(Debug, Clone, Copy)]
struct WindowStats {
    invocations: u64,
    elapsed_nanos: u64,
}

/// Collects measurement samples for one fork
#[derive(Debug, Default)]
pub struct Bencher {
    samples: Vec<Sample>,
    warmup_invocations: u64,
}

impl Bencher {
    /// Create an empty bencher
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one warmup window; nothing is recorded
    pub fn warmup_window(
        &mut self,
        operation: &mut dyn Operation,
        window: Duration,
    ) -> anyhow::Result<(u64, u64)> {
        let stats = self.window(operation, window, None)?;
        self.warmup_invocations += stats.invocations;
        Ok((stats.invocations, stats.elapsed_nanos))
    }

    /// Run one measurement window, recording a sample per call
    pub fn measurement_window(
        &mut self,
        operation: &mut dyn Operation,
        window: Duration,
        iteration: u32,
    ) -> anyhow::Result<(u64, u64)> {
        let stats = self.window(operation, window, Some(iteration))?;
        Ok((stats.invocations, stats.elapsed_nanos))
    }

    #[inline]
    fn window(
        &mut self,
        operation: &mut dyn Operation,
        window: Duration,
        record: Option<u32>,
    ) -> anyhow::Result<WindowStats> {
        let started = Instant::now();
        let mut invocations = 0u64;

        // The first call always starts inside the window.
        loop {
            let timer = Timer::start();
            operation.invoke()?;
            let nanos = timer.stop();
            invocations += 1;

            if let Some(iteration) = record {
                self.samples.push(Sample::new(nanos, iteration));
            }

            if started.elapsed() >= window {
                break;
            }
        }

        Ok(WindowStats {
            invocations,
            elapsed_nanos: duration_nanos(started.elapsed()),
        })
    }

    /// Samples recorded so far
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Finalize and return results
    pub fn finish(self) -> BenchmarkResult {
        let total_time_ns = self
            .samples
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(s.duration_nanos));

        BenchmarkResult {
            invocations: self.samples.len() as u64,
            samples: self.samples,
            warmup_invocations: self.warmup_invocations,
            total_time_ns,
        }
    }
}

/// Run warmup then measurement for an already constructed operation.
///
/// `on_event` is called after every window and once between the phases.
/// Operation errors stop the fork immediately.
pub fn run_phases<F>(
    operation: &mut dyn Operation,
    config: &BenchmarkConfig,
    mut on_event: F,
) -> Result<BenchmarkResult, PhaseError>
where
    F: FnMut(PhaseEvent) -> anyhow::Result<()>,
{
    let mut bencher = Bencher::new();

    let warmup = Duration::from_nanos(config.warmup_time_ns);
    for index in 0..config.warmup_iterations {
        let (invocations, elapsed_nanos) = bencher
            .warmup_window(operation, warmup)
            .map_err(|e| operation_error(Phase::Warmup, index, e))?;
        on_event(PhaseEvent::IterationComplete {
            phase: Phase::Warmup,
            index,
            invocations,
            elapsed_nanos,
        })
        .map_err(PhaseError::Sink)?;
    }

    on_event(PhaseEvent::WarmupComplete {
        iterations: config.warmup_iterations,
        invocations: bencher.warmup_invocations,
    })
    .map_err(PhaseError::Sink)?;

    let measurement = Duration::from_nanos(config.measurement_time_ns);
    for index in 0..config.measurement_iterations {
        let (invocations, elapsed_nanos) = bencher
            .measurement_window(operation, measurement, index)
            .map_err(|e| operation_error(Phase::Measurement, index, e))?;
        on_event(PhaseEvent::IterationComplete {
            phase: Phase::Measurement,
            index,
            invocations,
            elapsed_nanos,
        })
        .map_err(PhaseError::Sink)?;
    }

    Ok(bencher.finish())
}

/// Run one complete fork of `def`: setup, warmup, measurement.
///
/// Panics in `setup` or in the operation are caught and reported as
/// [`PhaseError::Setup`] and [`PhaseError::Panic`].
pub fn run_fork<F>(
    def: &OperationDef,
    config: &BenchmarkConfig,
    on_event: F,
) -> Result<BenchmarkResult, PhaseError>
where
    F: FnMut(PhaseEvent) -> anyhow::Result<()>,
{
    let mut operation = match catch_unwind(|| def.instantiate()) {
        Ok(Ok(op)) => op,
        Ok(Err(e)) => return Err(PhaseError::Setup(format!("{e:#}"))),
        Err(panic) => return Err(PhaseError::Setup(panic_message(panic.as_ref()))),
    };

    catch_unwind(AssertUnwindSafe(|| {
        run_phases(operation.as_mut(), config, on_event)
    }))
    .unwrap_or_else(|panic| Err(PhaseError::Panic(panic_message(panic.as_ref()))))
}

fn operation_error(phase: Phase, iteration: u32, error: anyhow::Error) -> PhaseError {
    PhaseError::Operation {
        phase,
        iteration,
        message: format!("{error:#}"),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
