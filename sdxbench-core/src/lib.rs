#![warn(missing_docs)]
//! SdxBench Core - Worker Runtime
//!
//! This crate provides the execution environment for one fork:
//! - `Operation` trait and `OperationDef` descriptors
//! - `Bencher` warmup and measurement window loop
//! - Wall-clock timer and CPU pinning
//! - `WorkerMain`, the child-process side of the IPC protocol

mod bencher;
mod measure;
mod worker;

pub use bencher::{Bencher, BenchmarkResult, PhaseError, PhaseEvent, run_fork, run_phases};
pub use measure::{Timer, current_cpu, pin_to_cpu};
pub use worker::WorkerMain;

/// A single benchmarked call.
///
/// Implementors own whatever long-lived handles they need (clients,
/// runtimes); those are built once per fork by [`OperationDef::setup`].
pub trait Operation {
    /// Perform one call. The produced value is discarded by the caller.
    fn invoke(&mut self) -> anyhow::Result<()>;
}

/// Builds the per-fork state of an operation
pub type SetupFn = fn() -> anyhow::Result<Box<dyn Operation>>;

/// A labelled operation the harness can run
#[derive(Debug, Clone, Copy)]
pub struct OperationDef {
    /// Unique label, used as the key of the resulting distribution
    pub label: &'static str,
    /// Called once at the start of every fork
    pub setup: SetupFn,
}

impl OperationDef {
    /// Pair a label with its setup function
    pub const fn new(label: &'static str, setup: SetupFn) -> Self {
        Self { label, setup }
    }

    /// Run `setup`, producing a ready-to-invoke operation
    pub fn instantiate(&self) -> anyhow::Result<Box<dyn Operation>> {
        (self.setup)()
    }
}

/// Adapts a closure into an [`Operation`]
pub struct FnOperation<F> {
    f: F,
}

impl<F, T> Operation for FnOperation<F>
where
    F: FnMut() -> anyhow::Result<T>,
{
    #[inline]
    fn invoke(&mut self) -> anyhow::Result<()> {
        let value = (self.f)()?;
        std::hint::black_box(value);
        Ok(())
    }
}

/// Box a closure as an operation
pub fn from_fn<F, T>(f: F) -> Box<dyn Operation>
where
    F: FnMut() -> anyhow::Result<T> + 'static,
{
    Box::new(FnOperation { f })
}

/// Find a descriptor by literal label
pub fn find_operation<'a>(defs: &'a [OperationDef], label: &str) -> Option<&'a OperationDef> {
    defs.iter().find(|d| d.label == label)
}
