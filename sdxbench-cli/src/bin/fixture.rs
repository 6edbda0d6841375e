//! Synthetic benchmark binary used by the process-level tests.
//!
//! Runs as a driver or, with `--sdx-worker`, as a worker. Operations sleep
//! for fixed times or fail in known ways so that no pod is needed.

use sdxbench_core::{Operation, OperationDef, from_fn};
use std::time::Duration;

fn sleeper(ms: u64) -> Box<dyn Operation> {
    from_fn(move || {
        std::thread::sleep(Duration::from_millis(ms));
        Ok(())
    })
}

fn slow() -> anyhow::Result<Box<dyn Operation>> {
    Ok(sleeper(20))
}

fn fast() -> anyhow::Result<Box<dyn Operation>> {
    Ok(sleeper(2))
}

fn refused() -> anyhow::Result<Box<dyn Operation>> {
    Ok(from_fn(|| -> anyhow::Result<()> {
        anyhow::bail!("connection refused")
    }))
}

fn panicky() -> anyhow::Result<Box<dyn Operation>> {
    Ok(from_fn(|| -> anyhow::Result<()> { panic!("boom") }))
}

const OPERATIONS: &[OperationDef] = &[
    OperationDef::new("sdxTest", slow),
    OperationDef::new("baseline", fast),
    OperationDef::new("refused", refused),
    OperationDef::new("panicky", panicky),
];

fn main() -> anyhow::Result<()> {
    sdxbench_cli::run(OPERATIONS)
}
