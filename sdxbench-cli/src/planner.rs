//! Operation Planner
//!
//! Picks the operations a run executes. Labels must be unique across all
//! descriptors; the `include` regex then selects by label. Declaration order
//! is kept, so the report lists operations the way they were declared.

use crate::RunError;
use regex::Regex;
use sdxbench_core::OperationDef;
use std::collections::HashSet;

/// Operations selected for one run
#[derive(Debug)]
pub struct ExecutionPlan<'a> {
    /// In declaration order
    pub operations: Vec<&'a OperationDef>,
}

impl ExecutionPlan<'_> {
    /// Labels in run order
    pub fn labels(&self) -> Vec<&'static str> {
        self.operations.iter().map(|d| d.label).collect()
    }
}

/// Build the plan for `operations` filtered by `include`.
pub fn build_plan<'a>(
    operations: &'a [OperationDef],
    include: &Regex,
) -> Result<ExecutionPlan<'a>, RunError> {
    let mut seen = HashSet::new();
    for def in operations {
        if !seen.insert(def.label) {
            return Err(RunError::Configuration(format!(
                "duplicate operation label {:?}",
                def.label
            )));
        }
    }

    let selected = operations
        .iter()
        .filter(|d| include.is_match(d.label))
        .collect();

    Ok(ExecutionPlan {
        operations: selected,
    })
}
