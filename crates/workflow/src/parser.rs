// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow YAML loading and the structural slice of §4.G.1's validation
//! (name uniqueness, `needs` existence). Cycle detection and per-job bound
//! checks happen in `probe-engine`'s scheduler, which owns the DAG.

use crate::error::WorkflowError;
use crate::model::WorkflowDef;
use probe_core::ValidationError;
use std::collections::HashSet;

/// Parses and structurally validates a workflow YAML document.
pub fn load(yaml: &str) -> Result<WorkflowDef, WorkflowError> {
    let workflow: WorkflowDef = serde_yaml::from_str(yaml)?;
    validate_structure(&workflow)?;
    Ok(workflow)
}

/// The structural slice of validation: job/step name uniqueness and
/// `needs` targets that exist. Exposed so `probe-engine`'s scheduler can
/// re-run it defensively when handed a [`WorkflowDef`] that didn't come
/// through [`load`].
pub fn validate_structure(workflow: &WorkflowDef) -> Result<(), ValidationError> {
    let mut job_names = HashSet::new();
    for job in &workflow.jobs {
        if !job_names.insert(job.name.clone()) {
            return Err(ValidationError::DuplicateJobName(job.name.clone()));
        }
        let mut step_names = HashSet::new();
        for step in &job.steps {
            if !step.name.is_empty() && !step_names.insert(step.name.clone()) {
                return Err(ValidationError::DuplicateStepName(
                    step.name.clone(),
                    job.name.clone(),
                ));
            }
        }
    }

    let known: HashSet<&str> = workflow.jobs.iter().map(|j| j.name.as_str()).collect();
    for job in &workflow.jobs {
        for target in &job.needs {
            if !known.contains(target.as_str()) {
                return Err(ValidationError::UnknownNeeds {
                    job: job.name.clone(),
                    target: target.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
