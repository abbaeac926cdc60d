// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The validation slice of §7's error taxonomy, shared by `probe-workflow`
//! and `probe-engine`. Fatal; validation errors abort before any job runs.

use thiserror::Error;

/// Errors surfaced while validating a workflow before execution begins.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("duplicate job name: {0}")]
    DuplicateJobName(String),
    #[error("duplicate step name: {0} (job {1})")]
    DuplicateStepName(String, String),
    #[error("job {job} needs unknown job {target}")]
    UnknownNeeds { job: String, target: String },
    #[error("cycle detected in job dependency graph: {0}")]
    Cycle(String),
    #[error("missing required field: {0}")]
    MissingField(String),
    #[error("bound exceeded: {field} = {value} exceeds limit {limit}")]
    BoundExceeded {
        field: String,
        value: u32,
        limit: u32,
    },
    #[error("malformed template in {field}: {reason}")]
    MalformedTemplate { field: String, reason: String },
}
