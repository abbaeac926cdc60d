// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §7's full error taxonomy, as seen by the scheduler: validation errors
//! (fatal, pre-execution) plus the step-local error classes that never
//! halt the workflow on their own.

use probe_core::ValidationError;
use probe_dispatch::DispatchError;
use probe_workflow::TemplateError;
use thiserror::Error;

/// Errors that can abort an entire workflow run. Step-local failures
/// (template eval, dispatch failures, timeouts) are captured in a job's
/// step statuses instead and do not appear here unless they escape a
/// job's own error handling (a bug, not a designed path).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("workflow run was cancelled")]
    Cancelled,
}
