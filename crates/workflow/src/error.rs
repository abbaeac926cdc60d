// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow-crate error taxonomy: template errors (§4.C) and the
//! workflow-loading slice of §7's validation errors.

use probe_core::ValidationError;
use thiserror::Error;

/// Errors raised by the template evaluator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template syntax error: {0}")]
    Syntax(String),
    #[error("template evaluation error: {0}")]
    Eval(String),
}

/// Errors raised while loading and validating a workflow file.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}
