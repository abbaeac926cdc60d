// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatch slice of §7's error taxonomy.

use thiserror::Error;

/// Errors raised by the action dispatcher (4.D).
#[derive(Debug, Error, Clone)]
pub enum DispatchError {
    /// Spawn failure. Not retried automatically at this layer.
    #[error("action unavailable: {0}")]
    ActionUnavailable(String),
    /// Transport failure mid-call, including timeouts. Retried by the
    /// step-runner's retry policy.
    #[error("action transport error: {0}")]
    ActionTransport(String),
    /// The executor reported a non-empty `error`. Retried by policy; the
    /// partial result map is still returned to the caller.
    #[error("action failed: {action}: {message}")]
    ActionFailed { action: String, message: String },
    /// Per-call deadline exceeded. Treated as transport class for retry
    /// purposes (§7).
    #[error("action timed out after {0:?}")]
    ActionTimeout(std::time::Duration),
}

impl DispatchError {
    /// Whether step-runner retry policy should apply to this error class
    /// (§4.D's failure model / §7's propagation policy).
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DispatchError::ActionUnavailable(_))
    }
}
