// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `ActionExecutor` trait: the uniform contract shared by in-process
//! and subprocess-backed action executors (4.D).

use crate::error::DispatchError;
use crate::protocol::{DispatchRequest, DispatchResponse};
use async_trait::async_trait;

/// An action executor, invoked by the dispatcher once per step attempt.
/// Implementors may be a subprocess handle or an in-process function;
/// both share this contract.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    fn name(&self) -> &str;

    /// Whether concurrent calls to this executor are safe. Executors that
    /// return `false` are serialized by the registry's per-executor lock
    /// (4.D's process lifecycle rules).
    fn supports_concurrency(&self) -> bool {
        false
    }

    async fn invoke(&self, request: DispatchRequest) -> Result<DispatchResponse, DispatchError>;
}
