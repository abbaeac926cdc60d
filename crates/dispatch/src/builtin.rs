// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process builtin executors: `echo` (reflects its parameters back as
//! the result, useful for smoke-testing workflows) and `fail` (always
//! reports an error, useful for exercising retry/failure-propagation
//! paths without a real subprocess).

use crate::error::DispatchError;
use crate::executor::ActionExecutor;
use crate::protocol::{DispatchRequest, DispatchResponse};
use async_trait::async_trait;

/// Reflects `with` back as `result`, unmodified. Mirrors the conventional
/// `echo` action used in smoke-test workflows.
pub struct EchoExecutor;

#[async_trait]
impl ActionExecutor for EchoExecutor {
    fn name(&self) -> &str {
        "echo"
    }

    fn supports_concurrency(&self) -> bool {
        true
    }

    async fn invoke(&self, request: DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        Ok(DispatchResponse { result: request.with, error: String::new() })
    }
}

/// Always reports failure with the message from `with["message"]`, or a
/// default message if absent.
pub struct FailExecutor;

#[async_trait]
impl ActionExecutor for FailExecutor {
    fn name(&self) -> &str {
        "fail"
    }

    fn supports_concurrency(&self) -> bool {
        true
    }

    async fn invoke(&self, request: DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        let message = request
            .with
            .get("message")
            .cloned()
            .unwrap_or_else(|| "fail action invoked".to_string());
        Ok(DispatchResponse { result: request.with, error: message })
    }
}
