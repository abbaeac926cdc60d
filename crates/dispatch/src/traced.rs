// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing wrapper for any `ActionExecutor`, matching the style of
//! adapter-wrapping elsewhere in the stack (see DESIGN.md).

use crate::error::DispatchError;
use crate::executor::ActionExecutor;
use crate::protocol::{DispatchRequest, DispatchResponse};
use crate::redact::redact_for_log;
use async_trait::async_trait;
use tracing::Instrument;

/// Wraps any [`ActionExecutor`] with span-scoped logging of dispatch
/// start/finish/elapsed, redacting sensitive parameters before they are
/// logged (§6).
pub struct TracedExecutor<E> {
    inner: E,
}

impl<E> TracedExecutor<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<E: ActionExecutor> ActionExecutor for TracedExecutor<E> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn supports_concurrency(&self) -> bool {
        self.inner.supports_concurrency()
    }

    async fn invoke(&self, request: DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        let name = self.inner.name().to_string();
        let span = tracing::info_span!("dispatch", action = %name);

        async {
            let redacted_with = redact_for_log(&request.with);
            tracing::info!(with = ?redacted_with, "dispatching");

            let start = std::time::Instant::now();
            let result = self.inner.invoke(request).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(resp) => {
                    let redacted_result = redact_for_log(&resp.result);
                    tracing::info!(elapsed_ms, success = resp.is_success(), result = ?redacted_result, "completed");
                }
                Err(e) => tracing::error!(elapsed_ms, error = %e, "failed"),
            }

            result
        }
        .instrument(span)
        .await
    }
}
