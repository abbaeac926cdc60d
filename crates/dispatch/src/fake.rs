// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process fake executor for testing the dispatcher and the engine
//! without spawning real subprocesses.

use crate::error::DispatchError;
use crate::executor::ActionExecutor;
use crate::protocol::{DispatchRequest, DispatchResponse};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

struct FakeState {
    /// Scripted responses returned in order; once exhausted, `default` is
    /// returned for every subsequent call.
    scripted: VecDeque<Result<DispatchResponse, DispatchError>>,
    default: Result<DispatchResponse, DispatchError>,
    calls: Vec<DispatchRequest>,
}

/// Records every call made to it; lets tests script a sequence of
/// responses (e.g. "fail twice then succeed" for retry-convergence
/// tests, per §8's end-to-end scenario 3).
#[derive(Clone)]
pub struct FakeExecutor {
    name: String,
    state: Arc<Mutex<FakeState>>,
}

impl FakeExecutor {
    pub fn new(name: impl Into<String>, default: DispatchResponse) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(FakeState {
                scripted: VecDeque::new(),
                default: Ok(default),
                calls: Vec::new(),
            })),
        }
    }

    /// Appends a scripted outcome for the next call(s), consumed in FIFO
    /// order before falling back to the default response.
    pub fn push_response(&self, response: Result<DispatchResponse, DispatchError>) {
        self.state.lock().scripted.push_back(response);
    }

    pub fn calls(&self) -> Vec<DispatchRequest> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }
}

#[async_trait]
impl ActionExecutor for FakeExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_concurrency(&self) -> bool {
        true
    }

    async fn invoke(&self, request: DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        let mut state = self.state.lock();
        state.calls.push(request);
        state
            .scripted
            .pop_front()
            .unwrap_or_else(|| state.default.clone())
    }
}
