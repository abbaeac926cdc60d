// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor registry: maps an executor name to its discovery entry and
//! enforces the per-executor serialization lock for executors that don't
//! advertise concurrency support (4.D).
//!
//! Process-wide and read-mostly: lookups take no lock, and only spawning
//! or registering a new executor takes the short exclusive lock (§5).

use crate::error::DispatchError;
use crate::executor::ActionExecutor;
use crate::protocol::{DispatchRequest, DispatchResponse};
use crate::traced::TracedExecutor;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

struct Entry {
    executor: Arc<dyn ActionExecutor>,
    /// Serializes calls when the executor does not advertise concurrency
    /// support. `None` for executors that do.
    lock: Option<Arc<AsyncMutex<()>>>,
}

/// Holds every known executor, keyed by the name a step's `uses` field
/// references.
#[derive(Default)]
pub struct ExecutorRegistry {
    entries: RwLock<HashMap<String, Entry>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }

    /// Registers an executor under its own [`ActionExecutor::name`],
    /// wrapping it with tracing instrumentation.
    pub fn register<E: ActionExecutor + 'static>(&self, executor: E) {
        let name = executor.name().to_string();
        let concurrent = executor.supports_concurrency();
        let traced: Arc<dyn ActionExecutor> = Arc::new(TracedExecutor::new(executor));
        let lock = if concurrent { None } else { Some(Arc::new(AsyncMutex::new(()))) };
        self.entries.write().insert(name, Entry { executor: traced, lock });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Dispatches a request to the named executor, serializing through
    /// its per-executor lock if it does not support concurrency.
    /// Returns [`DispatchError::ActionUnavailable`] if no executor is
    /// registered under `name` (§4.D's failure model: unavailable is not
    /// retried).
    pub async fn dispatch(&self, name: &str, request: DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        let (executor, lock) = {
            let entries = self.entries.read();
            let entry = entries
                .get(name)
                .ok_or_else(|| DispatchError::ActionUnavailable(format!("no executor registered: {name}")))?;
            (entry.executor.clone(), entry.lock.clone())
        };

        match lock {
            Some(lock) => {
                let _guard = lock.lock().await;
                executor.invoke(request).await
            }
            None => executor.invoke(request).await,
        }
    }
}
