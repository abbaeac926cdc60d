// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! probe-dispatch: the action-plugin dispatch protocol (4.D) — wire
//! framing, the executor registry, subprocess process lifecycle, and a
//! pair of in-process builtin executors.

pub mod builtin;
pub mod error;
pub mod executor;
pub mod protocol;
pub mod redact;
pub mod registry;
pub mod subprocess;
pub mod traced;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use builtin::{EchoExecutor, FailExecutor};
pub use error::DispatchError;
pub use executor::ActionExecutor;
pub use protocol::{read_framed, write_framed, DispatchRequest, DispatchResponse};
pub use redact::{redact_for_log, MAX_LOG_STRING_LENGTH};
pub use registry::ExecutorRegistry;
pub use subprocess::{SubprocessExecutor, DEFAULT_CALL_DEADLINE};
pub use traced::TracedExecutor;
