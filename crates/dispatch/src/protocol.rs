// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-level request/response types (§6) and the length-prefixed RPC
//! framing used to carry them over a subprocess's stdin/stdout.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// `{ args, with }` sent to an executor for one step attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub args: Vec<String>,
    pub with: BTreeMap<String, String>,
}

/// `{ result, error }` received back. `error` empty means success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub result: BTreeMap<String, String>,
    #[serde(default)]
    pub error: String,
}

impl DispatchResponse {
    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}

/// Writes a length-prefixed JSON message: a 4-byte big-endian length
/// followed by that many bytes of JSON.
pub async fn write_framed<W: AsyncWrite + Unpin, T: Serialize>(
    writer: &mut W,
    value: &T,
) -> io::Result<()> {
    let body = serde_json::to_vec(value).map_err(io::Error::other)?;
    let len = u32::try_from(body.len()).map_err(io::Error::other)?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await
}

/// Reads one length-prefixed JSON message.
pub async fn read_framed<R: AsyncRead + Unpin, T: for<'de> Deserialize<'de>>(
    reader: &mut R,
) -> io::Result<T> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    serde_json::from_slice(&body).map_err(io::Error::other)
}
