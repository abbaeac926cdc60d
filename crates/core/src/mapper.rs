// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The struct mapper (4.B): binds flat or nested [`Value`] maps to typed
//! request structures by field tag, and back.

use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;

/// A required field was absent from the source mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrMissingField(pub String);

impl fmt::Display for ErrMissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing required field: {}", self.0)
    }
}

impl std::error::Error for ErrMissingField {}

/// Implemented by types that can be populated from a flat/nested params
/// mapping. Unknown keys are ignored; a missing field marked `required`
/// by the implementation fails with [`ErrMissingField`].
pub trait FromParams: Sized {
    fn from_params(params: &IndexMap<String, Value>) -> Result<Self, ErrMissingField>;
}

/// Implemented by types that can be emitted as a nested params mapping
/// keyed by field tag.
pub trait IntoParams {
    fn into_params(&self) -> IndexMap<String, Value>;
}

/// Reads a required string field, applying the same string->type coercion
/// used by the codec's unflatten.
pub fn require_str<'a>(
    params: &'a IndexMap<String, Value>,
    key: &str,
) -> Result<&'a str, ErrMissingField> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ErrMissingField(key.to_string()))
}

/// Reads an optional string field, returning `default` if absent.
pub fn opt_str<'a>(params: &'a IndexMap<String, Value>, key: &str, default: &'a str) -> &'a str {
    params.get(key).and_then(Value::as_str).unwrap_or(default)
}

/// Reads a required integer field, coercing from `Value::String` via the
/// codec's `typed_value` rules if the stored value is textual.
pub fn require_int(params: &IndexMap<String, Value>, key: &str) -> Result<i64, ErrMissingField> {
    match params.get(key) {
        Some(Value::Int(n)) => Ok(*n),
        Some(Value::String(s)) => s.parse().map_err(|_| ErrMissingField(key.to_string())),
        _ => Err(ErrMissingField(key.to_string())),
    }
}

/// Reads an optional boolean field, returning `default` if absent.
pub fn opt_bool(params: &IndexMap<String, Value>, key: &str, default: bool) -> bool {
    match params.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.parse().unwrap_or(default),
        _ => default,
    }
}
