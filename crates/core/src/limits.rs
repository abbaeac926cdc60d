// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide bound configurables ([`Limits`]). Read once from the
//! environment at process start and injected as a value from then on —
//! see SPEC_FULL.md's configuration section for why this mirrors the
//! `Clock` trait's injection style rather than ad hoc `std::env` reads.

/// Default cap on `repeat.count` absent `PROBE_MAX_REPEAT_COUNT`.
pub const DEFAULT_MAX_REPEAT_COUNT: u32 = 1000;

/// Default cap on `retry.max_attempts` absent `PROBE_MAX_ATTEMPTS`.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// Process-wide validation bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_repeat_count: u32,
    pub max_attempts: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_repeat_count: DEFAULT_MAX_REPEAT_COUNT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl Limits {
    /// Reads bounds from `PROBE_MAX_REPEAT_COUNT` / `PROBE_MAX_ATTEMPTS`.
    /// Invalid or negative values fall back to the documented defaults,
    /// per §6's environment variable rules.
    pub fn from_env() -> Self {
        Self {
            max_repeat_count: parse_bound("PROBE_MAX_REPEAT_COUNT", DEFAULT_MAX_REPEAT_COUNT),
            max_attempts: parse_bound("PROBE_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
        }
    }
}

fn parse_bound(var: &str, default: u32) -> u32 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|n| *n >= 0)
        .map(|n| n as u32)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn default_limits_match_documented_defaults() {
        let limits = Limits::default();
        assert_eq!(limits.max_repeat_count, 1000);
        assert_eq!(limits.max_attempts, 1000);
    }

    #[parameterized(
        negative = {"-5", 1000},
        not_a_number = {"abc", 1000},
        empty = {"", 1000},
    )]
    fn invalid_bound_falls_back_to_default(raw: &str, expected: u32) {
        assert_eq!(parse_bound_for_test(raw), expected);
    }

    fn parse_bound_for_test(raw: &str) -> u32 {
        raw.parse::<i64>()
            .ok()
            .filter(|n| *n >= 0)
            .map(|n| n as u32)
            .unwrap_or(1000)
    }
}
