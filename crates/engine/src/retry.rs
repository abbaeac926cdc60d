// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff for step retries (§4.E):
//! `interval_n = min(max_interval, initial_interval * factor^(attempt-1))`,
//! optionally jittered by a bounded uniform fraction.

use probe_workflow::RetryDef;
use rand::Rng;
use std::time::Duration;

/// Computes the backoff interval before `attempt` (1-indexed: the delay
/// taken *before* this attempt, so `attempt=1` never delays).
pub fn backoff_interval(retry: &RetryDef, attempt: u32) -> Duration {
    if attempt <= 1 {
        return Duration::ZERO;
    }
    let initial = retry.initial_interval().as_secs_f64();
    let factor = retry.factor();
    let max = retry.max_interval().as_secs_f64();

    let exponent = (attempt - 1) as i32 - 1;
    let raw = initial * factor.powi(exponent);
    let bounded = raw.min(max).max(0.0);
    Duration::from_secs_f64(bounded)
}

/// Applies the retry's configured jitter fraction (0.0 = none) as a
/// uniform random perturbation of `interval`, never producing a negative
/// duration.
pub fn apply_jitter(interval: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 {
        return interval;
    }
    let secs = interval.as_secs_f64();
    let spread = secs * jitter.min(1.0);
    let delta = rand::thread_rng().gen_range(-spread..=spread);
    Duration::from_secs_f64((secs + delta).max(0.0))
}

/// Whether another attempt should be made: `attempt` is the attempt
/// number that just failed (1-indexed), `max_attempts` the cap (1 if the
/// step declared no `retry` block at all).
pub fn should_retry(max_attempts: u32, attempt: u32) -> bool {
    attempt < max_attempts
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    fn retry_def() -> RetryDef {
        // max_attempts=3, initial_interval=1s, factor=2, max_interval=60s
        serde_yaml::from_str("{}").expect("empty retry block deserializes to all defaults")
    }

    #[parameterized(
        first_attempt_has_no_backoff = {1, 0.0},
        second_attempt_waits_initial_interval = {2, 1.0},
        third_attempt_doubles = {3, 2.0},
    )]
    fn backoff_grows_exponentially(attempt: u32, expected_secs: f64) {
        let interval = backoff_interval(&retry_def(), attempt);
        assert!((interval.as_secs_f64() - expected_secs).abs() < 0.001);
    }

    #[test]
    fn backoff_is_capped_at_max_interval() {
        let retry: RetryDef = serde_yaml::from_str(
            "max_attempts: 10\ninitial_interval: 1s\nfactor: 10\nmax_interval: 5s\n",
        )
        .unwrap();
        let interval = backoff_interval(&retry, 5);
        assert_eq!(interval, Duration::from_secs(5));
    }

    #[test]
    fn zero_jitter_is_a_no_op() {
        let interval = Duration::from_secs(4);
        assert_eq!(apply_jitter(interval, 0.0), interval);
    }

    #[test]
    fn jitter_stays_within_bounds_and_non_negative() {
        let interval = Duration::from_secs(4);
        for _ in 0..50 {
            let jittered = apply_jitter(interval, 0.5);
            assert!(jittered.as_secs_f64() >= 0.0);
            assert!(jittered.as_secs_f64() <= 6.0);
        }
    }

    #[test]
    fn should_retry_respects_max_attempts() {
        let retry = retry_def();
        let max_attempts = retry.max_attempts();
        assert!(should_retry(max_attempts, 1));
        assert!(should_retry(max_attempts, 2));
        assert!(!should_retry(max_attempts, 3));
    }
}
