//! # Retry Controller
//!
//! Pure retry policy: given how many runs have failed and what kind of
//! failure the last one was, decide whether to requeue with a backoff delay
//! or give up. The scheduler owns the clock; nothing here sleeps.

use crate::failure::FailureKind;
use core_runtime::{DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS};
use std::time::Duration;

/// Bounds on automatic retries.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total runs allowed per item before it stays failed
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per subsequent retry
    pub initial_backoff_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff_ms: u64) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
        }
    }
}

/// What to do with a failed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Requeue the item after waiting out the delay
    Retry { delay: Duration },
    /// Leave the item failed
    GiveUp,
}

/// Decides retries from the policy alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Decide the fate of an item whose run just failed.
    ///
    /// `failed_attempts` counts failed runs including the one being decided.
    /// Failures that are properties of the input itself are never retried;
    /// rerunning the same bytes cannot change the outcome.
    pub fn decide(&self, failed_attempts: u32, failure: &FailureKind) -> RetryDecision {
        if failure.is_terminal_input() {
            return RetryDecision::GiveUp;
        }
        if failed_attempts >= self.policy.max_attempts {
            return RetryDecision::GiveUp;
        }

        // Exponential backoff: initial, 2x, 4x, ...
        let exponent = failed_attempts.saturating_sub(1).min(16);
        let delay_ms = self.policy.initial_backoff_ms.saturating_mul(1 << exponent);
        RetryDecision::Retry {
            delay: Duration::from_millis(delay_ms),
        }
    }
}
