use std::time::Duration;

use crate::executor::OperationError;
use crate::retry::config::RetryConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter { delay: Duration, reason: RetryReason },
    Stop { reason: RetryReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// The platform classified the failure as permanent.
    NotRetryable,
    AttemptsExhausted,
    /// Delay taken from the platform's retry-after hint.
    RetryAfterHint,
    Backoff,
}

/// Decide whether an item gets another attempt and how long to wait first.
///
/// - `attempt_no`: 1-based number of the attempt that just failed.
/// - `max_attempts`: total attempts allowed (`retry_attempts + 1`).
/// - `rand_u64`: RNG for full jitter.
pub fn decide_retry(
    cfg: &RetryConfig,
    attempt_no: u32,
    max_attempts: u32,
    error: &OperationError,
    rand_u64: impl Fn() -> u64,
) -> RetryDecision {
    if !error.is_retryable() {
        return RetryDecision::Stop {
            reason: RetryReason::NotRetryable,
        };
    }

    if attempt_no >= max_attempts {
        return RetryDecision::Stop {
            reason: RetryReason::AttemptsExhausted,
        };
    }

    if let Some(hint) = error.retry_after() {
        return RetryDecision::RetryAfter {
            delay: hint.min(cfg.max_delay),
            reason: RetryReason::RetryAfterHint,
        };
    }

    // Exponential backoff: base * factor^(attempt_no-1), with full jitter.
    let exp = attempt_no.saturating_sub(1).min(i32::MAX as u32) as i32;
    let raw = (cfg.base_delay.as_millis() as f64) * cfg.factor.powi(exp);
    let raw_ms = raw.min(cfg.max_delay.as_millis() as f64).max(0.0) as u64;

    let jitter_ms = if raw_ms == 0 { 0 } else { rand_u64() % (raw_ms + 1) };
    RetryDecision::RetryAfter {
        delay: Duration::from_millis(jitter_ms),
        reason: RetryReason::Backoff,
    }
}
