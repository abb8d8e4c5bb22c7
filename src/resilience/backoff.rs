//! Exponential backoff schedule.
//!
//! # Responsibilities
//! - Compute the wait preceding each retry attempt
//!
//! # Design Decisions
//! - The schedule is exact, with no jitter: retry timing must be
//!   predictable for callers that reason about total latency

use std::time::Duration;

use crate::resilience::retry::RetryPolicy;

/// Wait before retrying after `attempt` failed (1-based):
/// `initial_delay * multiplier^(attempt - 1)`.
pub fn delay_for_attempt(policy: &RetryPolicy, attempt: u32) -> Duration {
    if attempt <= 1 {
        return policy.initial_delay;
    }
    let secs = policy.initial_delay.as_secs_f64()
        * policy.backoff_multiplier.powi((attempt - 1) as i32);
    if !secs.is_finite() {
        return Duration::MAX;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
