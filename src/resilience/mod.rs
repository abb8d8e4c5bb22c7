//! Resilience subsystem: retry policies and backoff schedules.

pub mod backoff;
pub mod retry;

pub use retry::{always, InvalidPolicy, Retry, RetryPolicy};
