//! Retry with exponential backoff for blocking and suspending operations.
//!
//! # Responsibilities
//! - Run an operation up to `max_attempts` times under one backoff schedule
//! - Consult a caller-supplied predicate before retrying an error
//! - Log each retry as a warning and final exhaustion as an error
//!
//! # Design Decisions
//! - Two explicit entry points, [`Retry::run`] and [`Retry::run_blocking`],
//!   share the same attempt accounting; neither adapts to the other
//! - The last error is propagated verbatim, never wrapped
//! - The async wait is `tokio::time::sleep`, so dropping the returned
//!   future while waiting cancels the remaining attempts

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde_json::json;
use thiserror::Error;

use crate::observability::logging::{Logger, Logging};
use crate::resilience::backoff::delay_for_attempt;

/// Immutable retry parameters, constructed once and applied to every
/// invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum InvalidPolicy {
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("backoff_multiplier must be at least 1, got {0}")]
    MultiplierTooSmall(f64),
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        backoff_multiplier: f64,
    ) -> Result<Self, InvalidPolicy> {
        if max_attempts == 0 {
            return Err(InvalidPolicy::ZeroAttempts);
        }
        if backoff_multiplier < 1.0 || backoff_multiplier.is_nan() {
            return Err(InvalidPolicy::MultiplierTooSmall(backoff_multiplier));
        }
        Ok(Self {
            max_attempts,
            initial_delay,
            backoff_multiplier,
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }
}

/// Predicate accepting every error as retryable.
pub fn always<E>(_: &E) -> bool {
    true
}

/// Executor applying a [`RetryPolicy`] to an operation.
pub struct Retry {
    policy: RetryPolicy,
    logger: Option<Logger>,
}

impl Retry {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            logger: None,
        }
    }

    /// Route retry/exhaustion records through `logger` instead of the
    /// default stdout logger.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    fn logger(&self) -> Logger {
        match &self.logger {
            Some(logger) => logger.clone(),
            None => Logging::stdout().logger("resilience.retry"),
        }
    }

    /// Wait before the next attempt, or `None` when the error must
    /// propagate now. Logs the retry warning or the exhaustion error.
    fn next_delay<E: Display>(
        &self,
        operation: &str,
        attempt: u32,
        error: &E,
        is_retryable: bool,
    ) -> Option<Duration> {
        if !is_retryable {
            return None;
        }
        if attempt >= self.policy.max_attempts {
            self.logger().error(
                "Retries exhausted",
                json!({
                    "operation": operation,
                    "attempts": attempt,
                    "error": error.to_string(),
                }),
            );
            return None;
        }
        let wait = delay_for_attempt(&self.policy, attempt);
        self.logger().warning(
            "Retrying after failure",
            json!({
                "operation": operation,
                "attempt": attempt,
                "max_attempts": self.policy.max_attempts,
                "error": error.to_string(),
                "wait_ms": wait.as_millis() as u64,
            }),
        );
        Some(wait)
    }

    /// Run a suspending operation under the policy.
    pub async fn run<T, E, P, F, Fut>(
        &self,
        operation: &str,
        retryable: P,
        mut op: F,
    ) -> Result<T, E>
    where
        E: Display,
        P: Fn(&E) -> bool,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    match self.next_delay(operation, attempt, &error, retryable(&error)) {
                        Some(wait) => tokio::time::sleep(wait).await,
                        None => return Err(error),
                    }
                }
            }
        }
    }

    /// Run a blocking operation under the policy.
    pub fn run_blocking<T, E, P, F>(
        &self,
        operation: &str,
        retryable: P,
        mut op: F,
    ) -> Result<T, E>
    where
        E: Display,
        P: Fn(&E) -> bool,
        F: FnMut() -> Result<T, E>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(error) => {
                    match self.next_delay(operation, attempt, &error, retryable(&error)) {
                        Some(wait) => std::thread::sleep(wait),
                        None => return Err(error),
                    }
                }
            }
        }
    }
}
