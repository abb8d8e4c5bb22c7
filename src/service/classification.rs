//! Simulated document classification service.
//!
//! The classifier backend is not wired up yet, so classification always
//! reports a domain failure. The error is non-transient and therefore
//! never retried.

use serde_json::json;

use crate::observability::logging::Logger;
use crate::resilience::{Retry, RetryPolicy};
use crate::service::error::ServiceError;

#[derive(Clone)]
pub struct ClassificationService {
    policy: RetryPolicy,
}

impl ClassificationService {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub async fn classify(&self, logger: &Logger) -> Result<String, ServiceError> {
        logger.audit("Classification requested", json!({}));

        Retry::new(self.policy.clone())
            .with_logger(logger.clone())
            .run("classification.classify", ServiceError::is_transient, || async {
                Err(ServiceError::Classification(
                    "Classification failed".to_string(),
                ))
            })
            .await
    }
}
