//! Simulated OCR extraction service.
//!
//! The vision backend is stubbed: it fails a configurable number of times
//! per call with a transient error, then succeeds. That exercises the
//! retry path end-to-end without a real dependency.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde_json::json;

use crate::observability::logging::Logger;
use crate::resilience::{Retry, RetryPolicy};
use crate::service::error::ServiceError;

#[derive(Clone)]
pub struct OcrService {
    policy: RetryPolicy,
    transient_failures: u32,
}

impl OcrService {
    pub fn new(policy: RetryPolicy, transient_failures: u32) -> Self {
        Self {
            policy,
            transient_failures,
        }
    }

    /// Extract text from the (simulated) document.
    pub async fn perform_ocr(&self, logger: &Logger) -> Result<String, ServiceError> {
        logger.audit("OCR requested", json!({}));

        let failures_left = Arc::new(AtomicU32::new(self.transient_failures));
        let result = Retry::new(self.policy.clone())
            .with_logger(logger.clone())
            .run("ocr.extract", ServiceError::is_transient, move || {
                let failures_left = failures_left.clone();
                async move {
                    if failures_left
                        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                        .is_ok()
                    {
                        Err(ServiceError::Unavailable(
                            "vision backend briefly unreachable".to_string(),
                        ))
                    } else {
                        Ok("sample_result".to_string())
                    }
                }
            })
            .await?;

        logger.info("OCR completed", json!({ "result": result }));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::observability::logging::{CaptureSink, Level, Logging};

    fn capture_logger() -> (Logger, CaptureSink) {
        let sink = CaptureSink::new();
        let logging = Logging::builder()
            .level(Level::Debug)
            .sink(Arc::new(sink.clone()))
            .build();
        (logging.logger("service.ocr"), sink)
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::ZERO,
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn recovers_after_one_transient_failure() {
        let (logger, sink) = capture_logger();
        let service = OcrService::new(fast_policy(), 1);

        let result = service.perform_ocr(&logger).await;
        assert_eq!(result.as_deref(), Ok("sample_result"));

        let records = sink.records();
        let warnings = records
            .iter()
            .filter(|r| r["level"] == serde_json::json!("warning"))
            .count();
        assert_eq!(warnings, 1);
        assert!(records
            .iter()
            .any(|r| r["message"] == serde_json::json!("OCR completed")));
    }

    #[tokio::test]
    async fn exhaustion_surfaces_the_transient_error() {
        let (logger, _sink) = capture_logger();
        let service = OcrService::new(fast_policy(), 10);

        let result = service.perform_ocr(&logger).await;
        assert_eq!(
            result,
            Err(ServiceError::Unavailable(
                "vision backend briefly unreachable".to_string()
            ))
        );
    }
}
