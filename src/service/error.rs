//! Domain error taxonomy for the intake services.

use thiserror::Error;

/// Errors raised by the domain services, each carrying a declared HTTP
/// status for the boundary layer to read.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// A dependency is briefly unreachable. Transient, worth retrying.
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Ocr(String),

    #[error("{0}")]
    Classification(String),

    #[error("{0}")]
    Store(String),
}

impl ServiceError {
    /// The HTTP status this error declares for itself.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Unavailable(_) => 503,
            ServiceError::Ocr(_) | ServiceError::Classification(_) | ServiceError::Store(_) => 422,
        }
    }

    /// Whether a retry has any chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Unavailable(_))
    }

    /// Stable error-kind label for boundary logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Unavailable(_) => "UpstreamUnavailable",
            ServiceError::Ocr(_) => "OcrError",
            ServiceError::Classification(_) => "ClassificationError",
            ServiceError::Store(_) => "StoreError",
        }
    }
}
