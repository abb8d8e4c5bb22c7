//! HTTP error mapping.
//!
//! # Responsibilities
//! - Map domain and validation failures onto HTTP responses
//! - Validate status codes at construction, not at serialization
//! - Hand the boundary middleware what it needs to log each failure once
//!
//! # Design Decisions
//! - Domain errors carry their own declared status; anything unclassified
//!   collapses to a generic 500
//! - Handlers never log failures themselves; the error's context travels
//!   to the middleware via response extensions

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::service::ServiceError;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid HTTP status code: {0}. Code must be between 100 and 599")]
pub struct InvalidStatusCode(pub i64);

/// The wire shape of every error body: `{"code": int, "message": string}`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl ErrorResponse {
    /// Construct a response, rejecting codes outside the valid HTTP range.
    pub fn new(code: i64, message: impl Into<String>) -> Result<Self, InvalidStatusCode> {
        if !(100..=599).contains(&code) {
            return Err(InvalidStatusCode(code));
        }
        Ok(Self {
            code: code as u16,
            message: message.into(),
        })
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Boundary-logging context, attached to error responses for the request
/// middleware to consume.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub status_code: u16,
    pub message: String,
    pub kind: &'static str,
}

/// Failures a handler can surface.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Domain {
        message: String,
        status_code: u16,
        kind: &'static str,
    },

    #[error("Bad request: {0}")]
    Validation(String),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn domain(message: impl Into<String>, status_code: u16, kind: &'static str) -> Self {
        ApiError::Domain {
            message: message.into(),
            status_code,
            kind,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::domain(message, 404, "NotFound")
    }

    fn status_code(&self) -> u16 {
        match self {
            ApiError::Domain { status_code, .. } => *status_code,
            ApiError::Validation(_) => 400,
            ApiError::Internal(_) => 500,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Domain { kind, .. } => kind,
            ApiError::Validation(_) => "ValidationError",
            ApiError::Internal(_) => "InternalError",
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Domain { message, .. } => message.clone(),
            ApiError::Validation(detail) => detail.clone(),
            ApiError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        ApiError::domain(error.to_string(), error.status_code(), error.kind())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let message = self.public_message();
        let body = match ErrorResponse::new(i64::from(status_code), message.clone()) {
            Ok(body) => body,
            // Unreachable for the statuses this enum declares.
            Err(_) => ErrorResponse {
                code: 500,
                message: "Internal server error".to_string(),
            },
        };

        let context = ErrorContext {
            status_code: body.code,
            message,
            kind: self.kind(),
        };
        let mut response = body.into_response();
        response.extensions_mut().insert(context);
        response
    }
}
