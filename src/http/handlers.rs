//! Route handlers for the intake endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use crate::http::error::ApiError;
use crate::http::server::{AppState, RequestLogger};
use crate::observability::correlation;

pub async fn root(RequestLogger(logger): RequestLogger) -> Json<Value> {
    logger.info("Serving welcome message", json!({}));
    Json(json!({ "message": "Hello World" }))
}

/// Liveness probe. Exempt from correlation handling, so no request-bound
/// logging happens here.
pub async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Stub token endpoint, also exempt from correlation handling.
pub async fn token() -> Json<Value> {
    Json(json!({ "token": "sample-token" }))
}

/// Mint a new unit of work. The middleware has already seeded the scope;
/// the handler reports the id it observes.
pub async fn create_request(RequestLogger(logger): RequestLogger) -> Json<Value> {
    let request_id = correlation::current()
        .map(|id| id.to_string())
        .unwrap_or_default();
    logger.info("Request created", json!({}));
    Json(json!({ "request_id": request_id, "status": "created" }))
}

/// Resume a unit of work under a caller-supplied id.
pub async fn resume_request(
    RequestLogger(logger): RequestLogger,
    Path(request_id): Path<String>,
) -> Json<Value> {
    logger.info("Request resumed", json!({}));
    Json(json!({ "request_id": request_id, "status": "resumed" }))
}

pub async fn run_ocr(
    RequestLogger(logger): RequestLogger,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    state.ocr.perform_ocr(&logger).await?;
    Ok(Json(json!({ "status": "success", "message": "OCR completed" })))
}

pub async fn classify(
    RequestLogger(logger): RequestLogger,
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    logger.info("Classification started", json!({ "request_id": request_id }));
    let label = state.classifier.classify(&logger).await?;
    Ok(Json(json!({ "request_id": request_id, "label": label })))
}
