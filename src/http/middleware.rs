//! Request-scoped logging middleware.
//!
//! # Responsibilities
//! - Derive or mint the correlation id for each inbound request
//! - Run the rest of the stack inside the correlation scope
//! - Emit the receipt/completion audit pair with timing
//! - Perform the single boundary error log for failed requests
//!
//! # Design Decisions
//! - Handlers never log failures themselves; the error context arrives
//!   here through response extensions
//! - Probe and token endpoints are exempt from correlation handling and
//!   audit records entirely

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::HeaderName;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::http::error::{ApiError, ErrorContext};
use crate::http::server::AppState;
use crate::observability::correlation::{self, CorrelationId};

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Paths outside correlation handling and audit logging.
const EXEMPT_PATHS: [&str; 2] = ["/healthcheck", "/token"];

pub async fn request_logging(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if EXEMPT_PATHS.contains(&path.as_str()) {
        return next.run(request).await;
    }

    let correlation_id = derive_correlation_id(&request, &path);
    let logger = state
        .logging
        .logger("http.middleware")
        .bind_correlation_id(&correlation_id);

    let client_ip = client_ip(&request);
    let forwarded_for = header_value(&request, "x-forwarded-for");
    logger.audit(
        "HTTP request received",
        json!({
            "path": path,
            "httpmethod": request.method().as_str(),
            "client": client_ip,
            "client_ip_address": client_ip,
            "x_forwarded_for": forwarded_for,
        }),
    );

    let started = Instant::now();
    let response = correlation::scope(correlation_id.clone(), next.run(request)).await;
    let elapsed_ms = (started.elapsed().as_secs_f64() * 100_000.0).round() / 100.0;

    let mut response = map_unhandled(response);

    if let Some(context) = response.extensions().get::<ErrorContext>().cloned() {
        logger.error(
            "Request failed",
            json!({
                "error": context.message,
                "status_code": context.status_code,
                "exception_type": context.kind,
            }),
        );
    }

    logger.audit(
        "HTTP request completed",
        json!({
            "path": path,
            "status_code": response.status().as_u16(),
            "process_time_ms": elapsed_ms,
        }),
    );

    if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Catch-all for error responses produced below the handler layer
/// (timeouts, unknown routes, anything that panicked past `ApiError`).
/// Their bodies are rebuilt into the structured `{"code","message"}`
/// shape with an [`ErrorContext`] so the boundary log still fires.
fn map_unhandled(response: Response) -> Response {
    let status = response.status();
    if response.extensions().get::<ErrorContext>().is_some()
        || !(status.is_client_error() || status.is_server_error())
    {
        return response;
    }
    if status.is_server_error() {
        return ApiError::Internal(status.to_string()).into_response();
    }
    ApiError::domain(
        status.canonical_reason().unwrap_or("Request failed"),
        status.as_u16(),
        "HttpError",
    )
    .into_response()
}

/// Inbound header first, then an id carried in a resume path, then a
/// freshly minted one.
fn derive_correlation_id(request: &Request, path: &str) -> CorrelationId {
    if let Some(id) = header_value(request, "x-request-id") {
        return CorrelationId::from_string(id);
    }
    if let Some(rest) = path.strip_prefix("/request/") {
        let id = rest.split('/').next().unwrap_or_default();
        if !id.is_empty() {
            return CorrelationId::from_string(id);
        }
    }
    CorrelationId::generate()
}

fn header_value(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Leftmost forwarded address when present, else the peer address.
fn client_ip(request: &Request) -> String {
    if let Some(forwarded) = header_value(request, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn bare_server_errors_become_structured_500s() {
        let raw = Response::builder()
            .status(StatusCode::SERVICE_UNAVAILABLE)
            .body(axum::body::Body::empty())
            .unwrap();

        let mapped = map_unhandled(raw);
        assert_eq!(mapped.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let context = mapped.extensions().get::<ErrorContext>().unwrap().clone();
        assert_eq!(context.status_code, 500);
        assert_eq!(context.kind, "InternalError");

        let body = body_json(mapped).await;
        assert_eq!(
            body,
            serde_json::json!({ "code": 500, "message": "Internal server error" })
        );
    }

    #[tokio::test]
    async fn bare_client_errors_keep_their_status() {
        let raw = Response::builder()
            .status(StatusCode::REQUEST_TIMEOUT)
            .body(axum::body::Body::empty())
            .unwrap();

        let mapped = map_unhandled(raw);
        assert_eq!(mapped.status(), StatusCode::REQUEST_TIMEOUT);

        let body = body_json(mapped).await;
        assert_eq!(
            body,
            serde_json::json!({ "code": 408, "message": "Request Timeout" })
        );
    }

    #[tokio::test]
    async fn handled_responses_pass_through_untouched() {
        let handled = ApiError::not_found("Item not found").into_response();
        let mapped = map_unhandled(handled);
        assert_eq!(mapped.status(), StatusCode::NOT_FOUND);
        let context = mapped.extensions().get::<ErrorContext>().unwrap();
        assert_eq!(context.kind, "NotFound");

        let ok = Response::builder()
            .status(StatusCode::OK)
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(map_unhandled(ok).status(), StatusCode::OK);
    }
}
