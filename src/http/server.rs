//! HTTP server assembly: shared state, router construction, and the
//! accept loop with graceful shutdown.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{FromRequestParts, MatchedPath};
use axum::http::request::Parts;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::http::handlers;
use crate::http::items;
use crate::http::middleware::request_logging;
use crate::observability::correlation;
use crate::observability::logging::{Logger, Logging};
use crate::resilience::RetryPolicy;
use crate::service::{ClassificationService, ItemStore, OcrService};

#[derive(Clone)]
pub struct AppState {
    pub logging: Logging,
    pub store: ItemStore,
    pub ocr: OcrService,
    pub classifier: ClassificationService,
}

/// Extractor handing each handler a logger named after its matched route
/// and bound to the ambient correlation id.
pub struct RequestLogger(pub Logger);

impl FromRequestParts<AppState> for RequestLogger {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let name = parts
            .extensions
            .get::<MatchedPath>()
            .map(|matched| matched.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        let logger = state.logging.logger(&name);
        let logger = match correlation::current() {
            Some(id) => logger.bind_correlation_id(&id),
            None => logger,
        };
        Ok(RequestLogger(logger))
    }
}

pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    pub fn new(config: AppConfig, logging: Logging) -> Self {
        let policy = match config.retry.policy() {
            Ok(policy) => policy,
            Err(err) => {
                tracing::warn!(error = %err, "invalid retry settings, using defaults");
                RetryPolicy::default()
            }
        };

        let state = AppState {
            logging,
            store: ItemStore::new(),
            ocr: OcrService::new(policy.clone(), config.services.ocr_transient_failures),
            classifier: ClassificationService::new(policy),
        };

        let router = build_router(state, &config);
        Self { router, config }
    }

    /// The assembled router, for driving requests in tests without a
    /// listening socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn run(self, listener: TcpListener) -> std::io::Result<()> {
        tracing::info!(bind = %self.config.listener.bind_address, "server listening");
        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
    }
}

fn build_router(state: AppState, config: &AppConfig) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthcheck", get(handlers::healthcheck))
        .route("/token", get(handlers::token))
        .route("/request", get(handlers::create_request))
        .route("/request/{request_id}", get(handlers::resume_request))
        .route("/ocr", get(handlers::run_ocr))
        .route("/classify/{request_id}", get(handlers::classify))
        .merge(items::router())
        // The timeout sits inside the logging middleware so a timed-out
        // request still gets its completion audit record and a structured
        // body.
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.timeouts.request_secs,
        )))
        .layer(from_fn_with_state(state.clone(), request_logging))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install shutdown handler");
    }
    tracing::info!("shutdown signal received");
}
