//! Document intake API.
//!
//! The interesting parts live in two subsystems: `observability` holds
//! correlation-id propagation and the structured logger, `resilience`
//! holds the retry-with-backoff utility. The HTTP surface under `http`
//! and the stubbed services under `service` exist to exercise them
//! end-to-end.

pub mod config;
pub mod http;
pub mod observability;
pub mod resilience;
pub mod service;

pub use config::AppConfig;
pub use http::HttpServer;
