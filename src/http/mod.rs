//! HTTP subsystem: server assembly, middleware, handlers, and error
//! mapping.

pub mod error;
pub mod handlers;
pub mod items;
pub mod middleware;
pub mod server;

pub use error::{ApiError, ErrorResponse, InvalidStatusCode};
pub use server::{AppState, HttpServer, RequestLogger};
