//! Configuration subsystem: schema, loader, and semantic validation.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppConfig, ListenerConfig, LoggingConfig, RetryConfig, ServicesConfig, ShippingConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
