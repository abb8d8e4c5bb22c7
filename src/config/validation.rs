//! Semantic configuration validation.
//!
//! Structural problems are caught by serde at parse time; this pass checks
//! what the types cannot express and reports every violation at once.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::AppConfig;
use crate::observability::logging::Level;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("listener.bind_address is not a socket address: {0}")]
    InvalidBindAddress(String),

    #[error("logging.level is not a recognized level: {0}")]
    UnknownLogLevel(String),

    #[error("retry.max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("retry.backoff_multiplier must be at least 1, got {0}")]
    MultiplierTooSmall(f64),

    #[error("logging.shipping.endpoint is required when shipping is enabled")]
    ShippingEndpointMissing,

    #[error("logging.shipping.endpoint is not a valid URL: {0}")]
    ShippingEndpointInvalid(String),
}

/// Check the whole configuration, collecting every violation.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.logging.level.parse::<Level>().is_err() {
        errors.push(ValidationError::UnknownLogLevel(
            config.logging.level.clone(),
        ));
    }

    if config.retry.max_attempts == 0 {
        errors.push(ValidationError::ZeroAttempts);
    }
    if config.retry.backoff_multiplier < 1.0 {
        errors.push(ValidationError::MultiplierTooSmall(
            config.retry.backoff_multiplier,
        ));
    }

    let shipping = &config.logging.shipping;
    if shipping.enabled {
        if shipping.endpoint.is_empty() {
            errors.push(ValidationError::ShippingEndpointMissing);
        } else if Url::parse(&shipping.endpoint).is_err() {
            errors.push(ValidationError::ShippingEndpointInvalid(
                shipping.endpoint.clone(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn all_violations_are_collected() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "not-an-address".to_string();
        config.logging.level = "verbose".to_string();
        config.retry.max_attempts = 0;
        config.retry.backoff_multiplier = 0.5;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroAttempts));
        assert!(errors.contains(&ValidationError::MultiplierTooSmall(0.5)));
    }

    #[test]
    fn enabled_shipping_requires_a_valid_endpoint() {
        let mut config = AppConfig::default();
        config.logging.shipping.enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::ShippingEndpointMissing])
        );

        config.logging.shipping.endpoint = "not a url".to_string();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::ShippingEndpointInvalid(
                "not a url".to_string()
            )])
        );

        config.logging.shipping.endpoint = "https://intake.example.com/v1/logs".to_string();
        assert_eq!(validate_config(&config), Ok(()));
    }
}
