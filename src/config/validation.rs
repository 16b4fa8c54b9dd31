//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, font size > 0)
//! - Check that addresses and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("photo_api.search_url '{0}' is not an http(s) URL")]
    SearchUrl(String),

    #[error("photo_api.api_key_header '{0}' is not a valid header name")]
    ApiKeyHeader(String),

    #[error("annotation.{0} must be greater than zero")]
    NonPositive(&'static str),

    #[error("annotation.font_path must not be empty")]
    EmptyFontPath,

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("tracer.collector_url '{0}' is not an http(s) URL")]
    CollectorUrl(String),

    #[error("tracer.batch_size must be greater than zero")]
    ZeroBatchSize,

    #[error("tracer.queue_size ({queue}) must be at least tracer.batch_size ({batch})")]
    QueueSmallerThanBatch { queue: usize, batch: usize },

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if !is_http_url(&config.photo_api.search_url) {
        errors.push(ValidationError::SearchUrl(config.photo_api.search_url.clone()));
    }
    if axum::http::HeaderName::from_bytes(config.photo_api.api_key_header.as_bytes()).is_err() {
        errors.push(ValidationError::ApiKeyHeader(config.photo_api.api_key_header.clone()));
    }

    if config.annotation.font_path.trim().is_empty() {
        errors.push(ValidationError::EmptyFontPath);
    }
    if config.annotation.font_size <= 0.0 {
        errors.push(ValidationError::NonPositive("font_size"));
    }
    if config.annotation.dpi <= 0.0 {
        errors.push(ValidationError::NonPositive("dpi"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }
    if config.timeouts.outbound_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("outbound_secs"));
    }

    if let Some(url) = &config.tracer.collector_url {
        if !is_http_url(url) {
            errors.push(ValidationError::CollectorUrl(url.clone()));
        }
    }
    if config.tracer.batch_size == 0 {
        errors.push(ValidationError::ZeroBatchSize);
    }
    if config.tracer.queue_size < config.tracer.batch_size {
        errors.push(ValidationError::QueueSmallerThanBatch {
            queue: config.tracer.queue_size,
            batch: config.tracer.batch_size,
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(raw: &str) -> bool {
    match url::Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServiceConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.photo_api.search_url = "ftp://example.com/search".into();
        config.annotation.font_size = 0.0;
        config.timeouts.outbound_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::BindAddress("nowhere".into())));
        assert!(errors.contains(&ValidationError::NonPositive("font_size")));
        assert!(errors.contains(&ValidationError::ZeroTimeout("outbound_secs")));
    }

    #[test]
    fn test_collector_url_checked_only_when_set() {
        let mut config = ServiceConfig::default();
        config.tracer.collector_url = Some("not a url".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::CollectorUrl("not a url".into())]);
    }

    #[test]
    fn test_export_queue_must_hold_a_batch() {
        let mut config = ServiceConfig::default();
        config.tracer.batch_size = 128;
        config.tracer.queue_size = 16;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::QueueSmallerThanBatch { queue: 16, batch: 128 }]
        );
    }

    #[test]
    fn test_metrics_address_ignored_when_disabled() {
        let mut config = ServiceConfig::default();
        config.observability.metrics_address = "bogus".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
