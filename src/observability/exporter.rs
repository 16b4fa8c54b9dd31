//! Span export.
//!
//! # Responsibilities
//! - Build the tracer provider the `Tracer` wraps
//! - Ship finished spans to an OTLP/HTTP collector in bounded batches
//! - Stay local (spans only reach the debug log) when no collector is configured
//!
//! # Design Decisions
//! - The batch processor runs on its own thread; a full queue drops spans rather
//!   than blocking request handling
//! - The provider is owned by the `Tracer`, never installed globally

use std::collections::HashMap;
use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry_otlp::{SpanExporter, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::trace::{BatchConfigBuilder, BatchSpanProcessor, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use thiserror::Error;

use crate::config::TracerConfig;

/// Upper bound on a single export request.
const EXPORT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
#[error("failed to build span exporter for '{endpoint}': {reason}")]
pub struct ExporterError {
    endpoint: String,
    reason: String,
}

fn resource() -> Resource {
    Resource::builder()
        .with_attribute(KeyValue::new("service.name", env!("CARGO_PKG_NAME")))
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Build the provider spans are exported through.
///
/// With `collector_url` set, spans are sent as OTLP protobuf over HTTP with the
/// access token as a bearer credential.
pub fn build_provider(config: &TracerConfig) -> Result<SdkTracerProvider, ExporterError> {
    let builder = SdkTracerProvider::builder().with_resource(resource());

    let Some(endpoint) = &config.collector_url else {
        tracing::info!("No span collector configured, finished spans are only logged");
        return Ok(builder.build());
    };

    let headers = HashMap::from([(
        "authorization".to_string(),
        format!("Bearer {}", config.access_token),
    )]);
    let exporter = SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint.clone())
        .with_headers(headers)
        .with_timeout(EXPORT_TIMEOUT)
        .build()
        .map_err(|e| ExporterError {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;

    let batch = BatchConfigBuilder::default()
        .with_max_queue_size(config.queue_size)
        .with_max_export_batch_size(config.batch_size)
        .with_scheduled_delay(Duration::from_millis(config.flush_interval_ms.max(1)))
        .build();
    let processor = BatchSpanProcessor::builder(exporter)
        .with_batch_config(batch)
        .build();

    tracing::info!(
        endpoint = %endpoint,
        batch_size = config.batch_size,
        queue_size = config.queue_size,
        "Exporting spans over OTLP"
    );
    Ok(builder.with_span_processor(processor).build())
}
