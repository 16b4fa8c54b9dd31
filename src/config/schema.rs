//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the cat annotation service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream photo search API.
    pub photo_api: PhotoApiConfig,

    /// Text rendering settings.
    pub annotation: AnnotationConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request tracer settings.
    pub tracer: TracerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3001").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3001".to_string(),
        }
    }
}

/// Photo search API configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PhotoApiConfig {
    /// Search endpoint returning a JSON array of photo records.
    pub search_url: String,

    /// API key sent on every outbound call. Empty means no key header.
    pub api_key: String,

    /// Header carrying the API key.
    pub api_key_header: String,
}

impl Default for PhotoApiConfig {
    fn default() -> Self {
        Self {
            search_url: "https://api.thecatapi.com/v1/images/search?mime_types=png".to_string(),
            api_key: String::new(),
            api_key_header: "x-api-key".to_string(),
        }
    }
}

impl std::fmt::Debug for PhotoApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoApiConfig")
            .field("search_url", &self.search_url)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("api_key_header", &self.api_key_header)
            .finish()
    }
}

/// Text rendering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Path to the TrueType/OpenType font, read once at startup.
    pub font_path: String,

    /// Font size in points.
    pub font_size: f32,

    /// Rendering resolution. Pixel size is `font_size * dpi / 72`.
    pub dpi: f32,

    /// Text used when the request carries no annotation.
    pub fallback_text: String,

    /// Horizontal offset of the text origin in pixels.
    pub anchor_x: i32,

    /// Distance from the top edge to the top of the ascent, in pixels.
    pub anchor_top: i32,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            font_path: "assets/DejaVuSansMono.ttf".to_string(),
            font_size: 48.0,
            dpi: 72.0,
            fallback_text: "hello world".to_string(),
            anchor_x: 10,
            anchor_top: 10,
        }
    }
}

impl AnnotationConfig {
    /// Font size converted to pixels at the configured DPI.
    pub fn pixel_size(&self) -> f32 {
        self.font_size * self.dpi / 72.0
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for a whole inbound request.
    pub request_secs: u64,

    /// Deadline for each outbound call to the photo API or image host.
    pub outbound_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            outbound_secs: 10,
        }
    }
}

/// Request tracer configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TracerConfig {
    /// Create a span for every pipeline step, not only request and HTTP spans.
    pub verbose: bool,

    /// OTLP/HTTP traces endpoint (e.g. `http://localhost:4318/v1/traces`).
    /// Spans stay local when unset.
    pub collector_url: Option<String>,

    /// Bearer token presented to the collector.
    pub access_token: String,

    /// Spans per export request.
    pub batch_size: usize,

    /// Finished spans buffered for export; further spans are dropped while full.
    pub queue_size: usize,

    /// Maximum time a finished span waits before being flushed.
    pub flush_interval_ms: u64,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            collector_url: None,
            access_token: "dev".to_string(),
            batch_size: 64,
            queue_size: 2048,
            flush_interval_ms: 1000,
        }
    }
}

impl std::fmt::Debug for TracerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracerConfig")
            .field("verbose", &self.verbose)
            .field("collector_url", &self.collector_url)
            .field("access_token", &"<redacted>")
            .field("batch_size", &self.batch_size)
            .field("queue_size", &self.queue_size)
            .field("flush_interval_ms", &self.flush_interval_ms)
            .finish()
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Emit logs as JSON lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Metrics endpoint address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
