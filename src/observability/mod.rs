//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → propagation.rs (traceparent → remote parent)
//!     → tracer.rs (server span, step spans, HTTP client spans)
//!     → exporter.rs (finished spans → OTLP batch export, or debug log only)
//!
//! All subsystems also produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//! ```
//!
//! # Design Decisions
//! - The tracer is an explicit value handed to each component
//! - Step spans only exist in verbose mode; request and HTTP spans always do
//! - Metrics are cheap and recorded unconditionally

pub mod exporter;
pub mod logging;
pub mod metrics;
pub mod propagation;
pub mod tracer;

#[cfg(test)]
pub(crate) mod testing;

pub use exporter::{build_provider, ExporterError};
pub use opentelemetry::trace::SpanKind;
pub use tracer::{TagValue, TraceContext, TraceSpan, Tracer};
