//! Cat photo annotation service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http (router, request id, server span)
//!                       │
//!                       ▼
//!                     pipeline ──── search API ────▶ photo search result
//!                       │      ──── photo host ────▶ decoded image
//!                       │      ──── font + draw ───▶ PNG → base64
//!                       ▼
//!     Client Response ◀─ 200 payload, or 500 naming the failed stage
//!
//!     Cross-cutting: config, observability (tracer, logs, metrics), lifecycle
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::Tracer;
