//! HTTP middleware.

pub mod request_span;

pub use request_span::request_span;
