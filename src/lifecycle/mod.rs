//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Env/CLI overrides → Validate → Load font → Tracer → Server
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Stop accepting → Drain requests → Flush spans → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: a bad config or missing font aborts startup
//! - The font is loaded once, before the listener accepts traffic
//! - Span shipping stops after the server, so draining requests still report

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::shutdown_on_signal;
pub use startup::{bootstrap, prepare_config, Bootstrap, CliOverrides, StartupError};
