//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides: TRACE_LEVEL, CAT_API_KEY)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → handed by value to each subsystem at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env_overrides, read_config, ConfigError};
pub use schema::{
    AnnotationConfig, ListenerConfig, ObservabilityConfig, PhotoApiConfig, ServiceConfig,
    TimeoutConfig, TracerConfig,
};
pub use validation::{validate_config, ValidationError};
