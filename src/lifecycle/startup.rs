//! Startup orchestration.
//!
//! # Responsibilities
//! - Load configuration and layer environment and CLI overrides on top
//! - Validate the result before anything else is built
//! - Load the font and construct the tracer and HTTP server
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Overrides are applied before validation so they are checked too

use std::path::Path;

use thiserror::Error;

use crate::config::{apply_env_overrides, read_config, validate_config, ConfigError, ServiceConfig};
use crate::http::HttpServer;
use crate::observability::{build_provider, ExporterError, Tracer};
use crate::pipeline::{FontAsset, FontError, PipelineError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to load font: {0}")]
    Font(#[from] FontError),

    #[error("failed to build photo API client: {0}")]
    Client(#[from] PipelineError),

    #[error(transparent)]
    Exporter(#[from] ExporterError),
}

/// Values given on the command line; they win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind_address: Option<String>,
    pub verbose: bool,
}

/// Everything `main` needs to serve.
pub struct Bootstrap {
    pub server: HttpServer,
    /// Shut down after the server stops so queued spans are flushed.
    pub tracer: Tracer,
}

/// Build the effective configuration.
///
/// `path` is optional; without it the defaults are used.
pub fn prepare_config<F>(
    path: Option<&Path>,
    cli: &CliOverrides,
    env: F,
) -> Result<ServiceConfig, StartupError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, env);
    if let Some(bind) = &cli.bind_address {
        config.listener.bind_address = bind.clone();
    }
    if cli.verbose {
        config.tracer.verbose = true;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Construct the tracer and server from a validated config.
pub fn bootstrap(config: ServiceConfig) -> Result<Bootstrap, StartupError> {
    let font = FontAsset::load(&config.annotation.font_path)?;
    tracing::info!(path = %font.path().display(), "Font loaded");

    let provider = build_provider(&config.tracer)?;
    let tracer = Tracer::new(config.tracer.verbose, provider);

    if config.photo_api.api_key.is_empty() {
        tracing::warn!("No photo API key configured, searches will be anonymous");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        verbose = tracer.is_verbose(),
        request_timeout_secs = config.timeouts.request_secs,
        outbound_timeout_secs = config.timeouts.outbound_secs,
        "Configuration loaded"
    );

    let server = HttpServer::new(config, font, tracer.clone())?;
    Ok(Bootstrap { server, tracer })
}
