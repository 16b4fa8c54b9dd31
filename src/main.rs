use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use cat_annotator::lifecycle::{bootstrap, prepare_config, shutdown_on_signal, CliOverrides, Shutdown};
use cat_annotator::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "cat-annotator")]
#[command(about = "Serves random cat photos with a caption drawn on them", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the config file
    #[arg(short, long)]
    bind: Option<String>,

    /// Record a span for every pipeline step (same as TRACE_LEVEL=local)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        bind_address: cli.bind,
        verbose: cli.verbose,
    };
    let config = prepare_config(cli.config.as_deref(), &overrides, |key| std::env::var(key).ok())?;

    logging::init_logging(config.observability.json_logs);
    tracing::info!("cat-annotator v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let boot = bootstrap(config)?;
    let server_shutdown = shutdown.subscribe();

    let signals = shutdown.clone();
    tokio::spawn(async move { shutdown_on_signal(&signals).await });

    boot.server.run(listener, server_shutdown).await?;

    let tracer = boot.tracer;
    if let Err(e) = tokio::task::spawn_blocking(move || tracer.shutdown()).await {
        tracing::warn!(error = %e, "Span exporter shutdown task failed");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
