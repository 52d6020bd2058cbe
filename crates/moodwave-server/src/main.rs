//! Moodwave Server
//!
//! Scores headset recordings with a pre-trained classifier ensemble and
//! keeps a per-user history of the results.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use moodwave_server::{create_router, AppState, Overrides, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "moodwave-server")]
#[command(about = "Moodwave EEG valence scoring service", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MOODWAVE_CONFIG", default_value = "moodwave.yaml")]
    config: PathBuf,

    /// Ensemble configuration file (overrides the config file)
    #[arg(short, long, env = "MOODWAVE_ENSEMBLE")]
    ensemble: Option<PathBuf>,

    /// Session store directory (overrides the config file)
    #[arg(short = 'd', long, env = "MOODWAVE_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// Listen address
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    info!("Starting Moodwave Server");

    let overrides = Overrides {
        listen: cli.listen.clone(),
        port: cli.port,
        ensemble_config: cli.ensemble.clone(),
        store_dir: cli.store_dir.clone(),
    };
    let config = ServerConfig::load(&cli.config, &overrides)?;
    info!("Configuration loaded successfully");
    info!("Ensemble: {}", config.ensemble_config.display());
    info!("Store: {}", config.store.dir.display());

    let metrics_handle = init_metrics()?;

    // Model loading is blocking file IO; do it before serving
    let addr: SocketAddr = config.bind_address().parse()?;
    let state = tokio::task::spawn_blocking(move || AppState::new(config, metrics_handle)).await??;
    info!("Application state initialized successfully");

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("moodwave=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("moodwave=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "moodwave_inferences_total",
        "Total number of successful inference cycles"
    );
    metrics::describe_counter!(
        "moodwave_inference_errors_total",
        "Total number of failed inference cycles by error kind"
    );
    metrics::describe_counter!(
        "moodwave_undefined_confidence_total",
        "Analysis windows whose confidence was undefined"
    );
    metrics::describe_histogram!(
        "moodwave_inference_latency_us",
        metrics::Unit::Microseconds,
        "Inference latency in microseconds"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
