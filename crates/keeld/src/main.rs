//! keeld — the Keel daemon.
//!
//! Single binary that assembles the deployment tracker:
//! - In-memory deployment store
//! - Lifecycle service + log notifier
//! - Metrics aggregator + host probe
//! - REST API
//!
//! # Usage
//!
//! ```text
//! keeld serve --config /etc/keel/keel.toml --port 8000
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use keel_api::{ApiState, build_router};
use keel_cache::TtlCache;
use keel_core::Settings;
use keel_lifecycle::DeploymentService;
use keel_metrics::{HostProbe, ProcfsProbe, SystemMetrics};
use keel_state::DeploymentStore;

#[derive(Parser)]
#[command(name = "keeld", about = "Keel deployment tracker daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API until interrupted.
    Serve {
        /// TOML settings file. `KEEL_*` variables override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides settings).
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, port } => {
            let mut settings =
                Settings::load(config.as_deref()).context("failed to load settings")?;
            if let Some(port) = port {
                settings.port = port;
            }
            init_tracing(&settings);
            run_server(settings).await
        }
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if settings.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_server(settings: Settings) -> anyhow::Result<()> {
    info!(
        app = %settings.app_name,
        version = %settings.app_version,
        environment = %settings.environment,
        "keel daemon starting"
    );

    // ── Components ───────────────────────────────────────────────
    let store = DeploymentStore::new();
    let deployments = DeploymentService::new(store);
    let probe: Arc<dyn HostProbe> = Arc::new(ProcfsProbe::default());
    let cleanup_every = Duration::from_secs(settings.cache_cleanup_interval_secs.max(1));
    let bind_address = settings.bind_address();

    let state = ApiState::new(settings, deployments, probe);

    // ── Shutdown signal ──────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Cache cleanup ────────────────────────────────────────────
    let cleanup_handle = tokio::spawn(run_cache_cleanup(
        state.system_cache.clone(),
        cleanup_every,
        shutdown_rx,
    ));

    // ── REST API server ──────────────────────────────────────────
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    info!(addr = %bind_address, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to install CTRL+C handler");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    let _ = cleanup_handle.await;

    info!("keel daemon stopped");
    Ok(())
}

/// Periodically evict expired cache entries until shutdown is signalled.
async fn run_cache_cleanup(
    cache: TtlCache<String, SystemMetrics>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let removed = cache.cleanup_expired();
                if removed > 0 {
                    debug!(removed, "evicted expired cache entries");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("cache cleanup stopped");
}
