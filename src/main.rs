use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use statsd_exporter::config::{self, Settings};
use statsd_exporter::metrics::Registry;
use statsd_exporter::statsd;

mod load_generator;
mod server;

const DEFAULT_CONFIG: &str = "statsd-exporter.yaml";

/// Shared state for the JSON snapshot endpoint.
pub struct AppState {
    pub registry: Arc<Registry>,
}

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "statsd-exporter failed");
        std::process::exit(1);
    }
}

async fn run() -> statsd_exporter::Result<()> {
    // ── 1. Config ────────────────────────────────────────────────
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.into());
    let settings = if Path::new(&path).exists() {
        config::load_from_file(&path)?
    } else {
        tracing::warn!(%path, "config file not found; using defaults");
        Settings::default()
    };

    // ── 2. Registry + demo producers ─────────────────────────────
    let registry = Arc::new(Registry::new());
    let demo = Arc::new(load_generator::DemoMetrics::register(&registry)?);

    // ── 3. Exporter (fails fast if the collector is unreachable) ─
    let (exporter, cancel) = statsd::spawn(settings.exporter.clone(), registry.clone()).await?;
    let workers = load_generator::run(demo, settings.demo.workers, cancel.clone());

    // ── 4. JSON endpoint ─────────────────────────────────────────
    let app = server::create_router(Arc::new(AppState {
        registry: registry.clone(),
    }));
    let listener = tokio::net::TcpListener::bind(&settings.demo.listen).await?;
    tracing::info!(listen = %settings.demo.listen, "metrics JSON at /api/metrics");

    let shutdown = cancel.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
    });

    // ── 5. Run until Ctrl-C ──────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    cancel.cancel();

    for w in workers {
        let _ = w.await;
    }
    let _ = exporter.await;
    match server.await {
        Ok(res) => res?,
        Err(e) => tracing::warn!(error = %e, "server task panicked"),
    }
    Ok(())
}
