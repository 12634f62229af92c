//! Forecast server: aggregates forecast feeds and serves them from memory.
//!
//! Single-binary Tokio application that:
//! 1. Fetches the prediction feed
//! 2. Fetches weather and tide data for each day around today
//! 3. Merges each day into one cached JSON document
//! 4. Serves both from memory over HTTP
//! 5. Refreshes on a timer and on authenticated request

mod config;
mod server;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use forecast_cache::{new_cache_store, RefreshOrchestrator, RefreshSummary, Refresher};
use server::AppState;
use upstream_client::HttpUpstream;

/// Forecast aggregation server
#[derive(Parser)]
#[command(name = "forecast-server", about = "Forecast aggregation and cache server")]
struct Cli {
    /// Run one full refresh, print a summary and exit.
    #[arg(long)]
    once: bool,

    /// Skip the refresh normally started at boot.
    #[arg(long)]
    no_initial_refresh: bool,
}

fn log_summary(label: &str, summary: &RefreshSummary) {
    info!(
        "{}: prediction_updated={} complete={} degraded={} failed={:?}",
        label,
        summary.prediction_updated,
        summary.details.complete.len(),
        summary.details.degraded.len(),
        summary.details.failed,
    );
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "forecast_server=info,forecast_cache=info,upstream_client=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("Forecast server starting up...");

    // Load configuration.
    let cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!("Prediction feed: {}", cfg.prediction_url);
    info!(
        "Window: -{}d..+{}d in {}, launch interval {}ms, timeout {}s",
        cfg.refresh.days_back,
        cfg.refresh.days_ahead,
        cfg.timezone,
        cfg.refresh.launch_interval_ms,
        cfg.refresh.request_timeout_secs,
    );

    // ── Shared state ─────────────────────────────────────────────────
    let upstream = match HttpUpstream::new(&cfg) {
        Ok(u) => Arc::new(u),
        Err(e) => {
            error!("Upstream client initialization failed: {}", e);
            std::process::exit(1);
        }
    };
    let store = new_cache_store();
    let orchestrator = match RefreshOrchestrator::from_config(upstream, store.clone(), &cfg) {
        Ok(o) => o,
        Err(e) => {
            error!("Refresh setup failed: {}", e);
            std::process::exit(1);
        }
    };
    let refresher = Refresher::new(orchestrator);

    // ── One-shot mode ────────────────────────────────────────────────
    if cli.once {
        info!("Running a single refresh...");
        let summary = refresher.refresh_all().await;
        log_summary("Refresh finished", &summary);
        if !summary.prediction_updated && summary.details.cached_count() == 0 {
            std::process::exit(1);
        }
        return;
    }

    // ── Spawn tasks ──────────────────────────────────────────────────
    if cli.no_initial_refresh {
        info!("Initial refresh skipped");
    } else {
        let boot = refresher.clone();
        tokio::spawn(async move {
            let summary = boot.refresh_all().await;
            log_summary("Initial refresh finished", &summary);
        });
    }

    let period = Duration::from_secs(cfg.refresh.interval_secs);
    let scheduled_handle = if period.is_zero() {
        info!("Internal refresh timer disabled; relying on the refresh endpoint");
        None
    } else {
        Some(tokio::spawn(refresher.clone().run_scheduled(period)))
    };

    let state = AppState {
        store,
        refresher,
        refresh_secret: Arc::from(cfg.refresh_secret.as_str()),
    };
    let bind_addr = cfg.server.bind_addr.clone();
    let server_handle = tokio::spawn(async move { server::serve(&bind_addr, state).await });

    // ── Wait for shutdown ────────────────────────────────────────────
    info!("Forecast server is running. Press Ctrl+C to stop.");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        r = server_handle => {
            match r {
                Ok(Ok(())) => error!("HTTP server exited"),
                Ok(Err(e)) => error!("HTTP server failed: {}", e),
                Err(e) => error!("HTTP server task panicked: {}", e),
            }
            std::process::exit(1);
        }
    }

    if let Some(handle) = scheduled_handle {
        handle.abort();
    }

    info!("Forecast server shut down.");
}
