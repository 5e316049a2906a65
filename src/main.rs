// =============================================================================
// Signal Desk — Main Entry Point
// =============================================================================
//
// Quotes every configured instrument on a fixed cadence and serves indicator
// snapshots and best-signal scans over REST.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod display;
mod indicators;
mod market_data;
mod runtime_config;
mod scheduler;
mod signal_desk;
mod signals;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::runtime_config::{RuntimeConfig, DEFAULT_CONFIG_PATH};
use crate::scheduler::IntervalTicker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Signal Desk — Starting Up                         ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config_path =
        std::env::var("SIGNAL_DESK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());

    let file_config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    let mut config = file_config.clone();

    // Override symbols from env if available. Applies to this run only.
    if let Ok(syms) = std::env::var("SIGNAL_DESK_SYMBOLS") {
        config.apply_symbol_override(&syms);
    }

    config
        .validate()
        .context("invalid runtime configuration")?;

    info!(
        markets = config.symbols.len(),
        refresh_interval_secs = config.refresh_interval_secs,
        min_confidence = config.min_confidence,
        tie_policy = %config.tie_policy,
        timezone = %config.timezone,
        "Desk configured"
    );

    let refresh_interval = config.refresh_interval();

    // ── 2. Build shared state & first quote book ─────────────────────────
    let state = Arc::new(AppState::new(config).with_config_store(config_path, file_config));
    state.refresh_quotes();

    // ── 3. Refresh loop ──────────────────────────────────────────────────
    let refresh_state = state.clone();
    tokio::spawn(async move {
        refresh_state
            .run_refresh_loop(IntervalTicker::new(refresh_interval))
            .await;
    });

    // ── 4. Start the API server ──────────────────────────────────────────
    let bind_addr =
        std::env::var("SIGNAL_DESK_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    let app = api::rest::router(state.clone());
    let server_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
            server_state.push_error(format!("API server failed: {e}"));
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    info!("Signal Desk shut down complete.");
    Ok(())
}
