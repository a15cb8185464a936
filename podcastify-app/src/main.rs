//! Podcastify HTTP server entry point.
//!
//! Settings come from `settings.json` (see [`settings::default_settings_path`])
//! with environment overrides on top. The first run writes the defaults so
//! the file is easy to find and edit.

mod http;
mod settings;
mod state;

use anyhow::Context;
use settings::{default_settings_path, load_settings, save_settings};
use state::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "podcastify=info,podcastify_core=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let settings_path = default_settings_path();
    let mut settings = load_settings(&settings_path);
    if !settings_path.exists() {
        match save_settings(&settings_path, &settings) {
            Ok(()) => info!(path = %settings_path.display(), "wrote default settings"),
            Err(e) => warn!(path = %settings_path.display(), error = %e, "could not write default settings"),
        }
    }
    // Applied after the save so env-provided keys never reach disk.
    settings.apply_env_overrides();

    let addr = settings.listen_addr();
    let state = AppState::new(settings, settings_path).shared();
    info!(
        settings = %state.settings_path.display(),
        basic_format = ?state.settings.basic_format,
        elevenlabs_key = state.settings.elevenlabs_api_key.is_some(),
        openai_key = state.settings.openai_api_key.is_some(),
        "podcastify starting"
    );

    let router = http::create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("podcastify stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
