//! Recital bot - recitation practice over chat
//!
//! A long-polling chat bot that walks users through selecting a verse (or
//! auto-detect mode), relays voice samples to an external analysis service,
//! and renders the analysis results.

mod config;
mod dispatcher;
mod engine;
mod gateway;
mod i18n;
mod store;
mod text;
mod transport;

use config::Config;
use dispatcher::Dispatcher;
use engine::Engine;
use gateway::HttpAnalysisGateway;
use std::path::PathBuf;
use store::SqliteSessionStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::telegram::Telegram;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recital_bot=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env()?;

    // Ensure the session database directory exists
    if let Some(parent) = PathBuf::from(&config.session_db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.session_db_path, "Opening session store");
    let store = SqliteSessionStore::open(&config.session_db_path)?;
    match store.purge_expired() {
        Ok(purged) if purged > 0 => tracing::info!(purged, "Dropped expired session entries"),
        Ok(_) => {}
        Err(error) => tracing::warn!(%error, "Failed to purge expired sessions"),
    }

    let gateway = HttpAnalysisGateway::new(&config.analysis_url, &config.analysis_api_key)?;
    tracing::info!(url = %config.analysis_url, "Analysis gateway client initialized");

    let transport = Telegram::new(&config.bot_token)?;
    let engine = Engine::new(store, gateway, config.default_language);

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                shutdown.cancel();
            }
        });
    }

    tracing::info!("Starting dispatcher");
    Dispatcher::new(engine, transport, shutdown).run().await;

    tracing::info!("Stopped");
    Ok(())
}
