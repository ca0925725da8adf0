//! prism_bot - multi-provider AI command backend
//!
//! Routes chat commands to configurable AI providers, normalizes their
//! heterogeneous responses, and tracks per-user spend.

mod ai;
mod api;
mod config;
mod ledger;
mod session;

use api::{create_router, AppState};
use config::ConfigStore;
use ledger::Ledger;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prism_bot=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config_path =
        std::env::var("PRISM_CONFIG").unwrap_or_else(|_| "config.json".to_string());
    let db_path = std::env::var("PRISM_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.prism-bot/ledger.db")
    });
    let port: u16 = std::env::var("PRISM_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    tracing::info!(path = %config_path, "Loading provider configuration");
    let config = Arc::new(ConfigStore::load(&config_path)?);
    for (capability, provider, model) in config.active_providers() {
        tracing::info!(
            capability = %capability,
            provider = %provider,
            model = %model,
            "capability configured"
        );
    }

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %db_path, "Opening ledger database");
    let ledger = Ledger::open(&db_path)?;

    let state = AppState::new(config, ledger);
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
