mod config;
mod http;
mod registry;
mod storage;
mod ws;

use crate::config::Config;
use crate::registry::SessionRegistry;
use crate::storage::FileStorage;
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use viva_core::judge::OpenAiJudge;

/// Shared server state, constructed once at startup and injected into every
/// handler. The registry is the only mutable state shared across connection
/// handlers; everything else is read-only or keyed per session.
pub struct AppState {
    pub registry: SessionRegistry,
    pub storage: FileStorage,
    pub judge: OpenAiJudge,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load application configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    info!("Configuration loaded successfully. Starting interview API...");

    let state = Arc::new(AppState {
        registry: SessionRegistry::new(config.judge_timeout),
        storage: FileStorage::new(&config.data_dir),
        judge: OpenAiJudge::new(config.openai_api_key.clone(), config.chat_model.clone()),
    });

    // Permissive CORS so a separately-served frontend can connect.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/ws/interview", get(ws::ws_handler))
        .route("/api/health", get(http::health))
        .route("/api/sessions", get(http::list_sessions))
        .route("/api/sessions/{session_id}", get(http::get_session))
        .with_state(state)
        .layer(cors);

    info!("Listening on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .context("Failed to bind server address")?;
    axum::serve(listener, app).await?;

    Ok(())
}
