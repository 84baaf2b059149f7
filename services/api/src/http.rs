use crate::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::warn;

/// Process liveness plus a coarse view of what the server is doing.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "active_sessions": state.registry.len().await,
        "data_dir": state.storage.data_dir().display().to_string(),
    }))
}

/// Lists every persisted session id.
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let ids = state.storage.list().await.map_err(|e| {
        warn!("Failed to list sessions: {e:#}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to list sessions" })),
        )
    })?;
    Ok(Json(json!({ "count": ids.len(), "sessions": ids })))
}

/// Fetches one persisted session record by id.
pub async fn get_session(
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let record = state.storage.load(&session_id).await.map_err(|e| {
        warn!(session_id = %session_id, "Failed to load session record: {e:#}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to load session" })),
        )
    })?;

    match record {
        Some(record) => Ok(Json(serde_json::json!(record))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Session not found" })),
        )),
    }
}
