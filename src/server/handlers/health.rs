use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
    }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let chunk_count = state.store.count().await.unwrap_or(0);
    let meta = state.store.embedding_meta().await.unwrap_or(None);
    let provider_healthy = state.provider.health_check().await.unwrap_or(false);

    Ok(Json(json!({
        "indexed_chunks": chunk_count,
        "embedding_model": meta.as_ref().map(|m| m.model.clone()),
        "embedding_dimension": meta.as_ref().map(|m| m.dimension),
        "provider": state.provider.name(),
        "provider_healthy": provider_healthy,
    })))
}
