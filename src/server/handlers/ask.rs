use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::rag::Query;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub product: Option<String>,
    pub top_k: Option<usize>,
}

impl AskRequest {
    fn into_query(self) -> Query {
        Query {
            question: self.question,
            product: self.product,
            top_k: self.top_k,
        }
    }
}

/// One-shot question answering. Generation failures degrade to a
/// sources-only payload with `answer: null` and a user-facing `detail`.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = uuid::Uuid::new_v4();
    tracing::info!(
        %request_id,
        product = ?payload.product,
        top_k = ?payload.top_k,
        "question received"
    );

    let answer = state.engine.ask(&payload.into_query()).await?;
    tracing::info!(
        %request_id,
        sources = answer.sources.len(),
        answered = answer.text.is_some(),
        "question handled"
    );

    Ok(Json(json!({
        "answer": answer.text,
        "detail": answer.detail,
        "sources": answer.sources,
    })))
}

/// Distinct products present in the index, for a UI filter dropdown.
pub async fn products(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state.store.products().await?;
    Ok(Json(json!({ "products": products })))
}
