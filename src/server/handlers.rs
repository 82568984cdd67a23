//! Request handlers for the chatbot endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ChatError;

use super::AppState;

pub(super) fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chatbot", post(chat))
        .route("/healthz", get(health))
        .method_not_allowed_fallback(method_not_allowed)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Inbound chat request. An absent `message` field is treated as an empty
/// question rather than rejected.
#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct ChatReply {
    reply: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ChatError> {
    let reply = state.pipeline.answer(&payload.message).await?;
    Ok(Json(ChatReply { reply }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody {
            error: "Method not allowed".to_string(),
        }),
    )
}
