use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Body text of every failure response; upstream detail stays in the logs.
pub const GENERIC_FAILURE: &str = "Something went wrong";

/// Failure taxonomy of the chatbot pipeline.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("document store unavailable")]
    StoreUnavailable(#[source] anyhow::Error),

    #[error("completion service call failed")]
    CompletionFailed(#[source] anyhow::Error),
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        match &self {
            ChatError::StoreUnavailable(source) => {
                error!(?source, "Collection read failed");
            }
            ChatError::CompletionFailed(source) => {
                error!(?source, "Completion call failed");
            }
        }

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": GENERIC_FAILURE })),
        )
            .into_response()
    }
}
