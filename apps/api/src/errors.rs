use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::embedding::EmbedError;
use crate::index::IndexError;
use crate::ingest::purge::DeletionReport;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbedError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Deletion partially failed")]
    DeletionPartialFailure(DeletionReport),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut details: Option<Value> = None;

        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Index(IndexError::DegenerateVector) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "DEGENERATE_VECTOR",
                "The text has no embeddable content".to_string(),
            ),
            AppError::Index(IndexError::InvalidRecord(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Index(e) => {
                tracing::error!("Index error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INDEX_ERROR",
                    format!("The resume index is unavailable: {e}"),
                )
            }
            AppError::Embedding(e) => {
                tracing::error!("Embedding error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "EMBEDDING_ERROR",
                    format!("The embedding service failed: {e}"),
                )
            }
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    format!("The language model request failed: {e}"),
                )
            }
            AppError::DeletionPartialFailure(report) => {
                tracing::error!("Delete-all left targets behind: {report:?}");
                details = serde_json::to_value(report).ok();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DELETION_PARTIAL_FAILURE",
                    "Some stored data could not be deleted".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
