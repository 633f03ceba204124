use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::chat::session::ChatSession;
use crate::chat::{ask, history, open_session, reset, ChatReply};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessageRequest {
    pub message: String,
}

/// POST /api/v1/chat/sessions
pub async fn handle_open_session(
    State(state): State<AppState>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<ChatSession>), AppError> {
    let session = open_session(&state.index, &state.chats, &req.filename).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/v1/chat/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatSession>, AppError> {
    Ok(Json(history(&state.chats, id).await?))
}

/// POST /api/v1/chat/sessions/:id/messages
pub async fn handle_send_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChatMessageRequest>,
) -> Result<Json<ChatReply>, AppError> {
    let reply = ask(
        &state.index,
        &state.chats,
        state.generator.as_ref(),
        id,
        &req.message,
    )
    .await?;
    Ok(Json(reply))
}

/// DELETE /api/v1/chat/sessions/:id
pub async fn handle_reset_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    reset(&state.chats, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
