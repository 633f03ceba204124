pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::chat::handlers as chat;
use crate::compare::handlers as compare;
use crate::ingest::handlers as ingest;
use crate::retrieval::handlers as retrieval;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        // Resumes
        .route(
            "/api/v1/resumes/upload",
            post(ingest::handle_upload).layer(upload_limit),
        )
        .route("/api/v1/resumes/process", post(ingest::handle_process))
        .route(
            "/api/v1/resumes",
            get(retrieval::handle_list).delete(ingest::handle_delete_all),
        )
        .route("/api/v1/resumes/:filename", get(retrieval::handle_get_resume))
        // Screening
        .route("/api/v1/screening", post(retrieval::handle_screening))
        // Chat
        .route("/api/v1/chat/sessions", post(chat::handle_open_session))
        .route(
            "/api/v1/chat/sessions/:id",
            get(chat::handle_get_session).delete(chat::handle_reset_session),
        )
        .route(
            "/api/v1/chat/sessions/:id/messages",
            post(chat::handle_send_message),
        )
        // Comparison
        .route("/api/v1/compare", post(compare::handle_compare))
        .route("/api/v1/compare/export", post(compare::handle_compare_export))
        .with_state(state)
}
