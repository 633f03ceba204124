use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service version, embedding backend and index size.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let indexed = state.index.read().await.len();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME"),
        "embedding_backend": state.embedder.backend(),
        "indexed_resumes": indexed
    }))
}
