use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::{error, info};

use crate::errors::AppError;
use crate::ingest::purge::{delete_all, DeletionReport};
use crate::ingest::upload::store_upload;
use crate::ingest::{ingest_directory, IngestReport};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub stored: Vec<String>,
}

/// POST /api/v1/resumes/upload
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut stored = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        let Some(raw_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read '{raw_name}': {e}")))?;
        stored.push(store_upload(&state.config.resume_dir, &raw_name, &data).await?);
    }

    if stored.is_empty() {
        return Err(AppError::Validation(
            "No files were attached to the upload".to_string(),
        ));
    }
    Ok(Json(UploadResponse { stored }))
}

/// POST /api/v1/resumes/process
pub async fn handle_process(
    State(state): State<AppState>,
) -> Result<Json<IngestReport>, AppError> {
    let mut index = state.index.write().await;
    let report = ingest_directory(
        &mut index,
        &state.config.resume_dir,
        state.extractor.as_ref(),
        state.embedder.as_ref(),
        state.config.dedup_policy,
    )
    .await?;
    Ok(Json(report))
}

/// DELETE /api/v1/resumes
///
/// If some index file could not be removed, an empty generation is committed over whatever
/// is left so the store still reopens consistently.
pub async fn handle_delete_all(
    State(state): State<AppState>,
) -> Result<Json<DeletionReport>, AppError> {
    let mut index = state.index.write().await;
    let report = delete_all(&state.config.resume_dir, index.dir()).await;
    if report.store_cleared() {
        index.clear();
    } else if let Err(e) = index.reset() {
        error!("Could not commit an empty index after partial deletion: {e}");
    }
    state.chats.clear().await;

    if !report.success() {
        return Err(AppError::DeletionPartialFailure(report));
    }
    info!("All stored resume data deleted");
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::config::{test_config, DedupPolicy};
    use crate::index::{ResumeIndex, EMBEDDING_DIMENSION};
    use crate::state::test_support::{test_state_with, ScriptedGenerator};

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_processing_keeps_store_consistent() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(dir.path());
        config.dedup_policy = DedupPolicy::None;
        let state = test_state_with(config, Arc::new(ScriptedGenerator::default()));

        std::fs::create_dir_all(&state.config.resume_dir).unwrap();
        for (name, text) in [
            ("a.pdf", "Experience: 5 years Python"),
            ("b.pdf", "Experience: 2 years Java"),
            ("c.pdf", "Experience: 7 years Go"),
        ] {
            std::fs::write(state.config.resume_dir.join(name), text).unwrap();
        }

        let first = tokio::spawn(handle_process(State(state.clone())));
        let second = tokio::spawn(handle_process(State(state.clone())));
        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();

        let mut totals = [first.total_resumes, second.total_resumes];
        totals.sort_unstable();
        assert_eq!(totals, [3, 6]);

        let index = state.index.read().await;
        assert_eq!(index.len(), 6);
        index.check_consistency().unwrap();
        let reopened = ResumeIndex::open(&state.config.index_dir, EMBEDDING_DIMENSION).unwrap();
        assert_eq!(reopened.len(), 6);
        reopened.check_consistency().unwrap();
    }
}
