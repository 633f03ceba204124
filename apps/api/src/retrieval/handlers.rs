use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::resume::{ResumeMatch, ResumeRecord, ResumeSummary};
use crate::retrieval::{retrieve_by_filename, retrieve_top_k};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScreeningRequest {
    pub job_description: String,
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ScreeningResponse {
    pub k: usize,
    pub matches: Vec<ResumeMatch>,
}

#[derive(Debug, Serialize)]
pub struct ResumeListResponse {
    pub total: usize,
    pub resumes: Vec<ResumeSummary>,
}

/// POST /api/v1/screening
pub async fn handle_screening(
    State(state): State<AppState>,
    Json(req): Json<ScreeningRequest>,
) -> Result<Json<ScreeningResponse>, AppError> {
    if req.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description must not be empty".to_string(),
        ));
    }
    let max = state.config.max_top_k;
    let k = req.k.unwrap_or(state.config.default_top_k);
    if !(1..=max).contains(&k) {
        return Err(AppError::Validation(format!(
            "k must lie between 1 and {max} (got {k})"
        )));
    }

    let index = state.index.read().await;
    let matches = retrieve_top_k(
        &index,
        state.embedder.as_ref(),
        &req.job_description,
        k,
    )
    .await?;
    Ok(Json(ScreeningResponse { k, matches }))
}

/// GET /api/v1/resumes
pub async fn handle_list(State(state): State<AppState>) -> Json<ResumeListResponse> {
    let index = state.index.read().await;
    let resumes: Vec<ResumeSummary> = index.records().map(ResumeSummary::from).collect();
    Json(ResumeListResponse {
        total: resumes.len(),
        resumes,
    })
}

/// GET /api/v1/resumes/:filename
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<ResumeRecord>, AppError> {
    let index = state.index.read().await;
    let record = retrieve_by_filename(&index, &filename)?;
    Ok(Json(record.clone()))
}
