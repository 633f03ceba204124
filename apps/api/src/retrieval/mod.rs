//! Retrieval Service: semantic top-k over the resume index, and exact lookup by filename.

pub mod handlers;

use tracing::debug;

use crate::embedding::Embedder;
use crate::errors::AppError;
use crate::index::ResumeIndex;
use crate::models::resume::{ResumeMatch, ResumeRecord};

/// Ranks indexed resumes against `query`, best first, at most `k` of them.
///
/// An empty index returns immediately without calling the embedder.
pub async fn retrieve_top_k(
    index: &ResumeIndex,
    embedder: &dyn Embedder,
    query: &str,
    k: usize,
) -> Result<Vec<ResumeMatch>, AppError> {
    if index.is_empty() || k == 0 {
        return Ok(Vec::new());
    }

    let embedding = embedder.embed(query).await?;
    let matches = index.search(&embedding, k)?;
    debug!(
        "Query matched {} of {} resumes (k={k})",
        matches.len(),
        index.len()
    );
    Ok(matches)
}

pub fn retrieve_by_filename<'a>(
    index: &'a ResumeIndex,
    filename: &str,
) -> Result<&'a ResumeRecord, AppError> {
    index
        .find_by_filename(filename)
        .ok_or_else(|| AppError::NotFound(format!("Resume '{filename}' not found")))
}
