use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::compare::report::{
    render_comparison_md, render_comparison_pdf, MARKDOWN_EXPORT_FILENAME, PDF_EXPORT_FILENAME,
};
use crate::compare::{compare, ComparisonReport};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub first: String,
    pub second: String,
}

impl CompareRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_both(&self.first, &self.second)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Pdf,
    Markdown,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    #[serde(default)]
    pub format: ExportFormat,
}

fn require_both(first: &str, second: &str) -> Result<(), AppError> {
    if first.trim().is_empty() || second.trim().is_empty() {
        return Err(AppError::Validation(
            "Both 'first' and 'second' filenames are required".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/v1/compare
pub async fn handle_compare(
    State(state): State<AppState>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<ComparisonReport>, AppError> {
    req.validate()?;
    let report = compare(&state.index, state.generator.as_ref(), &req.first, &req.second).await?;
    Ok(Json(report))
}

/// POST /api/v1/compare/export?format=pdf|markdown
/// Renders a report previously returned by `/compare` as a download.
pub async fn handle_compare_export(
    Query(params): Query<ExportParams>,
    Json(report): Json<ComparisonReport>,
) -> Result<Response, AppError> {
    require_both(&report.first, &report.second)?;

    let (content_type, filename, body) = match params.format {
        ExportFormat::Pdf => (
            "application/pdf",
            PDF_EXPORT_FILENAME,
            render_comparison_pdf(&report)?,
        ),
        ExportFormat::Markdown => (
            "text/markdown; charset=utf-8",
            MARKDOWN_EXPORT_FILENAME,
            render_comparison_md(&report).into_bytes(),
        ),
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response())
}
