//! Side-by-side comparison of two indexed resumes, and its PDF/Markdown export.

pub mod handlers;
pub mod prompts;
pub mod report;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::compare::prompts::{build_compare_prompt, COMPARE_SYSTEM, COMPARISON_DIMENSIONS};
use crate::errors::AppError;
use crate::index::ResumeIndex;
use crate::llm_client::prompts::GROUNDING_INSTRUCTION;
use crate::llm_client::{parse_json, TextGenerator};

const NOT_COVERED: &str = "Not covered";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionComparison {
    pub dimension: String,
    pub first: String,
    pub second: String,
}

/// Returned by `/compare` and accepted back by `/compare/export`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub first: String,
    pub second: String,
    pub summary: String,
    #[serde(default)]
    pub dimensions: Vec<DimensionComparison>,
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
}

/// What the model is asked to return.
#[derive(Debug, Deserialize)]
struct ModelComparison {
    summary: String,
    #[serde(default)]
    dimensions: Vec<DimensionComparison>,
}

pub async fn compare(
    index: &RwLock<ResumeIndex>,
    generator: &dyn TextGenerator,
    first: &str,
    second: &str,
) -> Result<ComparisonReport, AppError> {
    let (first_text, second_text) = {
        let index = index.read().await;
        let first_text = index.find_by_filename(first).map(|r| r.text.clone());
        let second_text = index.find_by_filename(second).map(|r| r.text.clone());
        match (first_text, second_text) {
            (Some(a), Some(b)) => (a, b),
            (a, b) => {
                let missing: Vec<&str> = [(first, a.is_none()), (second, b.is_none())]
                    .into_iter()
                    .filter_map(|(name, absent)| absent.then_some(name))
                    .collect();
                return Err(AppError::NotFound(format!(
                    "Resume(s) not found: {}",
                    missing.join(", ")
                )));
            }
        }
    };

    let prompt = build_compare_prompt(GROUNDING_INSTRUCTION, first, &first_text, second, &second_text);
    let raw = generator.generate(&prompt, COMPARE_SYSTEM).await?;
    let parsed: ModelComparison = parse_json(&raw)?;

    info!("Compared {first} with {second}");
    Ok(ComparisonReport {
        first: first.to_string(),
        second: second.to_string(),
        summary: parsed.summary.trim().to_string(),
        dimensions: align_dimensions(parsed.dimensions),
        generated_at: Utc::now(),
    })
}

/// Puts the model's rows in canonical order, one per dimension.
/// Unknown dimensions are dropped; missing ones are filled with a placeholder.
fn align_dimensions(rows: Vec<DimensionComparison>) -> Vec<DimensionComparison> {
    COMPARISON_DIMENSIONS
        .iter()
        .map(|&name| {
            match rows
                .iter()
                .find(|row| row.dimension.trim().eq_ignore_ascii_case(name))
            {
                Some(row) => DimensionComparison {
                    dimension: name.to_string(),
                    first: row.first.trim().to_string(),
                    second: row.second.trim().to_string(),
                },
                None => {
                    warn!("Model skipped comparison dimension '{name}'");
                    DimensionComparison {
                        dimension: name.to_string(),
                        first: NOT_COVERED.to_string(),
                        second: NOT_COVERED.to_string(),
                    }
                }
            }
        })
        .collect()
}
