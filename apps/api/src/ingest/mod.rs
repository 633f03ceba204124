//! Ingestion Pipeline: resume directory → text → embedding → resume index.
//!
//! Flow per document: read bytes → extract text → dedup check → embed → normalize + append
//! (both halves together) → report. A run works on a copy of the index and commits it with
//! one flush at the end; the caller's index only takes the copy's place once that flush has
//! succeeded. A failing document is reported and skipped; it never leaves one half of the
//! index appended without the other.

pub mod extract;
pub mod handlers;
pub mod purge;
pub mod upload;

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::DedupPolicy;
use crate::embedding::Embedder;
use crate::errors::AppError;
use crate::index::ResumeIndex;
use crate::ingest::extract::TextExtractor;
use crate::models::resume::content_hash;

#[derive(Debug, Clone, Serialize)]
pub struct IngestedDocument {
    pub filename: String,
    pub position: usize,
    pub text_chars: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SkipReason {
    NotPdf,
    InvalidName,
    /// Same filename, same extracted text as the indexed entry.
    Unchanged,
    DuplicateContent { existing_filename: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedDocument {
    pub filename: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedDocument {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub indexed: Vec<IngestedDocument>,
    /// Already indexed under the same filename, re-embedded in place with new text.
    pub replaced: Vec<IngestedDocument>,
    pub skipped: Vec<SkippedDocument>,
    pub failed: Vec<FailedDocument>,
    /// Size of the index after the run.
    pub total_resumes: usize,
}

/// Ingests every PDF in `source_dir` into `index` and flushes it.
///
/// Files are processed in name order so positions are reproducible. Under
/// [`DedupPolicy::ContentHash`] a filename maps to at most one entry: a changed file replaces
/// its entry in place, and unchanged content under any indexed name is skipped.
/// If the final flush fails, `index` is left exactly as it was.
pub async fn ingest_directory(
    index: &mut ResumeIndex,
    source_dir: &Path,
    extractor: &dyn TextExtractor,
    embedder: &dyn Embedder,
    policy: DedupPolicy,
) -> Result<IngestReport, AppError> {
    let mut report = IngestReport::default();

    let filenames = match list_files(source_dir).await {
        Ok(names) => names,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!(
                "No resumes uploaded yet ({} does not exist)",
                source_dir.display()
            )))
        }
        Err(e) => return Err(AppError::Internal(e.into())),
    };
    let mut staged = index.clone();

    info!(
        "Ingesting {} files from {} (dedup: {:?})",
        filenames.len(),
        source_dir.display(),
        policy
    );

    for entry in filenames {
        let filename = match entry {
            Ok(name) => name,
            Err(lossy) => {
                report.skipped.push(SkippedDocument {
                    filename: lossy,
                    reason: SkipReason::InvalidName,
                });
                continue;
            }
        };

        if !is_pdf(&filename) {
            report.skipped.push(SkippedDocument {
                filename,
                reason: SkipReason::NotPdf,
            });
            continue;
        }

        let bytes = match tokio::fs::read(source_dir.join(&filename)).await {
            Ok(b) => b,
            Err(e) => {
                warn!("Could not read {filename}: {e}");
                report.failed.push(FailedDocument {
                    filename,
                    error: format!("could not read file: {e}"),
                });
                continue;
            }
        };

        let text = extractor.extract(&filename, bytes).await;
        if text.is_empty() {
            warn!("{filename} yielded no extractable text");
        }

        let mut replace_at = None;
        if policy == DedupPolicy::ContentHash {
            let hash = content_hash(&text);
            if let Some(existing) = staged.find_by_filename(&filename) {
                if existing.content_hash == hash {
                    info!("Skipping {filename}: unchanged since last ingestion");
                    report.skipped.push(SkippedDocument {
                        filename,
                        reason: SkipReason::Unchanged,
                    });
                    continue;
                }
                replace_at = Some(existing.position);
            } else if let Some(existing) = staged.find_by_hash(&hash) {
                info!("Skipping {filename}: same content as {}", existing.filename);
                report.skipped.push(SkippedDocument {
                    reason: SkipReason::DuplicateContent {
                        existing_filename: existing.filename.clone(),
                    },
                    filename,
                });
                continue;
            }
        }

        let embedding = match embedder.embed(&text).await {
            Ok(v) => v,
            Err(e) => {
                warn!("Embedding failed for {filename}: {e}");
                report.failed.push(FailedDocument {
                    filename,
                    error: format!("embedding failed: {e}"),
                });
                continue;
            }
        };

        let text_chars = text.chars().count();
        let outcome = match replace_at {
            Some(position) => staged.replace(position, text, &embedding),
            None => staged.insert(&filename, text, &embedding),
        };
        match outcome {
            Ok(record) => {
                let document = IngestedDocument {
                    position: record.position,
                    filename,
                    text_chars,
                };
                if replace_at.is_some() {
                    info!("Re-indexed {} at position {}", document.filename, document.position);
                    report.replaced.push(document);
                } else {
                    info!("Indexed {} at position {}", document.filename, document.position);
                    report.indexed.push(document);
                }
            }
            Err(e) => {
                warn!("Could not index {filename}: {e}");
                report.failed.push(FailedDocument {
                    filename,
                    error: e.to_string(),
                });
            }
        }
    }

    staged.flush()?;
    *index = staged;
    report.total_resumes = index.len();

    info!(
        "Ingestion finished: {} indexed, {} replaced, {} skipped, {} failed, {} total",
        report.indexed.len(),
        report.replaced.len(),
        report.skipped.len(),
        report.failed.len(),
        report.total_resumes
    );
    Ok(report)
}

/// Regular files in `dir`, sorted by name. Non-UTF-8 names come back as `Err(lossy)`.
async fn list_files(dir: &Path) -> std::io::Result<Vec<Result<String, String>>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name();
        names.push(
            name.into_string()
                .map_err(|raw| raw.to_string_lossy().into_owned()),
        );
    }
    names.sort_by(|a, b| sort_key(a).cmp(sort_key(b)));
    Ok(names)
}

fn sort_key(entry: &Result<String, String>) -> &str {
    match entry {
        Ok(name) | Err(name) => name,
    }
}

pub fn is_pdf(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}
