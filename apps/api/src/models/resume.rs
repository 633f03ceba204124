use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::index::IndexError;

/// One indexed resume. `position` is the join key with the vector index.
///
/// Records are append-only: once written, nothing but a whole-store delete removes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub position: usize,
    pub filename: String,
    pub text: String,
    /// BLAKE3 hex digest of `text`, used by the content-hash dedup policy.
    pub content_hash: String,
    pub ingested_at: DateTime<Utc>,
}

impl ResumeRecord {
    /// Builds a record for `filename` at `position`, hashing `text`.
    ///
    /// Rejects empty names and anything that is not a bare file name, since the
    /// filename doubles as the lookup key.
    pub fn new(position: usize, filename: &str, text: String) -> Result<Self, IndexError> {
        validate_filename(filename)?;
        Ok(Self {
            position,
            filename: filename.to_string(),
            content_hash: content_hash(&text),
            text,
            ingested_at: Utc::now(),
        })
    }
}

/// A ranked retrieval hit. The score only exists at query time and is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeMatch {
    pub position: usize,
    pub filename: String,
    pub text: String,
    pub score: f32,
}

impl ResumeMatch {
    pub fn from_record(record: &ResumeRecord, score: f32) -> Self {
        Self {
            position: record.position,
            filename: record.filename.clone(),
            text: record.text.clone(),
            score,
        }
    }
}

/// Lightweight listing row (no full text).
#[derive(Debug, Clone, Serialize)]
pub struct ResumeSummary {
    pub position: usize,
    pub filename: String,
    pub text_chars: usize,
    pub ingested_at: DateTime<Utc>,
}

impl From<&ResumeRecord> for ResumeSummary {
    fn from(record: &ResumeRecord) -> Self {
        Self {
            position: record.position,
            filename: record.filename.clone(),
            text_chars: record.text.chars().count(),
            ingested_at: record.ingested_at,
        }
    }
}

pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

pub fn validate_filename(filename: &str) -> Result<(), IndexError> {
    if filename.trim().is_empty() {
        return Err(IndexError::InvalidRecord("filename is empty".to_string()));
    }
    if filename.contains('/') || filename.contains('\\') || filename == "." || filename == ".." {
        return Err(IndexError::InvalidRecord(format!(
            "'{filename}' is not a bare file name"
        )));
    }
    Ok(())
}
