//! Storing uploaded resumes in the resume directory.

use std::path::Path;

use tracing::info;

use crate::errors::AppError;
use crate::index::write_atomic;
use crate::ingest::is_pdf;
use crate::models::resume::validate_filename;

/// Reduces a client-supplied name to its last path component.
///
/// Both separators are honoured since browsers on Windows send full paths.
pub fn bare_filename(raw: &str) -> &str {
    raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim()
}

/// Writes one uploaded PDF into `resume_dir`, creating the directory on demand.
/// Returns the stored file name. An existing file of the same name is replaced.
pub async fn store_upload(resume_dir: &Path, raw_name: &str, bytes: &[u8]) -> Result<String, AppError> {
    let filename = bare_filename(raw_name);
    validate_filename(filename)?;
    if !is_pdf(filename) {
        return Err(AppError::Validation(format!(
            "Only PDF files can be uploaded (got '{filename}')"
        )));
    }
    if bytes.is_empty() {
        return Err(AppError::Validation(format!("'{filename}' is empty")));
    }

    let target = resume_dir.join(filename);
    let data = bytes.to_vec();
    tokio::task::spawn_blocking(move || write_atomic(&target, &data))
        .await
        .map_err(|e| AppError::Internal(e.into()))??;

    info!("Stored upload {filename} ({} bytes)", bytes.len());
    Ok(filename.to_string())
}
