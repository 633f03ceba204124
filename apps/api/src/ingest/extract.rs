//! Text extraction from uploaded documents.

use async_trait::async_trait;
use tracing::warn;

/// Pulls plain text out of a document. Never fails: unreadable input yields an empty string.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, filename: &str, bytes: Vec<u8>) -> String;
}

/// PDF extraction via `pdf-extract`.
///
/// Parsing is CPU-bound and some malformed PDFs make the parser panic, so it runs on the
/// blocking pool where a panic surfaces as a `JoinError` instead of taking the runtime down.
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, filename: &str, bytes: Vec<u8>) -> String {
        let joined =
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;

        match joined {
            Ok(Ok(text)) => tidy_text(&text),
            Ok(Err(e)) => {
                warn!("Could not extract text from {filename}: {e}");
                String::new()
            }
            Err(e) => {
                warn!("PDF parser aborted on {filename}: {e}");
                String::new()
            }
        }
    }
}

/// Trims each line and drops blank ones, joining what is left with newlines.
pub fn tidy_text(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
