//! Embedding providers: the `embed(text) -> vector` collaborator.
//!
//! `AppState` holds an `Arc<dyn Embedder>`, chosen at startup from `EMBEDDING_BACKEND`.
//! Both backends produce all-MiniLM-L6-v2 sentence embeddings.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::config::{Config, EmbeddingBackend};

#[cfg(test)]
pub mod hashing;
#[cfg(feature = "fastembed")]
pub mod minilm;
pub mod ollama;

pub use ollama::OllamaEmbedder;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("local embedding model error: {0}")]
    Model(String),

    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding API returned no vector")]
    EmptyResponse,
}

/// Turns text into a fixed-width vector. Identical input must give identical output.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Human-readable backend label for logs and `/health`.
    fn backend(&self) -> &'static str;
}

/// Builds the configured backend. The fastembed model is downloaded on first use.
pub async fn build_embedder(config: &Config) -> anyhow::Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.embedding_backend {
        EmbeddingBackend::FastEmbed => load_local_model(config).await?,
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(
            &config.ollama_url,
            &config.embedding_model,
            config.embedding_dimension,
        )?),
    };
    Ok(embedder)
}

#[cfg(feature = "fastembed")]
async fn load_local_model(config: &Config) -> anyhow::Result<Arc<dyn Embedder>> {
    let cache_dir = config.embedding_cache_dir.clone();
    let dimension = config.embedding_dimension;
    let embedder =
        tokio::task::spawn_blocking(move || minilm::MiniLmEmbedder::new(cache_dir, dimension))
            .await??;
    Ok(Arc::new(embedder))
}

#[cfg(not(feature = "fastembed"))]
async fn load_local_model(_config: &Config) -> anyhow::Result<Arc<dyn Embedder>> {
    anyhow::bail!(
        "EMBEDDING_BACKEND=fastembed needs a build with the `fastembed` feature; \
         rebuild with it or set EMBEDDING_BACKEND=ollama"
    )
}

/// Rejects an empty or wrongly sized vector from a backend.
pub(crate) fn check_dimension(embedding: Vec<f32>, expected: usize) -> Result<Vec<f32>, EmbedError> {
    if embedding.is_empty() {
        return Err(EmbedError::EmptyResponse);
    }
    if embedding.len() != expected {
        return Err(EmbedError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    debug!("Received {}-dim embedding", embedding.len());
    Ok(embedding)
}
