//! Ollama embedding backend (`POST /api/embeddings`).
//!
//! With the `all-minilm` model this yields the same 384-wide sentence embeddings as
//! all-MiniLM-L6-v2.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_dimension, EmbedError, Embedder};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Clone)]
pub struct OllamaEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, dimension: usize) -> Result<Self, EmbedError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(60)).build()?,
            endpoint: format!("{}/api/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dimension,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbedError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: EmbeddingResponse = response.json().await?;
        debug!("Ollama returned {} floats", body.embedding.len());
        check_dimension(body.embedding, self.dimension)
    }

    fn backend(&self) -> &'static str {
        "ollama"
    }
}
