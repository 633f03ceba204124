//! In-process all-MiniLM-L6-v2 via fastembed (ONNX Runtime).
//!
//! The model is fetched into `EMBEDDING_CACHE_DIR` the first time it is loaded (~90MB) and
//! read from there afterwards. Inference is CPU-bound, so each call runs on the blocking pool.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::info;

use super::{check_dimension, EmbedError, Embedder};

pub struct MiniLmEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
}

impl MiniLmEmbedder {
    /// Loads the model, downloading it into `cache_dir` if needed. Blocks.
    pub fn new(cache_dir: PathBuf, dimension: usize) -> Result<Self, EmbedError> {
        info!("Loading all-MiniLM-L6-v2 (cache: {})", cache_dir.display());
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::AllMiniLML6V2)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(false),
        )
        .map_err(|e| EmbedError::Model(e.to_string()))?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            dimension,
        })
    }
}

#[async_trait]
impl Embedder for MiniLmEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let model = Arc::clone(&self.model);
        let text = text.to_string();

        let mut vectors = tokio::task::spawn_blocking(move || {
            let model = model
                .lock()
                .map_err(|_| EmbedError::Model("embedding model lock poisoned".to_string()))?;
            model
                .embed(vec![text], None)
                .map_err(|e| EmbedError::Model(e.to_string()))
        })
        .await
        .map_err(|e| EmbedError::Model(format!("embedding task failed: {e}")))??;

        let vector = vectors.pop().ok_or(EmbedError::EmptyResponse)?;
        check_dimension(vector, self.dimension)
    }

    fn backend(&self) -> &'static str {
        "fastembed"
    }
}
