use std::sync::Arc;

use tokio::sync::RwLock;

use crate::chat::session::SessionStore;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::index::ResumeIndex;
use crate::ingest::extract::TextExtractor;
use crate::llm_client::TextGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Ingestion and delete-all hold the write lock for their whole run; queries take the read lock.
    pub index: Arc<RwLock<ResumeIndex>>,
    pub embedder: Arc<dyn Embedder>,
    pub extractor: Arc<dyn TextExtractor>,
    pub generator: Arc<dyn TextGenerator>,
    pub chats: SessionStore,
}

impl AppState {
    pub fn new(
        config: Config,
        index: ResumeIndex,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn TextExtractor>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            config,
            index: Arc::new(RwLock::new(index)),
            embedder,
            extractor,
            generator,
            chats: SessionStore::default(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::AppState;
    use crate::config::{test_config, Config};
    use crate::embedding::hashing::HashingEmbedder;
    use crate::index::ResumeIndex;
    use crate::ingest::test_support::Utf8Extractor;
    use crate::llm_client::{LlmError, TextGenerator};

    /// Replays queued replies and records every prompt it was given.
    /// An exhausted queue answers with `LlmError::EmptyContent`.
    #[derive(Default)]
    pub struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub fn replying(replies: Vec<Result<String, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyContent))
        }
    }

    /// State rooted at `root` with the hashing embedder and a plain-text extractor.
    pub fn test_state(root: &Path, generator: Arc<ScriptedGenerator>) -> AppState {
        test_state_with(test_config(root), generator)
    }

    pub fn test_state_with(config: Config, generator: Arc<ScriptedGenerator>) -> AppState {
        let index = ResumeIndex::open(&config.index_dir, config.embedding_dimension).unwrap();
        AppState::new(
            config.clone(),
            index,
            Arc::new(HashingEmbedder::new(config.embedding_dimension)),
            Arc::new(Utf8Extractor),
            generator,
        )
    }
}
