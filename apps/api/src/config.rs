use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

use crate::index::EMBEDDING_DIMENSION;

/// Which embedding provider backs ingestion and queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// all-MiniLM-L6-v2 run in-process through ONNX Runtime.
    #[default]
    FastEmbed,
    /// The same model served by a local Ollama daemon.
    Ollama,
}

impl FromStr for EmbeddingBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fastembed" | "local" => Ok(Self::FastEmbed),
            "ollama" => Ok(Self::Ollama),
            other => Err(anyhow!(
                "unknown EMBEDDING_BACKEND '{other}' (expected 'fastembed' or 'ollama')"
            )),
        }
    }
}

/// What ingestion does with a document whose text is already indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupPolicy {
    /// One entry per filename: unchanged files are skipped, changed ones replaced in place,
    /// and text already indexed under another name is skipped.
    ContentHash,
    /// Re-embed and append every document on every run, duplicates included.
    None,
}

impl FromStr for DedupPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content-hash" | "content_hash" => Ok(Self::ContentHash),
            "none" => Ok(Self::None),
            other => Err(anyhow!(
                "unknown INGEST_DEDUP '{other}' (expected 'content-hash' or 'none')"
            )),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Directory the uploaded PDFs live in; also the ingestion source.
    pub resume_dir: PathBuf,
    /// Directory holding `metadata.json` and the `index.<generation>.vec` it commits.
    pub index_dir: PathBuf,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_dimension: usize,
    /// Where the fastembed backend keeps the downloaded ONNX model.
    pub embedding_cache_dir: PathBuf,
    pub ollama_url: String,
    pub embedding_model: String,
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub dedup_policy: DedupPolicy,
    pub llm_max_attempts: u32,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            resume_dir: env_or("RESUME_DIR", "resumes").into(),
            index_dir: env_or("INDEX_DIR", "faiss_store").into(),
            embedding_backend: parse_env("EMBEDDING_BACKEND", EmbeddingBackend::default())?,
            embedding_dimension: EMBEDDING_DIMENSION,
            embedding_cache_dir: env_or("EMBEDDING_CACHE_DIR", ".fastembed_cache").into(),
            ollama_url: env_or("OLLAMA_URL", "http://localhost:11434"),
            embedding_model: env_or("EMBEDDING_MODEL", "all-minilm"),
            default_top_k: parse_env("DEFAULT_TOP_K", 5)?,
            max_top_k: parse_env("MAX_TOP_K", 10)?,
            dedup_policy: parse_env("INGEST_DEDUP", DedupPolicy::ContentHash)?,
            llm_max_attempts: parse_env("LLM_MAX_ATTEMPTS", 1)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_top_k == 0 {
            return Err(anyhow!("MAX_TOP_K must be at least 1"));
        }
        if !(1..=self.max_top_k).contains(&self.default_top_k) {
            return Err(anyhow!(
                "DEFAULT_TOP_K must lie in 1..={} (got {})",
                self.max_top_k,
                self.default_top_k
            ));
        }
        if self.llm_max_attempts == 0 {
            return Err(anyhow!("LLM_MAX_ATTEMPTS must be at least 1"));
        }
        Ok(())
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow!("{key} is invalid: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
pub(crate) fn test_config(root: &std::path::Path) -> Config {
    Config {
        anthropic_api_key: "test-key".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        resume_dir: root.join("resumes"),
        index_dir: root.join("faiss_store"),
        embedding_backend: EmbeddingBackend::FastEmbed,
        embedding_dimension: EMBEDDING_DIMENSION,
        embedding_cache_dir: root.join("models"),
        ollama_url: "http://localhost:11434".to_string(),
        embedding_model: "all-minilm".to_string(),
        default_top_k: 5,
        max_top_k: 10,
        dedup_policy: DedupPolicy::ContentHash,
        llm_max_attempts: 1,
        max_upload_bytes: 1024 * 1024,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parses_case_insensitively() {
        assert_eq!(
            "Ollama".parse::<EmbeddingBackend>().unwrap(),
            EmbeddingBackend::Ollama
        );
        assert_eq!(
            " FastEmbed ".parse::<EmbeddingBackend>().unwrap(),
            EmbeddingBackend::FastEmbed
        );
        assert_eq!(
            "local".parse::<EmbeddingBackend>().unwrap(),
            EmbeddingBackend::FastEmbed
        );
        assert!("hashing".parse::<EmbeddingBackend>().is_err());
        assert!("openai".parse::<EmbeddingBackend>().is_err());
    }

    #[test]
    fn test_default_backend_is_the_sentence_model() {
        assert_eq!(EmbeddingBackend::default(), EmbeddingBackend::FastEmbed);
    }

    #[test]
    fn test_dedup_policy_parses_both_spellings() {
        assert_eq!(
            "content-hash".parse::<DedupPolicy>().unwrap(),
            DedupPolicy::ContentHash
        );
        assert_eq!(
            "content_hash".parse::<DedupPolicy>().unwrap(),
            DedupPolicy::ContentHash
        );
        assert_eq!("none".parse::<DedupPolicy>().unwrap(), DedupPolicy::None);
        assert!("sometimes".parse::<DedupPolicy>().is_err());
    }

    #[test]
    fn test_validate_rejects_default_above_max() {
        let mut config = test_config(std::path::Path::new("/tmp"));
        config.default_top_k = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = test_config(std::path::Path::new("/tmp"));
        config.llm_max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_test_config_is_valid() {
        test_config(std::path::Path::new("/tmp")).validate().unwrap();
    }
}
