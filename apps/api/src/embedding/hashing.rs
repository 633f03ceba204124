//! Feature-hashing stand-in for the sentence model in tests.
//!
//! Each lowercase token is hashed with BLAKE3 into one of `dimension` buckets and counted, so
//! texts sharing vocabulary land close together. Text without tokens embeds to the zero vector.

use async_trait::async_trait;

use super::{EmbedError, Embedder};

pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Synchronous core of [`Embedder::embed`].
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        for token in tokenize(text) {
            vector[self.bucket(&token)] += 1.0;
        }
        vector
    }

    fn bucket(&self, token: &str) -> usize {
        let hash = blake3::hash(token.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&hash.as_bytes()[..8]);
        (u64::from_le_bytes(prefix) % self.dimension as u64) as usize
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.embed_sync(text))
    }

    fn backend(&self) -> &'static str {
        "hashing"
    }
}

/// Lowercase word tokens. `+` and `#` stay attached so "C++" and "C#" survive.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{inner_product, normalize};

    #[test]
    fn test_tokenize_keeps_language_symbols() {
        let tokens: Vec<String> = tokenize("Rust, C++ and C#; 5 years!").collect();
        assert_eq!(tokens, vec!["rust", "c++", "and", "c#", "5", "years"]);
    }

    #[test]
    fn test_embedding_has_configured_dimension() {
        let embedder = HashingEmbedder::new(384);
        assert_eq!(embedder.embed_sync("hello world").len(), 384);
    }

    #[test]
    fn test_embedding_is_deterministic() {
        let embedder = HashingEmbedder::new(384);
        let a = embedder.embed_sync("Experience: 5 years Python");
        let b = embedder.embed_sync("Experience: 5 years Python");
        assert_eq!(a, b);
    }

    #[test]
    fn test_shared_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::new(384);
        let query = normalize(&embedder.embed_sync("Python developer")).unwrap();
        let python = normalize(&embedder.embed_sync("Experience: 5 years Python")).unwrap();
        let java = normalize(&embedder.embed_sync("Experience: 2 years Java")).unwrap();
        assert!(inner_product(&query, &python) > inner_product(&query, &java));
    }
}
