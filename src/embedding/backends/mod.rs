//! Embedding backend implementations
//!
//! Two deterministic backends ship with the crate: a token-hashing
//! bag-of-words embedder (the default for scoring) and a hash-seeded
//! mock embedder for tests. Both are cheap enough to embed individual
//! tokens, which the semantic scorer relies on.

use crate::embedding::{normalize_embedding, Embedder, Embedding, EmbeddingConfig};
use anyhow::Result;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Mock embedder for testing (deterministic pseudo-random embeddings).
pub struct MockEmbedder {
    config: EmbeddingConfig,
}

impl MockEmbedder {
    /// Create a new mock embedder
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }

    /// Generate a deterministic embedding seeded by the text hash
    fn generate_embedding(&self, text: &str) -> Embedding {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        let mut embedding = Vec::with_capacity(self.config.dimension);
        let mut state = seed;

        for _ in 0..self.config.dimension {
            // Linear congruential step
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            let value = ((state / 65536) % 10000) as f32 / 10000.0 - 0.5;
            embedding.push(value);
        }

        if self.config.normalize {
            normalize_embedding(&mut embedding);
        }
        embedding
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.generate_embedding(text))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|&text| self.generate_embedding(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

/// Token-hashing bag-of-words embedder.
///
/// Each token is hashed to a position in the vector and counted, with
/// term-frequency normalization. Overlapping vocabularies produce
/// correlated embeddings, which is what the semantic scores need from a
/// model-free default.
pub struct TokenEmbedder {
    config: EmbeddingConfig,
}

impl TokenEmbedder {
    /// Create a new token-based embedder
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }

    fn generate_embedding(&self, text: &str) -> Embedding {
        let mut embedding = vec![0.0; self.config.dimension];

        let tokens: Vec<&str> = text
            .split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
            .filter(|s| !s.is_empty())
            .collect();

        if tokens.is_empty() {
            return embedding;
        }

        for token in &tokens {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let idx = (hasher.finish() as usize) % self.config.dimension;
            embedding[idx] += 1.0;
        }

        let total_tokens = tokens.len() as f32;
        for val in embedding.iter_mut() {
            *val /= total_tokens;
        }

        if self.config.normalize {
            normalize_embedding(&mut embedding);
        }
        embedding
    }
}

impl Embedder for TokenEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.generate_embedding(text))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|&text| self.generate_embedding(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

/// Create an embedder by backend name.
pub fn create_embedder(backend: &str, config: EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match backend {
        "mock" => Ok(Arc::new(MockEmbedder::new(config))),
        "token" => Ok(Arc::new(TokenEmbedder::new(config))),
        _ => {
            tracing::warn!("unknown backend '{}', using token-based embedder", backend);
            Ok(Arc::new(TokenEmbedder::new(config)))
        }
    }
}
