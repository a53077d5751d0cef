//! Seam for the external text encoder.
//!
//! The classifier never computes embeddings for the corpus; it only needs an
//! encoder for [`crate::LegalityClassifier::classify_text`]. Real deployments
//! plug a neural model in behind [`Embedder`].

use fxhash::hash64;
use thiserror::Error;

/// Errors surfaced by an [`Embedder`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbedError {
    #[error("input text is empty")]
    EmptyInput,
    #[error("encoder backend failed: {0}")]
    Backend(String),
}

/// Produces fixed-dimension vectors from text.
///
/// Implementations should be deterministic; classification results are only
/// reproducible when the same text always yields the same vector.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Length of every vector returned by [`Embedder::embed`].
    fn dimension(&self) -> usize;
}

/// Deterministic hashing encoder for tests and demos.
///
/// Every whitespace-separated token is hashed into one signed bucket, so texts
/// that share tokens get similar vectors. It carries no semantics beyond that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl Embedder for StubEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut v = vec![0f32; self.dimension];
        let mut tokens = 0usize;
        for token in text.split_whitespace() {
            let h = hash64(token.to_lowercase().as_bytes());
            let bucket = (h % self.dimension as u64) as usize;
            v[bucket] += if h >> 63 == 0 { 1.0 } else { -1.0 };
            tokens += 1;
        }
        if tokens == 0 {
            return Err(EmbedError::EmptyInput);
        }
        Ok(v)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
