//! Embedding backends and vector similarity.
//!
//! The chunker never talks to a model directly. It goes through
//! [`Embedder`], which hosts implement over whatever service they run
//! (a remote API, a local ONNX model, a test double). With the `fastembed`
//! feature the crate ships [`FastEmbedder`], a local backend.
//!
//! Timeouts and retries belong to the embedder implementation; the
//! detector only sees success or failure per batch.

use async_trait::async_trait;

use crate::Result;

/// A batch text-embedding backend.
///
/// `embed_batch` must return one vector per input text, in input order,
/// each of length [`Embedder::dimensions`].
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embedding dimension.
    fn dimensions(&self) -> usize;

    /// Whether the backend can currently serve requests.
    ///
    /// When false the chunker skips embedding and uses structural boundaries.
    fn is_available(&self) -> bool {
        true
    }
}

/// Cosine similarity between two vectors.
///
/// Returns `0.0` for empty vectors, vectors of different lengths, and
/// vectors with zero norm.
///
/// ```rust
/// use seams::cosine_similarity;
///
/// let a = [0.3, -1.2, 4.0];
/// assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
/// assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]), 0.0);
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a > 0.0 && norm_b > 0.0 {
        (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Cosine distance (`1 - similarity`) clamped to `[0, 1]`.
///
/// Opposed vectors are as far apart as unrelated ones for boundary purposes.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    (1.0 - cosine_similarity(a, b)).clamp(0.0, 1.0)
}

#[cfg(feature = "fastembed")]
pub use local::FastEmbedder;

#[cfg(feature = "fastembed")]
mod local {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

    use super::Embedder;
    use crate::{Error, Result};

    /// Local embedder backed by fastembed (ONNX Runtime).
    ///
    /// Inference runs on tokio's blocking pool so async callers are not
    /// stalled. The model sits behind a mutex; one batch runs at a time.
    ///
    /// ```rust,ignore
    /// use seams::FastEmbedder;
    ///
    /// // BGE-small-en v1.5, 384 dimensions; downloads on first use
    /// let embedder = FastEmbedder::new()?;
    /// ```
    pub struct FastEmbedder {
        model: Arc<Mutex<TextEmbedding>>,
        dimensions: usize,
    }

    impl FastEmbedder {
        /// Load the default model (BGE-small-en v1.5).
        ///
        /// # Errors
        ///
        /// Returns an error if the model fails to download or load.
        pub fn new() -> Result<Self> {
            Self::with_model(EmbeddingModel::BGESmallENV15, 384)
        }

        /// Load a specific fastembed model with its output dimension.
        ///
        /// # Errors
        ///
        /// Returns an error if the model fails to download or load.
        pub fn with_model(model: EmbeddingModel, dimensions: usize) -> Result<Self> {
            let model = TextEmbedding::try_new(InitOptions::new(model))
                .map_err(|e| Error::ModelLoad(e.to_string()))?;
            Ok(Self {
                model: Arc::new(Mutex::new(model)),
                dimensions,
            })
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let model = Arc::clone(&self.model);
            let texts = texts.to_vec();
            tokio::task::spawn_blocking(move || {
                #[allow(unused_mut)]
                let mut model = model
                    .lock()
                    .map_err(|e| Error::Embedding(format!("embedding model lock poisoned: {e}")))?;
                model
                    .embed(texts, None)
                    .map_err(|e| Error::Embedding(e.to_string()))
            })
            .await
            .map_err(|e| Error::Embedding(format!("embedding worker failed: {e}")))?
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }
    }

    impl std::fmt::Debug for FastEmbedder {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("FastEmbedder")
                .field("dimensions", &self.dimensions)
                .finish_non_exhaustive()
        }
    }
}
