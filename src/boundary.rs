//! Boundary scoring between adjacent units.
//!
//! ## The Idea
//!
//! Adjacent units about the same topic have similar embeddings. When the
//! topic changes, similarity drops. Each gap between units gets a score:
//!
//! ```text
//! units:      [U0]   [U1]   [U2]   [U3]
//! distance:       0.12   0.08   0.61
//!                               ↑ topic shift (> threshold)
//! ```
//!
//! ## Missing Embeddings
//!
//! Very short units ("Ok.", "Thanks!") embed badly and are skipped. Gaps
//! next to them are scored with less confidence:
//!
//! | Left | Right | distance | confidence |
//! |------|-------|----------|------------|
//! | embedded | embedded | `1 - cos` | 1.0 |
//! | embedded | too short (or reverse) | `threshold` | 0.5 |
//! | too short | too short | 0.0 | 0.3 |
//!
//! A one-sided gap scores exactly `threshold`, and significance is a strict
//! `>`, so it is never a topic shift on its own.
//!
//! ## Degradation
//!
//! Embedding runs in sequential batches. A failed batch is logged and its
//! units get zero vectors; the pass continues. Only a vector of the wrong
//! dimension fails the whole pass, and the chunker then falls back to
//! [`structural_boundaries`].

use std::sync::Arc;

use serde::Serialize;

use crate::embed::{cosine_distance, Embedder};
use crate::{BoundaryDetectionOptions, EmbeddingCache, Error, Result, TokenLimits};

/// Confidence when both sides of a gap were embedded.
pub const FULL_CONFIDENCE: f32 = 1.0;
/// Confidence when one side of a gap was too short to embed.
pub const ONE_SIDED_CONFIDENCE: f32 = 0.5;
/// Confidence when neither side of a gap was embedded.
pub const BLIND_CONFIDENCE: f32 = 0.3;
/// Confidence of size-based boundaries.
pub const STRUCTURAL_CONFIDENCE: f32 = 0.5;

/// Score for the gap between unit `index` and unit `index + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundaryScore {
    /// Index of the unit before the gap.
    pub index: usize,
    /// Semantic distance in `[0, 1]`.
    pub distance: f32,
    /// Whether the gap is a topic shift.
    pub is_significant: bool,
    /// How much to trust `distance`, in `[0, 1]`.
    pub confidence: f32,
}

impl BoundaryScore {
    /// Score a gap, marking it significant when `distance > threshold`.
    pub fn new(index: usize, distance: f32, confidence: f32, threshold: f32) -> Self {
        Self {
            index,
            distance,
            is_significant: distance > threshold,
            confidence,
        }
    }

    /// `distance × confidence`, used to rank candidate splits.
    pub fn strength(&self) -> f32 {
        self.distance * self.confidence
    }
}

/// A unit's embedding, or the reason it has none.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitEmbedding {
    /// The unit was embedded (zero vector if its batch failed).
    Embedded(Vec<f32>),
    /// The unit was below the minimum length and was not embedded.
    TooShort,
}

/// Score every adjacent pair of `embeddings`.
pub fn score_boundaries(embeddings: &[UnitEmbedding], threshold: f32) -> Vec<BoundaryScore> {
    embeddings
        .windows(2)
        .enumerate()
        .map(|(index, pair)| {
            let (distance, confidence) = match (&pair[0], &pair[1]) {
                (UnitEmbedding::Embedded(a), UnitEmbedding::Embedded(b)) => {
                    (cosine_distance(a, b), FULL_CONFIDENCE)
                }
                (UnitEmbedding::Embedded(_), UnitEmbedding::TooShort)
                | (UnitEmbedding::TooShort, UnitEmbedding::Embedded(_)) => {
                    (threshold, ONE_SIDED_CONFIDENCE)
                }
                (UnitEmbedding::TooShort, UnitEmbedding::TooShort) => (0.0, BLIND_CONFIDENCE),
            };
            BoundaryScore::new(index, distance, confidence, threshold)
        })
        .collect()
}

/// Size-only boundaries for when embeddings are off or unavailable.
///
/// Walks the units summing tokens; the first gap after the running total
/// reaches 70% of the target is marked significant and the total restarts.
/// Scores use a fixed 0.5 confidence, so they never pass for semantic
/// boundaries, but the split search can run on them unchanged.
pub fn structural_boundaries(
    unit_lengths: &[usize],
    limits: &TokenLimits,
    threshold: f32,
) -> Vec<BoundaryScore> {
    let mut running = 0;
    (0..unit_lengths.len().saturating_sub(1))
        .map(|index| {
            running += unit_lengths[index];
            let is_significant = limits.reaches_soft_target(running);
            if is_significant {
                running = 0;
            }
            BoundaryScore {
                index,
                distance: if is_significant {
                    (threshold + 0.1).min(1.0)
                } else {
                    0.1
                },
                is_significant,
                confidence: STRUCTURAL_CONFIDENCE,
            }
        })
        .collect()
}

/// Embedding-based boundary detector with a per-instance cache.
///
/// ## Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use seams::{BoundaryDetector, BoundaryDetectionOptions};
///
/// let detector = BoundaryDetector::new(Arc::new(my_embedder), BoundaryDetectionOptions::default())?;
/// let scores = detector.detect_boundaries(&units).await?;
/// assert_eq!(scores.len(), units.len() - 1);
/// ```
pub struct BoundaryDetector {
    embedder: Arc<dyn Embedder>,
    options: BoundaryDetectionOptions,
    cache: EmbeddingCache,
}

impl BoundaryDetector {
    /// Create a detector.
    ///
    /// # Errors
    ///
    /// Returns an error if `options` are invalid.
    pub fn new(embedder: Arc<dyn Embedder>, options: BoundaryDetectionOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            embedder,
            options,
            cache: EmbeddingCache::new(),
        })
    }

    /// The detector's options.
    pub fn options(&self) -> &BoundaryDetectionOptions {
        &self.options
    }

    /// Whether the embedder can serve requests.
    pub fn is_available(&self) -> bool {
        self.embedder.is_available()
    }

    /// Number of cached embeddings.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop all cached embeddings.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Score the gaps between `units` using the configured threshold.
    ///
    /// Returns `units.len() - 1` scores (none for fewer than two units).
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the embedder returns a vector
    /// of the wrong length. Failed batches are not errors.
    pub async fn detect_boundaries<S>(&self, units: &[S]) -> Result<Vec<BoundaryScore>>
    where
        S: AsRef<str> + Sync,
    {
        self.detect_with_threshold(units, self.options.threshold)
            .await
    }

    /// As [`Self::detect_boundaries`], with an explicit threshold.
    ///
    /// # Errors
    ///
    /// See [`Self::detect_boundaries`].
    pub async fn detect_with_threshold<S>(
        &self,
        units: &[S],
        threshold: f32,
    ) -> Result<Vec<BoundaryScore>>
    where
        S: AsRef<str> + Sync,
    {
        if units.len() < 2 {
            return Ok(Vec::new());
        }
        let embeddings = self.embed_units(units).await?;
        Ok(score_boundaries(&embeddings, threshold))
    }

    /// Embed every unit long enough to embed.
    ///
    /// # Errors
    ///
    /// See [`Self::detect_boundaries`].
    pub async fn embed_units<S>(&self, units: &[S]) -> Result<Vec<UnitEmbedding>>
    where
        S: AsRef<str> + Sync,
    {
        let mut embeddings = vec![UnitEmbedding::TooShort; units.len()];
        let eligible: Vec<usize> = (0..units.len())
            .filter(|&i| units[i].as_ref().chars().count() >= self.options.min_unit_length)
            .collect();

        let dims = self.embedder.dimensions();
        let mut cache_hits = 0usize;
        let mut failed_batches = 0usize;

        for (batch_no, batch) in eligible.chunks(self.options.batch_size).enumerate() {
            let mut pending = Vec::with_capacity(batch.len());
            for &i in batch {
                match self.cache.get(units[i].as_ref()) {
                    Some(vector) => {
                        cache_hits += 1;
                        embeddings[i] = UnitEmbedding::Embedded(vector);
                    }
                    None => pending.push(i),
                }
            }
            if pending.is_empty() {
                continue;
            }

            let texts: Vec<String> = pending
                .iter()
                .map(|&i| units[i].as_ref().to_string())
                .collect();

            match self.embedder.embed_batch(&texts).await {
                Ok(vectors) if vectors.len() == pending.len() => {
                    for (&i, vector) in pending.iter().zip(vectors) {
                        if vector.len() != dims {
                            return Err(Error::DimensionMismatch {
                                expected: dims,
                                actual: vector.len(),
                            });
                        }
                        self.cache.insert(units[i].as_ref(), vector.clone());
                        embeddings[i] = UnitEmbedding::Embedded(vector);
                    }
                }
                Ok(vectors) => {
                    tracing::warn!(
                        batch = batch_no,
                        expected = pending.len(),
                        returned = vectors.len(),
                        "embedding batch returned wrong count, using zero vectors"
                    );
                    failed_batches += 1;
                    zero_fill(&mut embeddings, &pending, dims);
                }
                Err(e) => {
                    tracing::warn!(
                        batch = batch_no,
                        size = pending.len(),
                        error = %e,
                        "embedding batch failed, using zero vectors"
                    );
                    failed_batches += 1;
                    zero_fill(&mut embeddings, &pending, dims);
                }
            }
        }

        tracing::debug!(
            units = units.len(),
            embedded = eligible.len(),
            cache_hits,
            failed_batches,
            "embedded units"
        );
        Ok(embeddings)
    }
}

fn zero_fill(embeddings: &mut [UnitEmbedding], indices: &[usize], dims: usize) {
    for &i in indices {
        embeddings[i] = UnitEmbedding::Embedded(vec![0.0; dims]);
    }
}

impl std::fmt::Debug for BoundaryDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundaryDetector")
            .field("options", &self.options)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    /// Counts topic words: [cat, dog, fish].
    struct KeywordEmbedder {
        calls: AtomicUsize,
    }

    impl KeywordEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    ["cat", "dog", "fish"]
                        .iter()
                        .map(|k| t.matches(k).count() as f32)
                        .collect()
                })
                .collect())
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    /// Fails every batch whose first text contains "fail".
    struct FlakyEmbedder;

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if texts.iter().any(|t| t.contains("fail")) {
                return Err(Error::Embedding("service unavailable".into()));
            }
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    struct WrongDimsEmbedder;

    #[async_trait]
    impl Embedder for WrongDimsEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0; 5]).collect())
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    fn detector(embedder: impl Embedder + 'static, min_len: usize, batch: usize) -> BoundaryDetector {
        let opts = BoundaryDetectionOptions::default()
            .with_min_unit_length(min_len)
            .with_batch_size(batch);
        BoundaryDetector::new(Arc::new(embedder), opts).unwrap()
    }

    #[test]
    fn test_score_three_way() {
        let e = vec![
            UnitEmbedding::Embedded(vec![1.0, 0.0]),
            UnitEmbedding::Embedded(vec![0.0, 1.0]),
            UnitEmbedding::TooShort,
            UnitEmbedding::TooShort,
        ];
        let scores = score_boundaries(&e, 0.35);
        assert_eq!(scores.len(), 3);

        assert!((scores[0].distance - 1.0).abs() < 1e-6);
        assert_eq!(scores[0].confidence, FULL_CONFIDENCE);
        assert!(scores[0].is_significant);

        assert_eq!(scores[1].distance, 0.35);
        assert_eq!(scores[1].confidence, ONE_SIDED_CONFIDENCE);
        assert!(!scores[1].is_significant);

        assert_eq!(scores[2].distance, 0.0);
        assert_eq!(scores[2].confidence, BLIND_CONFIDENCE);
        assert!(!scores[2].is_significant);
    }

    #[test]
    fn test_structural_boundaries() {
        let limits = TokenLimits::new(0, 100, 200).unwrap();
        let scores = structural_boundaries(&[40, 40, 40, 40, 40], &limits, 0.35);
        let flags: Vec<bool> = scores.iter().map(|b| b.is_significant).collect();
        // 40, 80 (≥70) → reset, 40, 80 → reset
        assert_eq!(flags, [false, true, false, true]);
        assert!(scores.iter().all(|b| b.confidence == STRUCTURAL_CONFIDENCE));
        assert!((scores[1].distance - 0.45).abs() < 1e-6);
        assert!((scores[0].distance - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_structural_flag_independent_of_threshold() {
        let limits = TokenLimits::new(0, 100, 200).unwrap();
        let scores = structural_boundaries(&[10, 10], &limits, 0.05);
        assert!(!scores[0].is_significant);
    }

    #[tokio::test]
    async fn test_detects_topic_shift() {
        let d = detector(KeywordEmbedder::new(), 5, 32);
        let units = [
            "The cat sat with another cat.",
            "A cat chased the cat toy.",
            "The dog barked at the dog next door.",
        ];
        let scores = d.detect_boundaries(&units).await.unwrap();
        assert_eq!(scores.len(), 2);
        assert!(!scores[0].is_significant);
        assert!(scores[1].is_significant);
        assert!(scores.iter().all(|s| s.confidence == FULL_CONFIDENCE));
    }

    #[tokio::test]
    async fn test_short_middle_unit() {
        let d = detector(KeywordEmbedder::new(), 10, 32);
        let units = ["A long sentence about a cat.", "Ok.", "Another long one about a dog."];
        let scores = d.detect_boundaries(&units).await.unwrap();
        for s in &scores {
            assert_eq!(s.confidence, ONE_SIDED_CONFIDENCE);
            assert_eq!(s.distance, d.options().threshold);
            assert!(!s.is_significant);
        }
    }

    #[tokio::test]
    async fn test_cache_reuse_and_clear() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let d = BoundaryDetector::new(
            embedder.clone(),
            BoundaryDetectionOptions::default().with_min_unit_length(1),
        )
        .unwrap();
        let units = ["cat cat", "dog dog", "fish fish"];

        d.detect_boundaries(&units).await.unwrap();
        assert_eq!(d.cache_len(), 3);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);

        d.detect_boundaries(&units).await.unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1, "second pass should hit cache");

        d.clear_cache();
        assert_eq!(d.cache_len(), 0);
        d.detect_boundaries(&units).await.unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_batches_split_by_size() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let d = BoundaryDetector::new(
            embedder.clone(),
            BoundaryDetectionOptions::default()
                .with_min_unit_length(1)
                .with_batch_size(2),
        )
        .unwrap();
        let units = ["cat 1", "cat 2", "cat 3", "cat 4", "cat 5"];
        d.detect_boundaries(&units).await.unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failed_batch_degrades_to_zero_vectors() {
        let d = detector(FlakyEmbedder, 1, 2);
        let units = ["fine one", "fine two", "fail here", "fine three"];
        let embeddings = d.embed_units(&units).await.unwrap();

        assert_eq!(embeddings[0], UnitEmbedding::Embedded(vec![1.0, 0.0]));
        assert_eq!(embeddings[2], UnitEmbedding::Embedded(vec![0.0, 0.0]));
        assert_eq!(embeddings[3], UnitEmbedding::Embedded(vec![0.0, 0.0]));
        // Failures are not cached.
        assert_eq!(d.cache_len(), 2);
    }

    #[tokio::test]
    async fn test_wrong_dimension_fails_pass() {
        let d = detector(WrongDimsEmbedder, 1, 8);
        let err = d.detect_boundaries(&["one", "two"]).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 5 }));
    }

    #[tokio::test]
    async fn test_single_unit_has_no_boundaries() {
        let d = detector(KeywordEmbedder::new(), 1, 8);
        assert!(d.detect_boundaries(&["only cat"]).await.unwrap().is_empty());
    }
}
