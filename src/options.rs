//! Chunk size bounds and detector configuration.
//!
//! ## Three Numbers, Not One
//!
//! A single chunk size forces a choice between splitting mid-topic and
//! overshooting. Semantic chunking needs room to wait for a good boundary,
//! so sizes come as a band:
//!
//! - `min`: never cut a chunk shorter than this at a semantic boundary.
//! - `target`: where topic shifts start being accepted (at 70% of it).
//! - `max`: once a chunk reaches 90% of it, the best boundary seen so far
//!   is taken, or the chunk is cut outright.
//!
//! ```text
//! tokens:  0 ........ min ...... 0.7·target ...... 0.9·max ... max
//!          |  no split  |  no split  | split on topic shift | forced
//! ```
//!
//! All sizes are estimated tokens (see [`crate::tokens`]).

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Fraction of `max` at which a split is forced.
pub const FORCE_SPLIT_RATIO: f64 = 0.9;

/// Fraction of `target` a chunk must reach before a topic shift may end it.
pub const SOFT_SPLIT_RATIO: f64 = 0.7;

/// Validated `min <= target <= max` token bounds.
///
/// # Examples
///
/// ```rust
/// use seams::TokenLimits;
///
/// let limits = TokenLimits::new(100, 500, 1000).unwrap();
/// assert_eq!(limits.target(), 500);
/// assert!(limits.must_split(900));
/// assert!(!limits.must_split(899));
/// assert!(limits.may_split(350));
///
/// assert!(TokenLimits::new(600, 500, 1000).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLimits {
    min: usize,
    target: usize,
    max: usize,
}

impl TokenLimits {
    /// Create token limits.
    ///
    /// # Errors
    ///
    /// Returns an error if `max` or `target` is zero, or the bounds are not
    /// ordered `min <= target <= max`.
    pub fn new(min: usize, target: usize, max: usize) -> Result<Self> {
        if max == 0 {
            return Err(Error::ZeroSize { name: "max_tokens", value: max });
        }
        if target == 0 {
            return Err(Error::ZeroSize { name: "target_tokens", value: target });
        }
        if min > target || target > max {
            return Err(Error::LimitsOutOfOrder { min, target, max });
        }
        Ok(Self { min, target, max })
    }

    /// Minimum tokens before a semantic split is allowed.
    #[must_use]
    pub const fn min(&self) -> usize {
        self.min
    }

    /// Target chunk size.
    #[must_use]
    pub const fn target(&self) -> usize {
        self.target
    }

    /// Maximum chunk size.
    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Whether `tokens` has reached the forced-split zone (90% of max).
    #[must_use]
    pub fn must_split(&self, tokens: usize) -> bool {
        tokens as f64 >= self.max as f64 * FORCE_SPLIT_RATIO
    }

    /// Whether a chunk of `tokens` is large enough to end at a topic shift.
    #[must_use]
    pub fn may_split(&self, tokens: usize) -> bool {
        tokens >= self.min && self.reaches_soft_target(tokens)
    }

    /// Whether `tokens` has reached 70% of the target.
    #[must_use]
    pub fn reaches_soft_target(&self, tokens: usize) -> bool {
        tokens as f64 >= self.target as f64 * SOFT_SPLIT_RATIO
    }
}

impl Default for TokenLimits {
    fn default() -> Self {
        Self {
            min: 100,
            target: 500,
            max: 1000,
        }
    }
}

/// Options for [`crate::SemanticChunker`].
///
/// Deserializes with defaults for missing fields, so it can sit inside a
/// host application's config file:
///
/// ```rust
/// use seams::ChunkingOptions;
///
/// let opts = ChunkingOptions::default()
///     .with_token_limits(50, 200, 400)
///     .with_overlap_tokens(20);
/// assert_eq!(opts.max_tokens, 400);
/// assert!(opts.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingOptions {
    /// Minimum tokens before a semantic split is allowed.
    pub min_tokens: usize,
    /// Maximum tokens per chunk (soft: may overflow by one unit).
    pub max_tokens: usize,
    /// Preferred chunk size.
    pub target_tokens: usize,
    /// Tokens of trailing context copied from the previous chunk.
    pub overlap_tokens: usize,
    /// Distance above which a boundary counts as a topic shift.
    pub semantic_threshold: f32,
    /// Use embeddings to find boundaries when an embedder is available.
    pub use_semantic_boundaries: bool,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        let limits = TokenLimits::default();
        Self {
            min_tokens: limits.min,
            max_tokens: limits.max,
            target_tokens: limits.target,
            overlap_tokens: 0,
            semantic_threshold: 0.35,
            use_semantic_boundaries: true,
        }
    }
}

impl ChunkingOptions {
    /// Set min/target/max token bounds.
    #[must_use]
    pub fn with_token_limits(mut self, min: usize, target: usize, max: usize) -> Self {
        self.min_tokens = min;
        self.target_tokens = target;
        self.max_tokens = max;
        self
    }

    /// Set the overlap in tokens.
    #[must_use]
    pub fn with_overlap_tokens(mut self, overlap: usize) -> Self {
        self.overlap_tokens = overlap;
        self
    }

    /// Set the semantic significance threshold.
    #[must_use]
    pub fn with_semantic_threshold(mut self, threshold: f32) -> Self {
        self.semantic_threshold = threshold;
        self
    }

    /// Enable or disable embedding-based boundaries.
    #[must_use]
    pub fn with_semantic_boundaries(mut self, enabled: bool) -> Self {
        self.use_semantic_boundaries = enabled;
        self
    }

    /// The validated token limits.
    ///
    /// # Errors
    ///
    /// See [`TokenLimits::new`].
    pub fn limits(&self) -> Result<TokenLimits> {
        TokenLimits::new(self.min_tokens, self.target_tokens, self.max_tokens)
    }

    /// Check every option.
    ///
    /// # Errors
    ///
    /// Returns an error for out-of-order limits or a threshold outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        self.limits()?;
        check_threshold(self.semantic_threshold)
    }
}

/// Options for [`crate::BoundaryDetector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryDetectionOptions {
    /// Distance above which a boundary is significant.
    pub threshold: f32,
    /// Units shorter than this (in chars) are not embedded.
    pub min_unit_length: usize,
    /// Texts per embedding request.
    pub batch_size: usize,
}

impl Default for BoundaryDetectionOptions {
    fn default() -> Self {
        Self {
            threshold: 0.35,
            min_unit_length: 20,
            batch_size: 32,
        }
    }
}

impl BoundaryDetectionOptions {
    /// Set the significance threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the minimum unit length in chars.
    #[must_use]
    pub fn with_min_unit_length(mut self, len: usize) -> Self {
        self.min_unit_length = len;
        self
    }

    /// Set the embedding batch size.
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Check every option.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero batch size or a threshold outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::ZeroSize { name: "batch_size", value: 0 });
        }
        check_threshold(self.threshold)
    }
}

fn check_threshold(threshold: f32) -> Result<()> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(Error::ThresholdOutOfRange(threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_ordering() {
        assert!(TokenLimits::new(10, 20, 30).is_ok());
        assert!(TokenLimits::new(10, 10, 10).is_ok());
        assert!(matches!(
            TokenLimits::new(30, 20, 40),
            Err(Error::LimitsOutOfOrder { .. })
        ));
        assert!(matches!(
            TokenLimits::new(0, 50, 40),
            Err(Error::LimitsOutOfOrder { .. })
        ));
        assert!(matches!(
            TokenLimits::new(0, 0, 40),
            Err(Error::ZeroSize { name: "target_tokens", .. })
        ));
    }

    #[test]
    fn test_thresholds() {
        let limits = TokenLimits::new(10, 100, 200).unwrap();
        assert!(!limits.must_split(179));
        assert!(limits.must_split(180));
        assert!(!limits.may_split(69));
        assert!(limits.may_split(70));

        // min dominates when it is above 70% of target
        let limits = TokenLimits::new(90, 100, 200).unwrap();
        assert!(!limits.may_split(80));
        assert!(limits.may_split(90));
    }

    #[test]
    fn test_default_options_validate() {
        assert!(ChunkingOptions::default().validate().is_ok());
        assert!(BoundaryDetectionOptions::default().validate().is_ok());
    }

    #[test]
    fn test_bad_threshold() {
        let opts = ChunkingOptions::default().with_semantic_threshold(1.5);
        assert!(matches!(opts.validate(), Err(Error::ThresholdOutOfRange(_))));
    }

    #[test]
    fn test_zero_batch_size() {
        let opts = BoundaryDetectionOptions::default().with_batch_size(0);
        assert!(opts.validate().is_err());
    }
}
