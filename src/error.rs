//! Error types for seams.
//!
//! Chunking itself never fails at runtime: embedding problems degrade to
//! zero vectors or structural boundaries. Errors surface only when options
//! are invalid or when a detector pass is asked for directly.

/// Errors that can occur while configuring or running a chunker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A size or count that must be positive was zero.
    #[error("invalid {name}: {value} (must be > 0)")]
    ZeroSize {
        /// Which option was zero.
        name: &'static str,
        /// The offending value.
        value: usize,
    },

    /// Token limits are not ordered `min <= target <= max`.
    #[error("token limits out of order: min {min}, target {target}, max {max}")]
    LimitsOutOfOrder {
        /// Minimum tokens per chunk.
        min: usize,
        /// Target tokens per chunk.
        target: usize,
        /// Maximum tokens per chunk.
        max: usize,
    },

    /// A threshold fell outside `[0, 1]`.
    #[error("threshold {0} outside [0, 1]")]
    ThresholdOutOfRange(f32),

    /// The embedding backend reported an error.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// An embedding came back with the wrong number of dimensions.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the embedder advertised.
        expected: usize,
        /// Dimension actually returned.
        actual: usize,
    },

    /// The local embedding model could not be loaded.
    #[error("failed to load embedding model: {0}")]
    ModelLoad(String),
}

/// Result type for seams operations.
pub type Result<T> = std::result::Result<T, Error>;
