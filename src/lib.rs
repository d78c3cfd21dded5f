//! # seams
//!
//! Content-aware semantic chunking for retrieval pipelines.
//!
//! ## The Problem
//!
//! Documents have to be cut into pieces small enough to embed and
//! retrieve. Cutting every N tokens splits arguments in half. Cutting on
//! every topic shift gives chunks of wildly different sizes. And some
//! content must not be cut at all:
//!
//! - A code block split mid-function is useless
//! - A table split mid-row loses its header
//! - A conversation split mid-turn loses who said what
//!
//! ## The Approach
//!
//! Chunking runs in three stages:
//!
//! 1. **Units.** The text is split into the smallest pieces a chunk may
//!    start or end at, chosen by format: conversation turns, markdown
//!    sections, paragraphs, sentences. See [`split_units`].
//! 2. **Boundaries.** Each gap between adjacent units is scored. With an
//!    [`Embedder`], the score is the cosine distance between the units'
//!    embeddings; without one, gaps are scored by accumulated size alone.
//!    See [`BoundaryDetector`] and [`structural_boundaries`].
//! 3. **Splits.** A greedy pass groups units into chunks, taking topic
//!    shifts once a chunk is big enough and the strongest boundary seen
//!    when it grows too big. See [`plan_splits`].
//!
//! ```text
//! units:     [U0]  [U1]  [U2]  [U3]  [U4]  [U5]
//! distance:     0.1   0.2   0.7   0.1   0.2
//!                           ↑ topic shift
//! chunks:    [U0 U1 U2] | [U3 U4 U5]
//! ```
//!
//! Separately, [`ContentAnalyzer`] classifies a document into typed
//! segments (prose, code, math, table, list, heading) that exactly cover
//! the input.
//!
//! ## Quick Start
//!
//! ```rust
//! use seams::{ChunkingOptions, ContentFormat, SemanticChunker};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let chunker = SemanticChunker::new(ChunkingOptions::default()).unwrap();
//! let result = chunker.chunk("# Title\n\nA short document.", ContentFormat::Markdown).await;
//!
//! assert_eq!(result.total_chunks, 1);
//! # });
//! ```
//!
//! ## Semantic Boundaries
//!
//! Attach any [`Embedder`] to get topic-aware splits. The `fastembed`
//! feature provides a local ONNX backend:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use seams::{ChunkingOptions, FastEmbedder, SemanticChunker};
//!
//! let chunker = SemanticChunker::new(ChunkingOptions::default())?
//!     .with_embedder(Arc::new(FastEmbedder::new()?))?;
//! let result = chunker.chunk(long_document, ContentFormat::Markdown).await;
//! ```
//!
//! Embedding failures never fail chunking. A failed batch is scored as
//! zero vectors, and a failed pass falls back to size-based boundaries.
//!
//! ## Sizes
//!
//! All sizes are estimated tokens (bytes / 4, rounded up). A chunk may
//! exceed `max_tokens` by at most one unit; a single unit larger than
//! `max_tokens` becomes a chunk of its own.

mod analyzer;
mod boundary;
mod cache;
mod chunk;
mod chunker;
mod embed;
mod error;
mod options;
mod split;
pub mod tokens;
mod units;

pub use analyzer::{dominant_type, ContentAnalyzer, ContentSegment, SegmentType};
pub use boundary::{
    score_boundaries, structural_boundaries, BoundaryDetector, BoundaryScore, UnitEmbedding,
    BLIND_CONFIDENCE, FULL_CONFIDENCE, ONE_SIDED_CONFIDENCE, STRUCTURAL_CONFIDENCE,
};
pub use cache::{EmbeddingCache, KEY_PREFIX_CHARS};
pub use chunk::{topic_signature, BoundaryType, Chunk, ChunkMetadata, SIGNATURE_WORDS};
pub use chunker::{
    BoundaryStats, ChunkingResult, ChunkingStrategy, SemanticChunker, SourceStats,
    MIN_OVERLAP_CHARS, SEMANTIC_CONFIDENCE, UNIT_SEPARATOR,
};
pub use embed::{cosine_distance, cosine_similarity, Embedder};
pub use error::{Error, Result};
pub use options::{
    BoundaryDetectionOptions, ChunkingOptions, TokenLimits, FORCE_SPLIT_RATIO, SOFT_SPLIT_RATIO,
};
pub use split::{find_split_points, plan_splits, SplitPoint, SplitReason};
pub use units::{
    split_units, strip_html, ContentFormat, Unit, PARAGRAPH_MAX_TOKENS, SECTION_MAX_TOKENS,
    TURN_MARKERS,
};

#[cfg(feature = "fastembed")]
pub use embed::FastEmbedder;
