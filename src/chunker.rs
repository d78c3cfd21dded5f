//! Content-aware chunking: units, boundaries, splits, chunks.
//!
//! ## Pipeline
//!
//! ```text
//! text ──split_units(format)──► units ──detector or sizes──► boundary scores
//!                                                               │
//! chunks ◄──overlap + metadata── groups ◄──plan_splits(limits)──┘
//! ```
//!
//! Text whose estimate already fits in `max_tokens` is returned whole.
//! Otherwise the text is cut into units, each gap between units is scored,
//! and the split planner groups units into chunks.
//!
//! ## Degradation
//!
//! Chunking never fails once the chunker is built. Without an embedder,
//! with semantic boundaries disabled, or when detection fails, gaps are
//! scored by size alone ([`structural_boundaries`]) and the same planner
//! runs on them. Only the chunk boundary types and
//! [`ChunkingResult::strategy`] tell the two paths apart.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use regex::Regex;
use serde::Serialize;

use crate::tokens::{count_words, estimate_tokens, BYTES_PER_TOKEN};
use crate::{
    plan_splits, split_units, structural_boundaries, BoundaryDetectionOptions, BoundaryDetector,
    BoundaryScore, BoundaryType, Chunk, ChunkMetadata, ChunkingOptions, ContentFormat, Embedder,
    Result, SplitReason, TokenLimits, Unit,
};

/// Separator placed between units inside a chunk, and before overlap.
pub const UNIT_SEPARATOR: &str = "\n\n";

/// Overlap of this many characters or fewer is dropped.
pub const MIN_OVERLAP_CHARS: usize = 20;

/// Confidence a significant boundary needs to count as semantic.
pub const SEMANTIC_CONFIDENCE: f32 = 0.7;

/// Which path produced the chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// The text fit in one chunk.
    Single,
    /// Boundaries came from embeddings.
    Semantic,
    /// Boundaries came from unit sizes.
    Structural,
}

/// Size of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SourceStats {
    /// Characters in the input.
    pub chars: usize,
    /// Estimated tokens in the input.
    pub tokens: usize,
    /// Words in the input.
    pub words: usize,
    /// Units the input was split into.
    pub units: usize,
}

/// Summary of the boundary scores the splits were planned on.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BoundaryStats {
    /// Gaps scored.
    pub computed: usize,
    /// Gaps marked significant.
    pub significant: usize,
    /// Mean distance over all gaps (0 when there are none).
    pub mean_distance: f32,
}

impl BoundaryStats {
    fn from_scores(scores: &[BoundaryScore]) -> Self {
        let computed = scores.len();
        let mean_distance = if computed == 0 {
            0.0
        } else {
            scores.iter().map(|b| b.distance).sum::<f32>() / computed as f32
        };
        Self {
            computed,
            significant: scores.iter().filter(|b| b.is_significant).count(),
            mean_distance,
        }
    }
}

/// Chunks plus how they were produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkingResult {
    /// The chunks, in document order.
    pub chunks: Vec<Chunk>,
    /// `chunks.len()`.
    pub total_chunks: usize,
    /// Which path produced the chunks.
    pub strategy: ChunkingStrategy,
    /// Size of the input.
    pub source: SourceStats,
    /// Boundary scores summary.
    pub boundaries: BoundaryStats,
    /// Wall time spent chunking.
    pub elapsed: Duration,
}

/// Splits documents into topic-coherent chunks within token bounds.
///
/// ## Example
///
/// ```rust
/// use seams::{ChunkingOptions, ContentFormat, SemanticChunker};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let options = ChunkingOptions::default().with_token_limits(10, 40, 80);
/// let chunker = SemanticChunker::new(options).unwrap();
///
/// let text = "First paragraph about one thing entirely. ".repeat(8)
///     + "\n\n"
///     + &"Second paragraph about another thing. ".repeat(8);
/// let result = chunker.chunk(&text, ContentFormat::Default).await;
///
/// assert!(result.total_chunks > 1);
/// # });
/// ```
#[derive(Debug)]
pub struct SemanticChunker {
    options: ChunkingOptions,
    limits: TokenLimits,
    detector: Option<BoundaryDetector>,
}

impl SemanticChunker {
    /// Create a chunker without an embedder; boundaries are structural.
    ///
    /// # Errors
    ///
    /// Returns an error if `options` are invalid.
    pub fn new(options: ChunkingOptions) -> Result<Self> {
        options.validate()?;
        let limits = options.limits()?;
        Ok(Self {
            options,
            limits,
            detector: None,
        })
    }

    /// Use `detector` for semantic boundaries.
    #[must_use]
    pub fn with_detector(mut self, detector: BoundaryDetector) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Use `embedder` for semantic boundaries, with default detection options.
    ///
    /// # Errors
    ///
    /// Returns an error if the detector options derived from this chunker's
    /// options are invalid.
    pub fn with_embedder(self, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let options =
            BoundaryDetectionOptions::default().with_threshold(self.options.semantic_threshold);
        let detector = BoundaryDetector::new(embedder, options)?;
        Ok(self.with_detector(detector))
    }

    /// The chunker's options.
    pub fn options(&self) -> &ChunkingOptions {
        &self.options
    }

    /// The boundary detector, if one is configured.
    pub fn detector(&self) -> Option<&BoundaryDetector> {
        self.detector.as_ref()
    }

    /// Drop the detector's cached embeddings.
    pub fn clear_cache(&self) {
        if let Some(detector) = &self.detector {
            detector.clear_cache();
        }
    }

    /// Split `text` into chunks.
    ///
    /// Empty text gives no chunks. Text estimated at or under `max_tokens`
    /// comes back as one chunk.
    pub async fn chunk(&self, text: &str, format: ContentFormat) -> ChunkingResult {
        let started = Instant::now();
        let mut source = SourceStats {
            chars: text.chars().count(),
            tokens: estimate_tokens(text),
            words: count_words(text),
            units: 0,
        };

        if text.is_empty() {
            return finish(Vec::new(), ChunkingStrategy::Single, source, &[], started);
        }

        if source.tokens <= self.limits.max() {
            source.units = 1;
            let chunk = Chunk::new(
                text,
                0,
                text.len(),
                0,
                BoundaryType::Structural,
                ChunkMetadata::from_text(text, None),
            );
            return finish(vec![chunk], ChunkingStrategy::Single, source, &[], started);
        }

        let units = split_units(text, format);
        source.units = units.len();
        let lengths = planned_lengths(&units);

        let (scores, strategy) = self.score(&units, &lengths).await;
        let splits = plan_splits(&scores, &lengths, self.limits);
        tracing::debug!(
            format = %format,
            units = units.len(),
            splits = splits.len(),
            strategy = ?strategy,
            "planned chunk splits"
        );

        let mut chunks = assemble(&units, &scores, &splits);
        if self.options.overlap_tokens > 0 {
            add_overlap(&mut chunks, text, self.options.overlap_tokens);
        }

        finish(chunks, strategy, source, &scores, started)
    }

    async fn score(
        &self,
        units: &[Unit],
        lengths: &[usize],
    ) -> (Vec<BoundaryScore>, ChunkingStrategy) {
        let threshold = self.options.semantic_threshold;
        if self.options.use_semantic_boundaries {
            if let Some(detector) = self.detector.as_ref().filter(|d| d.is_available()) {
                match detector.detect_with_threshold(units, threshold).await {
                    Ok(scores) => return (scores, ChunkingStrategy::Semantic),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "boundary detection failed, using structural boundaries"
                        );
                    }
                }
            }
        }
        (
            structural_boundaries(lengths, &self.limits, threshold),
            ChunkingStrategy::Structural,
        )
    }
}

fn finish(
    chunks: Vec<Chunk>,
    strategy: ChunkingStrategy,
    source: SourceStats,
    scores: &[BoundaryScore],
    started: Instant,
) -> ChunkingResult {
    ChunkingResult {
        total_chunks: chunks.len(),
        chunks,
        strategy,
        source,
        boundaries: BoundaryStats::from_scores(scores),
        elapsed: started.elapsed(),
    }
}

/// Token sizes the split planner works with.
///
/// Each unit is sized together with the separator that joins it to its
/// neighbour, so a group's total never undercounts its assembled text.
fn planned_lengths(units: &[Unit]) -> Vec<usize> {
    units
        .iter()
        .map(|u| (u.text.len() + UNIT_SEPARATOR.len()).div_ceil(BYTES_PER_TOKEN))
        .collect()
}

/// Group `units` into chunks at `splits`.
fn assemble(
    units: &[Unit],
    scores: &[BoundaryScore],
    splits: &[crate::SplitPoint],
) -> Vec<Chunk> {
    let mut starts = Vec::with_capacity(splits.len() + 1);
    starts.push((0, None));
    starts.extend(splits.iter().map(|p| (p.index, Some(p.reason))));

    let mut chunks = Vec::with_capacity(starts.len());
    for (n, &(start, reason)) in starts.iter().enumerate() {
        let end = starts.get(n + 1).map_or(units.len(), |&(next, _)| next);
        let group = &units[start..end];
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };

        let text = group
            .iter()
            .map(|u| u.text.as_str())
            .collect::<Vec<_>>()
            .join(UNIT_SEPARATOR);

        // scores[start - 1] is the gap this chunk opens on.
        let opening = start.checked_sub(1).and_then(|gap| scores.get(gap));
        let boundary_type = match (reason, opening) {
            (Some(SplitReason::Forced), _) => BoundaryType::SizeLimit,
            (Some(_), Some(b)) if b.is_significant && b.confidence > SEMANTIC_CONFIDENCE => {
                BoundaryType::Semantic
            }
            _ => BoundaryType::Structural,
        };

        let metadata = ChunkMetadata::from_text(&text, opening.map(|b| b.distance));
        chunks.push(Chunk::new(
            text,
            first.start,
            last.end,
            chunks.len(),
            boundary_type,
            metadata,
        ));
    }
    chunks
}

fn sentence_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").expect("valid regex"))
}

/// Prepend the tail of each previous chunk to the next one.
///
/// The tail is at most `overlap_tokens * BYTES_PER_TOKEN` characters,
/// advanced past the first sentence end inside it so it starts on a
/// sentence. Tails of `MIN_OVERLAP_CHARS` characters or fewer are skipped.
/// Each chunk's overlap comes from the previous chunk after that chunk
/// received its own overlap.
fn add_overlap(chunks: &mut [Chunk], source: &str, overlap_tokens: usize) {
    let budget = overlap_tokens.saturating_mul(BYTES_PER_TOKEN);
    if budget == 0 {
        return;
    }
    for i in 1..chunks.len() {
        let (done, rest) = chunks.split_at_mut(i);
        let prev = &done[i - 1];
        let current = &mut rest[0];

        let from = prev
            .text
            .char_indices()
            .nth_back(budget - 1)
            .map_or(0, |(at, _)| at);
        let mut tail = &prev.text[from..];
        if let Some(m) = sentence_end().find(tail) {
            tail = &tail[m.end()..];
        }
        let tail = tail.trim();
        if tail.chars().count() <= MIN_OVERLAP_CHARS {
            continue;
        }

        current.text = format!("{tail}{UNIT_SEPARATOR}{}", current.text);
        let shifted = prev.end_offset.saturating_sub(tail.len());
        current.start_offset =
            floor_char_boundary(source, current.start_offset.min(shifted));
        current.metadata.token_count = estimate_tokens(&current.text);
    }
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}
