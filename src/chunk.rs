//! The Chunk type: a span of the source with boundary and lexical metadata.

use std::collections::HashMap;

use serde::Serialize;

use crate::tokens::{count_sentences, count_words, estimate_tokens};

/// Why a chunk starts where it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryType {
    /// The preceding gap was a confident topic shift.
    Semantic,
    /// Size heuristics, a weak boundary, or the start of the text.
    Structural,
    /// Cut purely because the chunk hit its size limit.
    SizeLimit,
}

/// Counts and a lexical summary of a chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkMetadata {
    /// Sentences in the chunk.
    pub sentence_count: usize,
    /// Estimated tokens in the chunk.
    pub token_count: usize,
    /// Words in the chunk.
    pub word_count: usize,
    /// Up to five frequent content words, comma separated.
    pub topic_signature: String,
    /// Distance of the boundary that opened this chunk, if scored.
    pub semantic_distance: Option<f32>,
}

impl ChunkMetadata {
    /// Compute metadata for `text`.
    pub fn from_text(text: &str, semantic_distance: Option<f32>) -> Self {
        Self {
            sentence_count: count_sentences(text),
            token_count: estimate_tokens(text),
            word_count: count_words(text),
            topic_signature: topic_signature(text),
            semantic_distance,
        }
    }
}

/// A chunk of text with its position in the original document.
///
/// ## Byte Offsets
///
/// `start_offset` and `end_offset` are byte offsets into the original
/// text. The chunk `text` is the chunk's units joined by blank lines, so it
/// matches `&source[start_offset..end_offset]` only up to whitespace, and
/// not at all for HTML input.
///
/// ```rust
/// use seams::{BoundaryType, Chunk, ChunkMetadata};
///
/// let text = "Hello, world!";
/// let meta = ChunkMetadata::from_text("world", None);
/// let chunk = Chunk::new("world", 7, 12, 0, BoundaryType::Structural, meta);
///
/// assert_eq!(&text[chunk.span()], "world");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    /// The chunk text.
    pub text: String,
    /// Byte offset where this chunk starts in the original document.
    pub start_offset: usize,
    /// Byte offset where this chunk ends (exclusive) in the original document.
    pub end_offset: usize,
    /// Zero-based index of this chunk in the sequence.
    pub chunk_index: usize,
    /// How the chunk's start boundary was chosen.
    pub boundary_type: BoundaryType,
    /// Counts and topic signature.
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(
        text: impl Into<String>,
        start_offset: usize,
        end_offset: usize,
        chunk_index: usize,
        boundary_type: BoundaryType,
        metadata: ChunkMetadata,
    ) -> Self {
        Self {
            text: text.into(),
            start_offset,
            end_offset,
            chunk_index,
            boundary_type,
            metadata,
        }
    }

    /// The length of this chunk's text in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether this chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The byte span of this chunk in the original document.
    pub fn span(&self) -> std::ops::Range<usize> {
        self.start_offset..self.end_offset
    }
}

impl std::fmt::Display for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunk {{ index: {}, span: {}..{}, tokens: {}, boundary: {:?} }}",
            self.chunk_index,
            self.start_offset,
            self.end_offset,
            self.metadata.token_count,
            self.boundary_type
        )
    }
}

/// Words ignored by [`topic_signature`] (only those over three letters matter).
const STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "also", "because", "been", "before", "being",
    "below", "between", "both", "could", "does", "doing", "down", "during", "each", "even",
    "every", "from", "further", "have", "having", "here", "hers", "herself", "himself", "into",
    "itself", "just", "like", "made", "make", "many", "more", "most", "much", "must", "myself",
    "never", "only", "other", "ours", "ourselves", "over", "same", "should", "some", "such",
    "than", "that", "their", "theirs", "them", "themselves", "then", "there", "these", "they",
    "this", "those", "through", "under", "until", "very", "want", "well", "were", "what",
    "when", "where", "which", "while", "will", "with", "within", "without", "would", "your",
    "yours", "yourself", "yourselves",
];

/// Number of words in a topic signature.
pub const SIGNATURE_WORDS: usize = 5;

/// The five most frequent content words of `text`, joined by `", "`.
///
/// Text is lowercased and stripped of punctuation; stop words and words of
/// three characters or fewer are dropped. Ties keep first-seen order.
///
/// ```rust
/// use seams::topic_signature;
///
/// let sig = topic_signature("Rust ownership: ownership rules, borrowing and the borrow checker.");
/// assert_eq!(sig, "ownership, rust, rules, borrowing, borrow");
/// ```
pub fn topic_signature(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in cleaned.split_whitespace() {
        if word.chars().count() <= 3 || STOP_WORDS.contains(&word) {
            continue;
        }
        let count = counts.entry(word).or_insert(0);
        if *count == 0 {
            order.push(word);
        }
        *count += 1;
    }

    // Stable sort keeps first-seen order among equal counts.
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.truncate(SIGNATURE_WORDS);
    order.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_frequency_then_order() {
        let sig = topic_signature("cats cats dogs birds birds birds fish");
        assert_eq!(sig, "birds, cats, dogs, fish");
    }

    #[test]
    fn test_signature_filters() {
        // "the", "cat" too short; "would" and "about" are stop words.
        let sig = topic_signature("The cat would talk about talking. Talk!");
        assert_eq!(sig, "talk, talking");
    }

    #[test]
    fn test_signature_top_five() {
        let sig = topic_signature("alpha bravo charlie delta echoes foxtrot alpha");
        assert_eq!(sig, "alpha, bravo, charlie, delta, echoes");
    }

    #[test]
    fn test_signature_empty() {
        assert_eq!(topic_signature(""), "");
        assert_eq!(topic_signature("a an the of"), "");
    }

    #[test]
    fn test_metadata_counts() {
        let meta = ChunkMetadata::from_text("One sentence here. Another one follows.", Some(0.4));
        assert_eq!(meta.sentence_count, 2);
        assert_eq!(meta.word_count, 6);
        assert_eq!(meta.token_count, 10);
        assert_eq!(meta.semantic_distance, Some(0.4));
    }

    #[test]
    fn test_chunk_span() {
        let chunk = Chunk::new(
            "abc",
            2,
            5,
            0,
            BoundaryType::Structural,
            ChunkMetadata::from_text("abc", None),
        );
        assert_eq!(chunk.span(), 2..5);
        assert_eq!(chunk.len(), 3);
        assert!(!chunk.is_empty());
    }
}
