//! Length-based token, word and sentence estimates.
//!
//! None of this is a tokenizer. Chunk sizing only needs a number that moves
//! with text length, and roughly four bytes per token holds well enough for
//! English prose fed to BPE models.
//!
//! Words and sentences use Unicode segmentation (UAX #29), which copes with
//! abbreviations, decimals and URLs better than splitting on punctuation.

use unicode_segmentation::UnicodeSegmentation;

/// Bytes per estimated token.
pub const BYTES_PER_TOKEN: usize = 4;

/// Estimate the token count of `text`.
///
/// ```rust
/// use seams::tokens::estimate_tokens;
///
/// assert_eq!(estimate_tokens(""), 0);
/// assert_eq!(estimate_tokens("abcd"), 1);
/// assert_eq!(estimate_tokens("abcde"), 2);
/// ```
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(BYTES_PER_TOKEN)
}

/// Count words using UAX #29 word boundaries.
pub fn count_words(text: &str) -> usize {
    text.unicode_words().count()
}

/// Count non-blank sentences using UAX #29 sentence boundaries.
pub fn count_sentences(text: &str) -> usize {
    text.split_sentence_bounds()
        .filter(|s| !s.trim().is_empty())
        .count()
}
