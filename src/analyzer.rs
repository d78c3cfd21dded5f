//! Content analysis: split text into typed regions.
//!
//! Long-form text mixes prose with structure that must not be cut or
//! embedded like prose: fenced code, display math, tables, lists. The
//! analyzer finds those regions and fills everything between them with
//! prose, so callers get a complete typed map of the input.
//!
//! ## Detection Order
//!
//! Detectors run in a fixed order and, where regions overlap, the one that
//! starts first wins and swallows the other. At equal starts the earlier
//! detector wins:
//!
//! ```text
//! code fence > math ($$ or \begin{..}) > table > heading > list
//! ```
//!
//! This precedence is [`SegmentType::priority`]; it is not re-derived from
//! call order anywhere.
//!
//! ## Partition Invariant
//!
//! The returned segments tile `[0, text.len())` with no gaps and no
//! overlaps. Whitespace-only gaps between regions are not emitted as prose;
//! they are absorbed into the preceding segment (or the following one, at the
//! start of the text) so the tiling stays exact.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The kind of a content region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentType {
    /// Running text.
    Prose,
    /// Fenced code block.
    Code,
    /// Display math or a LaTeX environment.
    Math,
    /// Markdown pipe table.
    Table,
    /// Bullet or numbered list.
    List,
    /// `#` heading line.
    Heading,
}

impl SegmentType {
    /// Merge precedence: lower wins when two regions start at the same offset.
    ///
    /// Display math and LaTeX environments are both `Math` and share a level.
    pub const fn priority(self) -> u8 {
        match self {
            Self::Code => 0,
            Self::Math => 1,
            Self::Table => 2,
            Self::Heading => 3,
            Self::List => 4,
            Self::Prose => u8::MAX,
        }
    }

    /// Whether splitting inside this region would corrupt it.
    pub const fn is_atomic(self) -> bool {
        matches!(self, Self::Code | Self::Math | Self::Table)
    }
}

/// A typed region of the input, `content == &text[start_offset..end_offset]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSegment {
    /// Region kind.
    #[serde(rename = "type")]
    pub kind: SegmentType,
    /// The region text.
    pub content: String,
    /// Byte offset of the region start.
    pub start_offset: usize,
    /// Byte offset one past the region end.
    pub end_offset: usize,
    /// Code fence language tag, if any.
    pub language: Option<String>,
}

impl ContentSegment {
    /// The byte span of this segment.
    pub fn span(&self) -> std::ops::Range<usize> {
        self.start_offset..self.end_offset
    }
}

/// A detected region before gap filling.
#[derive(Debug, Clone)]
struct Region {
    kind: SegmentType,
    start: usize,
    end: usize,
    language: Option<String>,
}

/// Segments text into typed regions.
///
/// ## Example
///
/// ```rust
/// use seams::{ContentAnalyzer, SegmentType};
///
/// let text = "Intro text.\n\n```rust\nfn main() {}\n```\n\nOutro.";
/// let segments = ContentAnalyzer::new().analyze(text);
///
/// let kinds: Vec<_> = segments.iter().map(|s| s.kind).collect();
/// assert_eq!(kinds, [SegmentType::Prose, SegmentType::Code, SegmentType::Prose]);
/// assert_eq!(segments[1].language.as_deref(), Some("rust"));
/// assert_eq!(segments.last().unwrap().end_offset, text.len());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentAnalyzer;

impl ContentAnalyzer {
    /// Create an analyzer.
    pub const fn new() -> Self {
        Self
    }

    /// Split `text` into ordered segments tiling the whole input.
    pub fn analyze(&self, text: &str) -> Vec<ContentSegment> {
        if text.is_empty() {
            return Vec::new();
        }

        let regions = merge_regions(self.detect(text));
        if regions.is_empty() {
            return vec![segment(text, SegmentType::Prose, 0, text.len(), None)];
        }

        fill_gaps(text, regions)
    }

    /// Detect structural regions only (no prose), merged and sorted.
    ///
    /// Used by unit splitting to keep headings and paragraph breaks inside
    /// code or math from being treated as structure.
    pub fn regions(&self, text: &str) -> Vec<(SegmentType, std::ops::Range<usize>)> {
        merge_regions(self.detect(text))
            .into_iter()
            .map(|r| (r.kind, r.start..r.end))
            .collect()
    }

    fn detect(&self, text: &str) -> Vec<Region> {
        let mut regions = Vec::new();
        detect_code_fences(text, &mut regions);
        detect_display_math(text, &mut regions);
        detect_latex_environments(text, &mut regions);
        detect_line_blocks(text, table_row(), SegmentType::Table, 2, &mut regions);
        detect_headings(text, &mut regions);
        detect_line_blocks(text, list_item(), SegmentType::List, 1, &mut regions);
        regions
    }
}

/// The segment type covering the most bytes, if any.
pub fn dominant_type(segments: &[ContentSegment]) -> Option<SegmentType> {
    let mut totals: Vec<(SegmentType, usize)> = Vec::new();
    for seg in segments {
        let len = seg.end_offset - seg.start_offset;
        match totals.iter_mut().find(|(kind, _)| *kind == seg.kind) {
            Some((_, total)) => *total += len,
            None => totals.push((seg.kind, len)),
        }
    }
    // max_by_key keeps the last maximum; reverse so the first-seen type wins ties
    totals
        .into_iter()
        .rev()
        .max_by_key(|(_, total)| *total)
        .map(|(kind, _)| kind)
}

fn code_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?ms)^[ \t]*```([^\n`]*)\n.*?^[ \t]*```[^\n]*$").expect("valid regex")
    })
}

fn display_math() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\$\$.+?\$\$|\\\[.+?\\\]").expect("valid regex"))
}

fn latex_begin() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\\begin\{([^}\n]+)\}").expect("valid regex"))
}

fn table_row() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[ \t]*\|.*\|[ \t]*$").expect("valid regex"))
}

fn heading_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^#{1,6}[ \t]+[^\n]*$").expect("valid regex"))
}

fn list_item() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[ \t]*(?:[-*+]|\d+[.)])[ \t]+\S").expect("valid regex"))
}

fn detect_code_fences(text: &str, out: &mut Vec<Region>) {
    for caps in code_fence().captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let language = caps
            .get(1)
            .and_then(|m| m.as_str().split_whitespace().next())
            .map(str::to_string);
        out.push(Region {
            kind: SegmentType::Code,
            start: whole.start(),
            end: whole.end(),
            language,
        });
    }
}

fn detect_display_math(text: &str, out: &mut Vec<Region>) {
    out.extend(display_math().find_iter(text).map(|m| Region {
        kind: SegmentType::Math,
        start: m.start(),
        end: m.end(),
        language: None,
    }));
}

/// `\begin{env} ... \end{env}` with a matching environment name.
///
/// The regex engine has no backreferences, so the closing tag is found by a
/// literal search after each opening tag.
fn detect_latex_environments(text: &str, out: &mut Vec<Region>) {
    let mut pos = 0;
    while let Some(caps) = latex_begin().captures_at(text, pos) {
        let (Some(open), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let close = format!("\\end{{{}}}", name.as_str());
        match text[open.end()..].find(&close) {
            Some(rel) => {
                let end = open.end() + rel + close.len();
                out.push(Region {
                    kind: SegmentType::Math,
                    start: open.start(),
                    end,
                    language: None,
                });
                pos = end;
            }
            None => pos = open.end(),
        }
    }
}

fn detect_headings(text: &str, out: &mut Vec<Region>) {
    out.extend(heading_line().find_iter(text).map(|m| Region {
        kind: SegmentType::Heading,
        start: m.start(),
        end: m.end(),
        language: None,
    }));
}

/// Runs of consecutive lines matching `line_re`, at least `min_lines` long.
///
/// A blank or non-matching line ends the run.
fn detect_line_blocks(
    text: &str,
    line_re: &Regex,
    kind: SegmentType,
    min_lines: usize,
    out: &mut Vec<Region>,
) {
    let mut run: Option<(usize, usize, usize)> = None; // (start, end, lines)
    let flush = |run: &mut Option<(usize, usize, usize)>, out: &mut Vec<Region>| {
        if let Some((start, end, lines)) = run.take() {
            if lines >= min_lines {
                out.push(Region {
                    kind,
                    start,
                    end,
                    language: None,
                });
            }
        }
    };

    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);
        let line_end = offset + content.len();
        if line_re.is_match(content) {
            run = Some(match run {
                Some((start, _, lines)) => (start, line_end, lines + 1),
                None => (offset, line_end, 1),
            });
        } else {
            flush(&mut run, out);
        }
        offset += line.len();
    }
    flush(&mut run, out);
}

/// Sort by start (then precedence) and merge overlaps into the earlier region.
fn merge_regions(mut regions: Vec<Region>) -> Vec<Region> {
    regions.sort_by_key(|r| (r.start, r.kind.priority()));

    let mut merged: Vec<Region> = Vec::with_capacity(regions.len());
    for region in regions {
        match merged.last_mut() {
            Some(last) if region.start < last.end => {
                last.end = last.end.max(region.end);
            }
            _ => merged.push(region),
        }
    }
    merged
}

fn fill_gaps(text: &str, regions: Vec<Region>) -> Vec<ContentSegment> {
    let mut segments: Vec<ContentSegment> = Vec::with_capacity(regions.len() * 2 + 1);
    let mut cursor = 0;
    let mut pending_ws: Option<usize> = None; // leading whitespace waiting for a segment

    let push_gap = |segments: &mut Vec<ContentSegment>,
                        pending_ws: &mut Option<usize>,
                        start: usize,
                        end: usize| {
        if start >= end {
            return;
        }
        if !text[start..end].trim().is_empty() {
            let start = pending_ws.take().unwrap_or(start);
            segments.push(segment(text, SegmentType::Prose, start, end, None));
        } else if let Some(last) = segments.last_mut() {
            extend(text, last, end);
        } else {
            pending_ws.get_or_insert(start);
        }
    };

    for region in regions {
        push_gap(&mut segments, &mut pending_ws, cursor, region.start);
        let start = pending_ws.take().unwrap_or(region.start);
        segments.push(segment(text, region.kind, start, region.end, region.language));
        cursor = region.end;
    }
    push_gap(&mut segments, &mut pending_ws, cursor, text.len());

    segments
}

fn extend(text: &str, seg: &mut ContentSegment, end: usize) {
    seg.end_offset = end;
    seg.content = text[seg.start_offset..end].to_string();
}

fn segment(
    text: &str,
    kind: SegmentType,
    start: usize,
    end: usize,
    language: Option<String>,
) -> ContentSegment {
    ContentSegment {
        kind,
        content: text[start..end].to_string(),
        start_offset: start,
        end_offset: end,
        language,
    }
}
