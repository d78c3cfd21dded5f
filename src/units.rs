//! Format-aware splitting into atomic units.
//!
//! Boundary detection works on units: the smallest spans a chunk may start
//! or end at. What counts as a unit depends on the format:
//!
//! | Format | Unit | Refinement |
//! |--------|------|------------|
//! | conversation | one turn (`User:`, `Assistant:`, ...) | < 2 turns: treat as default |
//! | markdown | heading section | sections > 150 tokens → paragraphs |
//! | html | as default, after stripping tags | |
//! | default | paragraph (blank-line delimited) | paragraphs > 200 tokens → sentences |
//!
//! Every unit is trimmed and carries its byte span in the original text.
//! For HTML the unit text no longer appears verbatim in the source, so
//! spans are recovered by scanning forward for each unit's text.

use std::convert::Infallible;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use crate::tokens::estimate_tokens;
use crate::ContentAnalyzer;

/// Markdown sections above this many tokens are split into paragraphs.
pub const SECTION_MAX_TOKENS: usize = 150;

/// Paragraphs above this many tokens are split into sentences.
pub const PARAGRAPH_MAX_TOKENS: usize = 200;

/// Line prefixes that open a conversation turn.
pub const TURN_MARKERS: [&str; 8] = [
    "User:",
    "Assistant:",
    "Human:",
    "Claude:",
    "System:",
    "AI:",
    "You:",
    "Me:",
];

/// Input format, selecting the unit-splitting strategy.
///
/// Parsing never fails: unknown names fall back to [`ContentFormat::Default`].
///
/// ```rust
/// use seams::ContentFormat;
///
/// assert_eq!("markdown".parse::<ContentFormat>().unwrap(), ContentFormat::Markdown);
/// assert_eq!(ContentFormat::parse("md"), ContentFormat::Markdown);
/// assert_eq!(ContentFormat::parse("docx"), ContentFormat::Default);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ContentFormat {
    /// Chat transcript with turn markers.
    Conversation,
    /// Markdown document.
    Markdown,
    /// HTML document.
    Html,
    /// Plain prose.
    #[default]
    Default,
}

impl ContentFormat {
    /// Parse a format name, falling back to `Default` for unknown names.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "conversation" | "chat" | "transcript" => Self::Conversation,
            "markdown" | "md" => Self::Markdown,
            "html" | "htm" => Self::Html,
            "default" | "text" | "plain" | "txt" | "" => Self::Default,
            other => {
                tracing::warn!(format = other, "unsupported content format, using default");
                Self::Default
            }
        }
    }

    /// Lowercase name of the format.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Default => "default",
        }
    }
}

impl FromStr for ContentFormat {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for ContentFormat {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl std::fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An atomic span of text considered for boundary detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Trimmed unit text.
    pub text: String,
    /// Byte offset of the unit in the original text.
    pub start: usize,
    /// Byte offset one past the unit end in the original text.
    pub end: usize,
}

impl Unit {
    /// Trim `source[start..end]` into a unit; `None` if it is blank.
    fn from_span(source: &str, start: usize, end: usize) -> Option<Self> {
        let raw = &source[start..end];
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let leading_ws = raw.len() - raw.trim_start().len();
        let start = start + leading_ws;
        Some(Self {
            text: trimmed.to_string(),
            start,
            end: start + trimmed.len(),
        })
    }

    /// Estimated tokens in this unit.
    pub fn tokens(&self) -> usize {
        estimate_tokens(&self.text)
    }
}

impl AsRef<str> for Unit {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Split `text` into units using the strategy for `format`.
///
/// ```rust
/// use seams::{split_units, ContentFormat};
///
/// let text = "User: hi there\nAssistant: hello!\nUser: bye";
/// let units = split_units(text, ContentFormat::Conversation);
/// assert_eq!(units.len(), 3);
/// assert_eq!(units[1].text, "Assistant: hello!");
/// assert_eq!(&text[units[1].start..units[1].end], units[1].text);
/// ```
pub fn split_units(text: &str, format: ContentFormat) -> Vec<Unit> {
    match format {
        ContentFormat::Conversation => conversation_units(text),
        ContentFormat::Markdown => markdown_units(text),
        ContentFormat::Html => html_units(text),
        ContentFormat::Default => default_units(text),
    }
}

fn turn_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternatives: Vec<String> = TURN_MARKERS
            .iter()
            .map(|m| regex::escape(m.trim_end_matches(':')))
            .collect();
        Regex::new(&format!(r"(?m)^[ \t]*(?:{}):", alternatives.join("|"))).expect("valid regex")
    })
}

fn heading_start() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^#{1,6}[ \t]").expect("valid regex"))
}

fn paragraph_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t\r]*\n\s*").expect("valid regex"))
}

fn sentence_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[.!?]+["'”’)\]]*\s+"#).expect("valid regex"))
}

/// Units between cut ranges inside `start..end`; cuts must be ascending.
fn units_between(
    source: &str,
    start: usize,
    end: usize,
    cuts: impl IntoIterator<Item = (usize, usize)>,
) -> Vec<Unit> {
    let mut units = Vec::new();
    let mut cursor = start;
    for (cut_start, cut_end) in cuts {
        if cut_start < cursor {
            continue;
        }
        units.extend(Unit::from_span(source, cursor, cut_start));
        cursor = cut_end;
    }
    units.extend(Unit::from_span(source, cursor, end));
    units
}

fn inside(protected: &[std::ops::Range<usize>], pos: usize) -> bool {
    protected.iter().any(|r| pos > r.start && pos < r.end)
}

/// Blank-line delimited paragraphs in `start..end`, never breaking inside
/// a protected range.
fn paragraphs(
    source: &str,
    start: usize,
    end: usize,
    protected: &[std::ops::Range<usize>],
) -> Vec<Unit> {
    let cuts = paragraph_break()
        .find_iter(&source[start..end])
        .map(|m| (start + m.start(), start + m.end()))
        .filter(|&(s, _)| !inside(protected, s));
    units_between(source, start, end, cuts)
}

/// Sentences in `start..end`.
///
/// A sentence ends at `.`, `!` or `?` (plus closing quotes or brackets)
/// followed by whitespace and a capital letter or opening quote, or right
/// before a newline.
fn sentences(source: &str, start: usize, end: usize) -> Vec<Unit> {
    let slice = &source[start..end];
    let mut cuts: Vec<usize> = sentence_end()
        .find_iter(slice)
        .filter(|m| {
            slice[m.end()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_uppercase() || matches!(c, '"' | '\'' | '“' | '‘' | '('))
        })
        .map(|m| start + m.start() + m.as_str().trim_end().len())
        .collect();
    cuts.extend(slice.match_indices('\n').map(|(i, _)| start + i));
    cuts.sort_unstable();
    cuts.dedup();
    units_between(source, start, end, cuts.into_iter().map(|c| (c, c)))
}

fn default_units(text: &str) -> Vec<Unit> {
    refine_paragraphs(text, paragraphs(text, 0, text.len(), &[]))
}

fn refine_paragraphs(text: &str, paragraphs: Vec<Unit>) -> Vec<Unit> {
    paragraphs
        .into_iter()
        .flat_map(|p| {
            if p.tokens() > PARAGRAPH_MAX_TOKENS {
                sentences(text, p.start, p.end)
            } else {
                vec![p]
            }
        })
        .collect()
}

fn conversation_units(text: &str) -> Vec<Unit> {
    let starts: Vec<usize> = turn_marker().find_iter(text).map(|m| m.start()).collect();
    if starts.len() < 2 {
        tracing::debug!(turns = starts.len(), "too few turn markers, splitting paragraphs");
        return default_units(text);
    }
    units_between(text, 0, text.len(), starts.into_iter().map(|s| (s, s)))
}

fn markdown_units(text: &str) -> Vec<Unit> {
    let protected: Vec<std::ops::Range<usize>> = ContentAnalyzer::new()
        .regions(text)
        .into_iter()
        .filter(|(kind, _)| kind.is_atomic())
        .map(|(_, range)| range)
        .collect();

    let heading_starts = heading_start()
        .find_iter(text)
        .map(|m| m.start())
        .filter(|&s| !protected.iter().any(|r| r.contains(&s)))
        .map(|s| (s, s));

    units_between(text, 0, text.len(), heading_starts)
        .into_iter()
        .flat_map(|section| {
            if section.tokens() > SECTION_MAX_TOKENS {
                paragraphs(text, section.start, section.end, &protected)
            } else {
                vec![section]
            }
        })
        .collect()
}

fn html_units(html: &str) -> Vec<Unit> {
    let stripped = strip_html(html);
    let mut scanner = OffsetScanner::new(html);
    default_units(&stripped)
        .into_iter()
        .map(|unit| {
            let (start, end) = scanner.locate(&unit.text);
            Unit { start, end, ..unit }
        })
        .collect()
}

/// Elements whose contents are never text.
const SKIPPED_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Text of an HTML document, with every element boundary turned into a
/// newline. Entities are decoded by the parser; script and style contents
/// and comments are dropped.
pub fn strip_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::with_capacity(html.len());
    push_text(document.root_element(), &mut text);
    text
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            out.push('\n');
            if !SKIPPED_ELEMENTS.contains(&child.value().name()) {
                push_text(child, out);
                out.push('\n');
            }
        }
    }
}

/// Maps text back to source offsets by forward-only substring search.
///
/// A miss leaves the cursor where it was and reports an empty span there,
/// so later units can still be found.
#[derive(Debug)]
pub(crate) struct OffsetScanner<'a> {
    source: &'a str,
    cursor: usize,
}

impl<'a> OffsetScanner<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self { source, cursor: 0 }
    }

    pub(crate) fn locate(&mut self, needle: &str) -> (usize, usize) {
        match self.source[self.cursor..].find(needle) {
            Some(rel) if !needle.is_empty() => {
                let start = self.cursor + rel;
                self.cursor = start + needle.len();
                (start, self.cursor)
            }
            _ => (self.cursor, self.cursor),
        }
    }
}
