//! Citation grammar for model output.
//!
//! Splits a completion into plain text runs and listing citations so the
//! extractor never touches raw regex matches, and the grammar can be
//! swapped without changing the engine.

use regex::Regex;
use std::sync::LazyLock;

/// Literal tag inside a machine-readable citation.
pub const CITATION_TAG: &str = "PROPERTY_ID";

const RAW_MARKER: &str = "[PROPERTY_ID:";
const RENDERED_MARKER: &str = "[Property";

// The id class excludes both brackets so the innermost marker of a nested
// run is the one recognised.
static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[PROPERTY_ID:([^\[\]]+)\]").expect("Invalid citation regex")
});

/// A piece of model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Plain text, copied through (after neutralising stray tags).
    Text(&'a str),
    /// A well-formed citation with a non-empty, trimmed listing id.
    Citation { id: &'a str, raw: &'a str },
}

/// Grammar used to find listing citations in completion text.
pub trait CitationParser: Send + Sync {
    /// Split `text` into segments, in order. Concatenating the raw text of
    /// every segment reproduces the input.
    fn parse<'a>(&self, text: &'a str) -> Vec<Segment<'a>>;

    /// Append the human-readable form of `segment` to `out`. The result must
    /// not be recognised by [`parse`](CitationParser::parse) as a citation.
    fn render(&self, segment: &Segment<'_>, out: &mut String);
}

/// Default grammar: `[PROPERTY_ID: <id>]`, tag matched case-sensitively.
///
/// Citations render as `[Property <id>]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BracketCitationParser;

impl CitationParser for BracketCitationParser {
    fn parse<'a>(&self, text: &'a str) -> Vec<Segment<'a>> {
        let mut segments = Vec::new();
        let mut cursor = 0;

        for caps in CITATION_RE.captures_iter(text) {
            let (Some(whole), Some(id)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let id = id.as_str().trim();
            if id.is_empty() {
                continue;
            }
            if whole.start() > cursor {
                segments.push(Segment::Text(&text[cursor..whole.start()]));
            }
            segments.push(Segment::Citation {
                id,
                raw: whole.as_str(),
            });
            cursor = whole.end();
        }

        if cursor < text.len() {
            segments.push(Segment::Text(&text[cursor..]));
        }
        segments
    }

    fn render(&self, segment: &Segment<'_>, out: &mut String) {
        match segment {
            Segment::Text(text) => {
                // Blank or unterminated markers stay visible but unparseable.
                out.push_str(&text.replace(RAW_MARKER, RENDERED_MARKER));
            }
            Segment::Citation { id, .. } => {
                out.push_str(RENDERED_MARKER);
                out.push(' ');
                out.push_str(&id.replace(RAW_MARKER, RENDERED_MARKER));
                out.push(']');
            }
        }
    }
}
