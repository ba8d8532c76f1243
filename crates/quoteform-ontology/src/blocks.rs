//! Statement block extraction.
//!
//! A property declaration looks like
//!
//! ```text
//! ex:hasLicense a owl:DatatypeProperty ;
//!     rdfs:domain ex:Driver ;
//!     rdfs:label "has driving license" .
//! ```
//!
//! The extractor does not parse the attribute list. It finds each anchor
//! (`<prefix>:<name> a owl:DatatypeProperty`) and returns the text span from
//! the anchor to the first standalone `.` that follows it. Attribute
//! resolution re-scans that span independently (see [`crate::attributes`]).
//!
//! Anchors and terminators inside string literals, `<...>` IRIs and `#`
//! comments are ignored.

use crate::vocab::{Vocabulary, TYPED_PROPERTY_MARKER, TYPE_ASSERTION_TOKENS};
use regex::Regex;
use std::borrow::Cow;
use std::ops::Range;

/// How a block ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Ended at a standalone `.`.
    Terminated,
    /// No terminator before the next anchor; cut at that anchor.
    TruncatedAtNextAnchor,
    /// No terminator before the end of the combined text.
    UnterminatedAtEnd,
}

impl Termination {
    pub fn is_terminated(self) -> bool {
        matches!(self, Termination::Terminated)
    }
}

/// One property declaration's text span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementBlock<'a> {
    pub prefix: &'a str,
    pub identifier: &'a str,
    pub text: &'a str,
    /// Byte range of `text` inside the scanned input.
    pub span: Range<usize>,
    pub termination: Termination,
}

#[derive(Debug, Clone)]
struct Anchor {
    start: usize,
    /// End of the `... owl:DatatypeProperty` header.
    header_end: usize,
    prefix: Range<usize>,
    identifier: Range<usize>,
}

/// Finds property-declaration anchors for a given [`Vocabulary`].
#[derive(Debug, Clone)]
pub struct BlockExtractor {
    anchor: Regex,
}

impl BlockExtractor {
    pub fn new(vocab: &Vocabulary) -> Self {
        let assertion: Vec<String> = TYPE_ASSERTION_TOKENS
            .iter()
            .map(|t| regex::escape(t))
            .collect();
        let pattern = format!(
            r"(?:^|[\s.;])(?P<prefix>{prefixes}):(?P<ident>[A-Za-z_][A-Za-z0-9_\-]*)\s+(?:{assertion})\s+{marker}\b",
            prefixes = vocab.prefix_alternation(),
            assertion = assertion.join("|"),
            marker = regex::escape(TYPED_PROPERTY_MARKER),
        );
        // Prefixes are validated by `Vocabulary`, everything else is constant.
        let anchor = Regex::new(&pattern).expect("anchor pattern is well-formed");
        Self { anchor }
    }

    /// Lazily iterate the declaration blocks of `text`, in source order.
    ///
    /// The returned iterator is cheap to clone, and calling `blocks` again on
    /// the same text yields the same sequence.
    pub fn blocks<'a>(&self, text: &'a str) -> Blocks<'a> {
        let inert = InertRanges::scan(text);
        let anchors: Vec<Anchor> = self
            .anchor
            .captures_iter(text)
            .filter_map(|caps| {
                let prefix = caps.name("prefix")?;
                let ident = caps.name("ident")?;
                let whole = caps.get(0)?;
                Some(Anchor {
                    start: prefix.start(),
                    header_end: whole.end(),
                    prefix: prefix.range(),
                    identifier: ident.range(),
                })
            })
            .filter(|a| !inert.contains(a.start))
            .collect();

        Blocks {
            text,
            inert,
            anchors,
            next: 0,
        }
    }
}

/// Iterator over [`StatementBlock`]s. See [`BlockExtractor::blocks`].
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    text: &'a str,
    inert: InertRanges,
    anchors: Vec<Anchor>,
    next: usize,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = StatementBlock<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let anchor = self.anchors.get(self.next)?;
        let limit = self
            .anchors
            .get(self.next + 1)
            .map(|a| a.start)
            .unwrap_or(self.text.len());
        self.next += 1;

        let (end, termination) =
            match find_terminator(self.text, &self.inert, anchor.header_end, limit) {
                Some(dot) => (dot + 1, Termination::Terminated),
                None if limit < self.text.len() => (limit, Termination::TruncatedAtNextAnchor),
                None => (limit, Termination::UnterminatedAtEnd),
            };

        Some(StatementBlock {
            prefix: &self.text[anchor.prefix.clone()],
            identifier: &self.text[anchor.identifier.clone()],
            text: self.text[anchor.start..end].trim_end(),
            span: anchor.start..end,
            termination,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.anchors.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Blocks<'_> {}

fn find_terminator(text: &str, inert: &InertRanges, from: usize, limit: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    (from..limit).find(|&i| {
        bytes[i] == b'.'
            && !inert.contains(i)
            && bytes
                .get(i + 1)
                .map(|b| b.is_ascii_whitespace())
                .unwrap_or(true)
    })
}

/// Byte ranges where anchors and terminators are not recognized: string
/// literals, `<...>` IRIs and `#` comments. Sorted and non-overlapping.
#[derive(Debug, Clone, Default)]
struct InertRanges {
    ranges: Vec<Range<usize>>,
}

impl InertRanges {
    fn scan(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut ranges = Vec::new();
        let mut i = 0usize;

        while i < bytes.len() {
            match bytes[i] {
                b'#' => {
                    let end = memchr_newline(bytes, i);
                    ranges.push(i..end);
                    i = end;
                }
                b'"' if bytes[i..].starts_with(b"\"\"\"") => {
                    let end = long_string_end(bytes, i + 3);
                    ranges.push(i..end);
                    i = end;
                }
                b'"' => {
                    let end = short_string_end(bytes, i + 1);
                    ranges.push(i..end);
                    i = end;
                }
                b'<' => match iri_end(bytes, i + 1) {
                    Some(end) => {
                        ranges.push(i..end);
                        i = end;
                    }
                    None => i += 1,
                },
                _ => i += 1,
            }
        }

        Self { ranges }
    }

    fn contains(&self, pos: usize) -> bool {
        let idx = self.ranges.partition_point(|r| r.end <= pos);
        self.ranges
            .get(idx)
            .map(|r| r.start <= pos && pos < r.end)
            .unwrap_or(false)
    }
}

/// `text` with every `#` comment outside literals and IRIs blanked to
/// spaces. Byte offsets and line breaks are preserved.
pub fn mask_comments(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let inert = InertRanges::scan(text);
    let mut comments = inert
        .ranges
        .iter()
        .filter(|r| bytes[r.start] == b'#')
        .peekable();
    if comments.peek().is_none() {
        return Cow::Borrowed(text);
    }

    let mut masked = bytes.to_vec();
    for range in comments {
        masked[range.clone()].fill(b' ');
    }
    // Comments end at a newline or end of text, so whole characters are replaced.
    match String::from_utf8(masked) {
        Ok(masked) => Cow::Owned(masked),
        Err(_) => Cow::Borrowed(text),
    }
}

fn memchr_newline(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|b| *b == b'\n')
        .map(|p| from + p)
        .unwrap_or(bytes.len())
}

/// End (exclusive) of a `"..."` literal whose body starts at `from`. Short
/// literals cannot span lines, so an unclosed quote stops at the newline.
fn short_string_end(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            b'\n' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn long_string_end(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i..].starts_with(b"\"\"\"") {
            return i + 3;
        }
        i += 1;
    }
    bytes.len()
}

/// IRIs cannot contain whitespace; a `<` without a closing `>` on the same
/// token is not an IRI.
fn iri_end(bytes: &[u8], from: usize) -> Option<usize> {
    for (offset, b) in bytes[from..].iter().enumerate() {
        match b {
            b'>' => return Some(from + offset + 1),
            b if b.is_ascii_whitespace() => return None,
            _ => {}
        }
    }
    None
}
