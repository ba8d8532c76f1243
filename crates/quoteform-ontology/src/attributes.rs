//! Attribute resolution for one statement block.
//!
//! Every attribute is an independent rule matched against the whole block
//! text, so the order in which attributes are written never matters. The
//! resolver does no validation beyond shape: pattern compilation, form-type
//! names and range mapping are checked when the block is turned into a
//! [`crate::declaration::PropertyDeclaration`].

use crate::vocab::{
    Vocabulary, CONDITIONAL_DISPLAY_LOCAL, DEFAULT_VALUE_LOCAL, DOMAIN_PREDICATE,
    ENUMERATION_LOCAL, FORM_TYPE_LOCAL, HELP_TEXT_LOCAL, LABEL_PREDICATE, RANGE_PREDICATE,
    REQUIRED_LOCAL, VALIDATION_PATTERN_LOCAL,
};
use crate::blocks::mask_comments;
use regex::{Captures, Regex};

/// Raw attributes of one declaration. Absent attributes keep their defaults:
/// `None`, `false` for `required`, and an empty enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet {
    pub label: Option<String>,
    /// Owning class. The local name when the prefix is accepted, otherwise
    /// the name as written.
    pub domain: Option<String>,
    /// Range word as written, e.g. `xsd:boolean`.
    pub range: Option<String>,
    pub required: bool,
    pub help_text: Option<String>,
    pub enumeration: Vec<String>,
    /// Opaque expression, evaluated by the UI layer.
    pub conditional_display: Option<String>,
    pub validation_pattern: Option<String>,
    pub default_value: Option<String>,
    pub form_type: Option<String>,
}

/// Extracts an [`AttributeSet`] from a block of declaration text.
pub trait AttributeExtractor {
    fn extract_attributes(&self, block: &str) -> AttributeSet;
}

/// Quoted literal: long form `"""..."""` (group 1) or short form (group 2).
const QUOTED: &str = r#"(?:"""(?s:(.*?))"""|"((?:[^"\\\n]|\\.)*)")"#;

/// Regex-based [`AttributeExtractor`] for a given vocabulary.
#[derive(Debug, Clone)]
pub struct RegexAttributeExtractor {
    vocab: Vocabulary,
    label: Regex,
    domain: Regex,
    range: Regex,
    required: Regex,
    help_text: Regex,
    enumeration: Regex,
    conditional_display: Regex,
    validation_pattern: Regex,
    default_value: Regex,
    form_type: Regex,
}

impl RegexAttributeExtractor {
    pub fn new(vocab: &Vocabulary) -> Self {
        let prefixes = vocab.prefix_alternation();
        let ext = |local: &str| format!(r"\b{prefixes}:{}", regex::escape(local));
        let term = |predicate: &str| format!(r"\b{}", regex::escape(predicate));

        Self {
            vocab: vocab.clone(),
            label: build(&format!(r"{}\s+{QUOTED}", term(LABEL_PREDICATE))),
            domain: build(&format!(
                r"{}\s+(<[^>\s]*>|[A-Za-z_][\w\-]*(?::[\w\-]*)?)",
                term(DOMAIN_PREDICATE)
            )),
            range: build(&format!(
                r"{}\s+(<[^>\s]*>|[A-Za-z_][\w\-]*(?::[\w\-]*)?)",
                term(RANGE_PREDICATE)
            )),
            required: build(&format!(
                r#"{}\s+"?(true|false)\b"?(?:\^\^xsd:boolean)?"#,
                ext(REQUIRED_LOCAL)
            )),
            help_text: build(&format!(r"{}\s+{QUOTED}", ext(HELP_TEXT_LOCAL))),
            enumeration: build(&format!(
                r#"{}\s+\(((?:"(?:[^"\\]|\\.)*"|[^)"])*)\)"#,
                ext(ENUMERATION_LOCAL)
            )),
            conditional_display: build(&format!(
                r"{}\s+{QUOTED}",
                ext(CONDITIONAL_DISPLAY_LOCAL)
            )),
            validation_pattern: build(&format!(
                r"{}\s+{QUOTED}",
                ext(VALIDATION_PATTERN_LOCAL)
            )),
            default_value: build(&format!(r"{}\s+{QUOTED}", ext(DEFAULT_VALUE_LOCAL))),
            form_type: build(&format!(r"{}\s+{QUOTED}", ext(FORM_TYPE_LOCAL))),
        }
    }

    fn quoted(re: &Regex, block: &str) -> Option<String> {
        re.captures(block).and_then(|caps| quoted_body(&caps))
    }
}

impl Default for RegexAttributeExtractor {
    fn default() -> Self {
        Self::new(&Vocabulary::default())
    }
}

impl AttributeExtractor for RegexAttributeExtractor {
    fn extract_attributes(&self, block: &str) -> AttributeSet {
        let masked = mask_comments(block);
        let block = masked.as_ref();
        let domain = self
            .domain
            .captures(block)
            .and_then(|c| c.get(1))
            .map(|m| {
                let name = m.as_str();
                self.vocab.local_name(name).unwrap_or(name).to_string()
            });

        AttributeSet {
            label: Self::quoted(&self.label, block)
                .map(|s| unescape_turtle_string(&s))
                .filter(|s| !s.trim().is_empty()),
            domain,
            range: self
                .range
                .captures(block)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string()),
            required: self
                .required
                .captures(block)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str() == "true")
                .unwrap_or(false),
            help_text: Self::quoted(&self.help_text, block).map(|s| unescape_turtle_string(&s)),
            enumeration: self
                .enumeration
                .captures(block)
                .and_then(|c| c.get(1))
                .map(|m| split_enumeration(m.as_str()))
                .unwrap_or_default(),
            conditional_display: Self::quoted(&self.conditional_display, block),
            validation_pattern: Self::quoted(&self.validation_pattern, block)
                .map(|s| unescape_turtle_string(&s)),
            default_value: Self::quoted(&self.default_value, block)
                .map(|s| unescape_turtle_string(&s)),
            form_type: Self::quoted(&self.form_type, block).map(|s| s.trim().to_string()),
        }
    }
}

// The only variable input to these patterns is the prefix alternation, whose
// members are validated identifiers passed through `regex::escape`.
fn build(pattern: &str) -> Regex {
    Regex::new(pattern).expect("attribute pattern is well-formed")
}

fn quoted_body(caps: &Captures<'_>) -> Option<String> {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Split the body of an enumeration list into tokens.
///
/// Quoted tokens keep their inner whitespace; bare tokens are split on
/// whitespace and commas. Tokens are trimmed and empty tokens are skipped.
pub fn split_enumeration(body: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut chars = body.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() || c == ',' {
            chars.next();
            continue;
        }

        if c == '"' {
            chars.next();
            let mut raw = String::new();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        raw.push('\\');
                        if let Some(n) = chars.next() {
                            raw.push(n);
                        }
                    }
                    '"' => break,
                    other => raw.push(other),
                }
            }
            push_token(&mut out, &unescape_turtle_string(&raw));
            continue;
        }

        let mut token = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() || c == ',' || c == '"' {
                break;
            }
            token.push(c);
            chars.next();
        }
        push_token(&mut out, &token);
    }

    out
}

fn push_token(out: &mut Vec<String>, token: &str) {
    let token = token.trim();
    if !token.is_empty() {
        out.push(token.to_string());
    }
}

/// Undo Turtle string escapes. Unknown escapes are kept as written, which
/// leaves regex escapes such as `\d` intact.
pub fn unescape_turtle_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
