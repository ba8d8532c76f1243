//! Keyword vocabulary recognized in ontology documents.
//!
//! The compiler only understands a fixed set of predicates. Standard RDF/OWL
//! terms (`rdfs:label`, `rdfs:domain`, ...) are matched literally; the
//! form-specific extension predicates (`isRequired`, `formHelpText`, ...) may
//! appear under any accepted namespace prefix, as may property and class names.

/// Default namespace prefixes accepted on property names, class names and
/// extension predicates.
pub const DEFAULT_PREFIXES: &[&str] = &["autoins", "ex"];

pub const TYPED_PROPERTY_MARKER: &str = "owl:DatatypeProperty";
pub const TYPE_ASSERTION_TOKENS: &[&str] = &["a", "rdf:type"];

pub const LABEL_PREDICATE: &str = "rdfs:label";
pub const DOMAIN_PREDICATE: &str = "rdfs:domain";
pub const RANGE_PREDICATE: &str = "rdfs:range";

/// Extension predicates, written as `<prefix>:<local>`.
pub const REQUIRED_LOCAL: &str = "isRequired";
pub const HELP_TEXT_LOCAL: &str = "formHelpText";
pub const ENUMERATION_LOCAL: &str = "enumerationValues";
pub const CONDITIONAL_DISPLAY_LOCAL: &str = "conditionalDisplay";
pub const VALIDATION_PATTERN_LOCAL: &str = "validationPattern";
pub const DEFAULT_VALUE_LOCAL: &str = "defaultValue";
pub const FORM_TYPE_LOCAL: &str = "formType";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    accepted_prefixes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VocabularyError {
    #[error("at least one namespace prefix must be accepted")]
    NoPrefixes,
    #[error("invalid namespace prefix `{0}` (expected [A-Za-z_][A-Za-z0-9_-]*)")]
    InvalidPrefix(String),
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            accepted_prefixes: DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl Vocabulary {
    pub fn new<I, S>(prefixes: I) -> Result<Self, VocabularyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut accepted_prefixes: Vec<String> = Vec::new();
        for prefix in prefixes {
            let prefix = prefix.into();
            let prefix = prefix.trim().trim_end_matches(':').to_string();
            if !is_valid_prefix(&prefix) {
                return Err(VocabularyError::InvalidPrefix(prefix));
            }
            if !accepted_prefixes.contains(&prefix) {
                accepted_prefixes.push(prefix);
            }
        }
        if accepted_prefixes.is_empty() {
            return Err(VocabularyError::NoPrefixes);
        }
        Ok(Self { accepted_prefixes })
    }

    pub fn accepted_prefixes(&self) -> &[String] {
        &self.accepted_prefixes
    }

    pub fn accepts_prefix(&self, prefix: &str) -> bool {
        self.accepted_prefixes.iter().any(|p| p == prefix)
    }

    /// Regex alternation matching any accepted prefix, e.g. `(?:autoins|ex)`.
    pub fn prefix_alternation(&self) -> String {
        let alts: Vec<String> = self
            .accepted_prefixes
            .iter()
            .map(|p| regex::escape(p))
            .collect();
        format!("(?:{})", alts.join("|"))
    }

    /// Strip an accepted prefix from `name`.
    ///
    /// Returns `None` when the name carries a prefix that is not accepted, or
    /// no local part at all. An unprefixed bare name is returned unchanged.
    pub fn local_name<'a>(&self, name: &'a str) -> Option<&'a str> {
        match name.split_once(':') {
            Some((prefix, local)) if self.accepts_prefix(prefix) && !local.is_empty() => {
                Some(local)
            }
            Some(_) => None,
            None if !name.is_empty() => Some(name),
            None => None,
        }
    }
}

fn is_valid_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
