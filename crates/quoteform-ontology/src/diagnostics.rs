//! Recoverable, per-property compile diagnostics.
//!
//! A diagnostic never aborts a compile. Properties that cannot be placed in
//! the schema are dropped and reported here; properties with a minor defect
//! (unterminated block, unknown range word, bad pattern) are kept and the
//! defect is reported.

use crate::source::SourceLocation;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    MissingLabel {
        property: String,
        location: SourceLocation,
    },
    MissingDomain {
        property: String,
        location: SourceLocation,
    },
    TruncatedBlock {
        property: String,
        location: SourceLocation,
    },
    UnrecognizedRange {
        property: String,
        range: String,
        location: SourceLocation,
    },
    DuplicateProperty {
        property: String,
        location: SourceLocation,
        first_declared_at: SourceLocation,
    },
    InvalidPattern {
        property: String,
        pattern: String,
        message: String,
        location: SourceLocation,
    },
    UnknownFormType {
        property: String,
        form_type: String,
        location: SourceLocation,
    },
    UnknownClass {
        property: String,
        class: String,
        location: SourceLocation,
    },
}

impl Diagnostic {
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::MissingLabel { .. } => "missing_label",
            Diagnostic::MissingDomain { .. } => "missing_domain",
            Diagnostic::TruncatedBlock { .. } => "truncated_block",
            Diagnostic::UnrecognizedRange { .. } => "unrecognized_range",
            Diagnostic::DuplicateProperty { .. } => "duplicate_property",
            Diagnostic::InvalidPattern { .. } => "invalid_pattern",
            Diagnostic::UnknownFormType { .. } => "unknown_form_type",
            Diagnostic::UnknownClass { .. } => "unknown_class",
        }
    }

    pub fn property(&self) -> &str {
        match self {
            Diagnostic::MissingLabel { property, .. }
            | Diagnostic::MissingDomain { property, .. }
            | Diagnostic::TruncatedBlock { property, .. }
            | Diagnostic::UnrecognizedRange { property, .. }
            | Diagnostic::DuplicateProperty { property, .. }
            | Diagnostic::InvalidPattern { property, .. }
            | Diagnostic::UnknownFormType { property, .. }
            | Diagnostic::UnknownClass { property, .. } => property,
        }
    }

    pub fn location(&self) -> &SourceLocation {
        match self {
            Diagnostic::MissingLabel { location, .. }
            | Diagnostic::MissingDomain { location, .. }
            | Diagnostic::TruncatedBlock { location, .. }
            | Diagnostic::UnrecognizedRange { location, .. }
            | Diagnostic::DuplicateProperty { location, .. }
            | Diagnostic::InvalidPattern { location, .. }
            | Diagnostic::UnknownFormType { location, .. }
            | Diagnostic::UnknownClass { location, .. } => location,
        }
    }

    /// Whether the property was left out of the schema.
    pub fn drops_property(&self) -> bool {
        matches!(
            self,
            Diagnostic::MissingLabel { .. }
                | Diagnostic::MissingDomain { .. }
                | Diagnostic::DuplicateProperty { .. }
                | Diagnostic::UnknownClass { .. }
        )
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let location = self.location();
        let property = self.property();
        match self {
            Diagnostic::MissingLabel { .. } => {
                write!(f, "{location}: property `{property}` has no rdfs:label; dropped")
            }
            Diagnostic::MissingDomain { .. } => {
                write!(f, "{location}: property `{property}` has no rdfs:domain; dropped")
            }
            Diagnostic::TruncatedBlock { .. } => write!(
                f,
                "{location}: declaration of `{property}` has no terminating `.`"
            ),
            Diagnostic::UnrecognizedRange { range, .. } => write!(
                f,
                "{location}: property `{property}` has unrecognized range `{range}`; treated as string"
            ),
            Diagnostic::DuplicateProperty {
                first_declared_at, ..
            } => write!(
                f,
                "{location}: property `{property}` already declared at {first_declared_at}; dropped"
            ),
            Diagnostic::InvalidPattern {
                pattern, message, ..
            } => write!(
                f,
                "{location}: property `{property}` has invalid validation pattern `{pattern}`: {message}"
            ),
            Diagnostic::UnknownFormType { form_type, .. } => write!(
                f,
                "{location}: property `{property}` names unknown form type `{form_type}`; ignored"
            ),
            Diagnostic::UnknownClass { class, .. } => write!(
                f,
                "{location}: property `{property}` belongs to unclassified class `{class}`; dropped"
            ),
        }
    }
}

/// Ordered diagnostic collector. Every pushed diagnostic is logged at warn.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(
            kind = diagnostic.kind(),
            property = diagnostic.property(),
            location = %diagnostic.location(),
            "{diagnostic}"
        );
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
