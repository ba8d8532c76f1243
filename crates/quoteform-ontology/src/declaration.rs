//! Property declarations: one resolved statement block.

use crate::attributes::{AttributeExtractor, AttributeSet, RegexAttributeExtractor};
use crate::blocks::{BlockExtractor, StatementBlock};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::source::{CombinedSource, SourceLocation};
use crate::vocab::Vocabulary;
use serde::Serialize;

/// Declared value range of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueRange {
    String,
    Boolean,
    Date,
    Year,
    Decimal,
    #[default]
    Unspecified,
}

impl ValueRange {
    /// Map a range word (`xsd:boolean`, `boolean`, `<...#date>`) by its local
    /// name. Returns `None` for words outside the supported vocabulary.
    pub fn from_range_word(word: &str) -> Option<Self> {
        let word = word.trim();
        let word = word
            .strip_prefix('<')
            .and_then(|w| w.strip_suffix('>'))
            .unwrap_or(word);
        let local = word
            .rsplit(|c: char| c == ':' || c == '#' || c == '/')
            .next()
            .unwrap_or(word);

        match local {
            "string" | "normalizedString" | "token" | "anyURI" => Some(ValueRange::String),
            "boolean" => Some(ValueRange::Boolean),
            "date" => Some(ValueRange::Date),
            "gYear" => Some(ValueRange::Year),
            "decimal" | "integer" | "int" | "long" | "nonNegativeInteger"
            | "positiveInteger" | "double" | "float" => Some(ValueRange::Decimal),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueRange::String => "string",
            ValueRange::Boolean => "boolean",
            ValueRange::Date => "date",
            ValueRange::Year => "year",
            ValueRange::Decimal => "decimal",
            ValueRange::Unspecified => "unspecified",
        }
    }
}

/// A resolved property declaration. Transient: the compiler turns these into
/// schema fields and discards them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDeclaration {
    pub identifier: String,
    /// Owning class (local name for accepted prefixes).
    pub domain: Option<String>,
    pub range: ValueRange,
    pub label: Option<String>,
    pub required: bool,
    pub help_text: Option<String>,
    pub enumeration: Vec<String>,
    pub conditional_display: Option<String>,
    /// Only set when the pattern compiles.
    pub validation_pattern: Option<String>,
    pub default_value: Option<String>,
    /// Raw control-type override, checked by the schema compiler.
    pub form_type: Option<String>,
    pub location: SourceLocation,
    pub terminated: bool,
}

impl PropertyDeclaration {
    /// Build a declaration from a block and its attributes.
    ///
    /// Recoverable defects (truncated block, unknown range word, invalid
    /// pattern) are reported to `diagnostics`; the declaration is still
    /// returned.
    pub fn resolve(
        block: &StatementBlock<'_>,
        attributes: AttributeSet,
        location: SourceLocation,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let identifier = block.identifier.to_string();
        let terminated = block.termination.is_terminated();
        if !terminated {
            diagnostics.push(Diagnostic::TruncatedBlock {
                property: identifier.clone(),
                location: location.clone(),
            });
        }

        let range = match attributes.range.as_deref() {
            None => ValueRange::Unspecified,
            Some(word) => ValueRange::from_range_word(word).unwrap_or_else(|| {
                diagnostics.push(Diagnostic::UnrecognizedRange {
                    property: identifier.clone(),
                    range: word.to_string(),
                    location: location.clone(),
                });
                ValueRange::Unspecified
            }),
        };

        let validation_pattern = attributes.validation_pattern.and_then(|pattern| {
            match regex::Regex::new(&pattern) {
                Ok(_) => Some(pattern),
                Err(err) => {
                    diagnostics.push(Diagnostic::InvalidPattern {
                        property: identifier.clone(),
                        pattern,
                        message: err.to_string(),
                        location: location.clone(),
                    });
                    None
                }
            }
        });

        Self {
            identifier,
            domain: attributes.domain,
            range,
            label: attributes.label,
            required: attributes.required,
            help_text: attributes.help_text,
            enumeration: attributes.enumeration,
            conditional_display: attributes.conditional_display,
            validation_pattern,
            default_value: attributes.default_value,
            form_type: attributes.form_type,
            location,
            terminated,
        }
    }
}

/// Blocks plus attribute resolution: combined text in, declarations out.
#[derive(Debug, Clone)]
pub struct DeclarationReader<E = RegexAttributeExtractor> {
    blocks: BlockExtractor,
    extractor: E,
}

impl DeclarationReader<RegexAttributeExtractor> {
    pub fn new(vocab: &Vocabulary) -> Self {
        Self {
            blocks: BlockExtractor::new(vocab),
            extractor: RegexAttributeExtractor::new(vocab),
        }
    }
}

impl Default for DeclarationReader<RegexAttributeExtractor> {
    fn default() -> Self {
        Self::new(&Vocabulary::default())
    }
}

impl<E: AttributeExtractor> DeclarationReader<E> {
    pub fn with_extractor(vocab: &Vocabulary, extractor: E) -> Self {
        Self {
            blocks: BlockExtractor::new(vocab),
            extractor,
        }
    }

    /// Every declaration of `source`, in source order.
    pub fn read(
        &self,
        source: &CombinedSource,
        diagnostics: &mut Diagnostics,
    ) -> Vec<PropertyDeclaration> {
        let declarations: Vec<PropertyDeclaration> = self
            .blocks
            .blocks(source.text())
            .map(|block| {
                let attributes = self.extractor.extract_attributes(block.text);
                let location = source.locate(block.span.start);
                PropertyDeclaration::resolve(&block, attributes, location, diagnostics)
            })
            .collect();

        tracing::debug!(count = declarations.len(), "resolved property declarations");
        declarations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_words_map_by_local_name() {
        assert_eq!(ValueRange::from_range_word("xsd:boolean"), Some(ValueRange::Boolean));
        assert_eq!(ValueRange::from_range_word("xsd:gYear"), Some(ValueRange::Year));
        assert_eq!(ValueRange::from_range_word("xsd:integer"), Some(ValueRange::Decimal));
        assert_eq!(ValueRange::from_range_word("xsd:anyURI"), Some(ValueRange::String));
        assert_eq!(
            ValueRange::from_range_word("<http://www.w3.org/2001/XMLSchema#date>"),
            Some(ValueRange::Date)
        );
        assert_eq!(ValueRange::from_range_word("xsd:duration"), None);
    }

    #[test]
    fn reader_resolves_blocks_with_locations() {
        let source = CombinedSource::from_documents([
            (
                "drivers.ttl",
                "# drivers\nex:hasLicense a owl:DatatypeProperty ;\n  rdfs:label \"has driving license\" ;\n  rdfs:domain ex:Driver ;\n  rdfs:range xsd:boolean .\n",
            ),
            (
                "vehicles.ttl",
                "ex:vin a owl:DatatypeProperty ; rdfs:label \"VIN\" ; rdfs:domain ex:Vehicle .\n",
            ),
        ]);
        let mut diags = Diagnostics::new();
        let decls = DeclarationReader::default().read(&source, &mut diags);

        assert!(diags.is_empty());
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].identifier, "hasLicense");
        assert_eq!(decls[0].range, ValueRange::Boolean);
        assert_eq!(decls[0].domain.as_deref(), Some("Driver"));
        assert_eq!(decls[0].location.to_string(), "drivers.ttl:2");
        assert_eq!(decls[1].location.to_string(), "vehicles.ttl:1");
    }

    #[test]
    fn recoverable_defects_are_reported_and_kept() {
        let source = CombinedSource::from_documents([(
            "x.ttl",
            "ex:a a owl:DatatypeProperty ; rdfs:range xsd:duration ; ex:validationPattern \"[unclosed\" ;\nex:b a owl:DatatypeProperty .",
        )]);
        let mut diags = Diagnostics::new();
        let decls = DeclarationReader::default().read(&source, &mut diags);

        assert_eq!(decls.len(), 2);
        assert!(!decls[0].terminated);
        assert_eq!(decls[0].range, ValueRange::Unspecified);
        assert_eq!(decls[0].validation_pattern, None);

        let kinds: Vec<_> = diags.iter().map(|d| d.kind()).collect();
        assert_eq!(
            kinds,
            vec!["truncated_block", "unrecognized_range", "invalid_pattern"]
        );
    }

    #[test]
    fn custom_extractor_is_used() {
        struct Fixed;
        impl AttributeExtractor for Fixed {
            fn extract_attributes(&self, _block: &str) -> AttributeSet {
                AttributeSet {
                    label: Some("Fixed".to_string()),
                    ..AttributeSet::default()
                }
            }
        }

        let source = CombinedSource::from_documents([("x.ttl", "ex:a a owl:DatatypeProperty .")]);
        let reader = DeclarationReader::with_extractor(&Vocabulary::default(), Fixed);
        let decls = reader.read(&source, &mut Diagnostics::new());
        assert_eq!(decls[0].label.as_deref(), Some("Fixed"));
    }
}
