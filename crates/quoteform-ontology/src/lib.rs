//! Ontology ingestion for quoteform.
//!
//! This crate reads the Turtle-shaped knowledge base and produces typed
//! property declarations:
//!
//! - [`source`]: load the configured documents into one combined text.
//! - [`blocks`]: find each `owl:DatatypeProperty` declaration span.
//! - [`attributes`]: resolve the attributes of one span.
//! - [`declaration`]: resolved declarations plus recoverable diagnostics.
//!
//! It is deliberately not a Turtle parser. Only the declaration subset used
//! by the form ontology is recognized; everything else is skipped.

pub mod attributes;
pub mod blocks;
pub mod declaration;
pub mod diagnostics;
pub mod digest;
pub mod source;
pub mod vocab;

pub use attributes::{AttributeExtractor, AttributeSet, RegexAttributeExtractor};
pub use blocks::{BlockExtractor, Blocks, StatementBlock, Termination};
pub use declaration::{DeclarationReader, PropertyDeclaration, ValueRange};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use source::{load_sources, CombinedSource, DocumentSpan, SourceError, SourceLocation, SourceSet};
pub use vocab::{Vocabulary, VocabularyError};
