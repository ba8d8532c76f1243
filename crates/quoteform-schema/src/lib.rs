//! Form schema compilation for quoteform.
//!
//! Takes the property declarations produced by `quoteform-ontology` and turns
//! them into the canonical form schema:
//!
//! - [`infer`]: control type per field.
//! - [`classify`]: owning class to form section(s).
//! - [`assemble`]: group fields by section, dedup, fingerprint.
//! - [`compile`]: the end-to-end pipeline over configured documents.
//! - [`publish`]: the versioned, atomically replaced published schema.
//! - [`validate`]: server-side checks of a submission against the schema.

pub mod assemble;
pub mod classify;
pub mod compile;
pub mod config;
pub mod field;
pub mod infer;
pub mod publish;
pub mod validate;

pub use assemble::SchemaAssembler;
pub use classify::{ClassRule, ClassificationTable, SectionMeta};
pub use compile::{CompileError, CompileOutcome, Compiler};
pub use config::{CompilerConfig, ConfigError, DEFAULT_DOCUMENTS, DEFAULT_ONTOLOGY_DIR};
pub use field::{
    CompiledSchema, ControlType, FieldOption, FieldSchema, SectionId, SectionSchema,
};
pub use infer::{infer_control, RADIO_MAX_OPTIONS};
pub use publish::{PublishedSchema, ReloadError, SchemaPublisher};
pub use validate::{validate_submission, FieldError, Submission, ValidationCode, ValidationReport};
