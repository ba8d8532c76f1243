//! The compile pipeline: load, extract, resolve, infer, classify, assemble.

use crate::assemble::SchemaAssembler;
use crate::classify::ClassificationTable;
use crate::config::{CompilerConfig, ConfigError};
use crate::field::CompiledSchema;
use quoteform_ontology::{
    load_sources, CombinedSource, DeclarationReader, Diagnostic, Diagnostics, DocumentSpan,
    SourceError, SourceSet, Vocabulary,
};

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("failed to fingerprint compiled schema: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Result of one successful compile.
#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub schema: CompiledSchema,
    pub diagnostics: Vec<Diagnostic>,
    /// Documents in concatenation order, with content digests.
    pub documents: Vec<DocumentSpan>,
}

#[derive(Debug, Clone)]
pub struct Compiler {
    sources: SourceSet,
    reader: DeclarationReader,
    assembler: SchemaAssembler,
}

impl Compiler {
    pub fn new(sources: SourceSet, vocab: &Vocabulary, table: ClassificationTable) -> Self {
        Self {
            sources,
            reader: DeclarationReader::new(vocab),
            assembler: SchemaAssembler::new(table),
        }
    }

    pub fn from_config(config: &CompilerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(
            config.source_set(),
            &config.vocabulary()?,
            config.classification_table(),
        ))
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    /// Read every configured document and compile. Any unreadable document
    /// fails the compile.
    pub fn compile(&self) -> Result<CompileOutcome, CompileError> {
        let source = load_sources(&self.sources)?;
        self.compile_source(&source)
    }

    /// Compile an already combined source.
    pub fn compile_source(&self, source: &CombinedSource) -> Result<CompileOutcome, CompileError> {
        let mut diagnostics = Diagnostics::new();
        let declarations = self.reader.read(source, &mut diagnostics);
        let schema = self.assembler.assemble(declarations, &mut diagnostics)?;

        tracing::debug!(
            documents = source.documents().len(),
            fields = schema.field_count(),
            diagnostics = diagnostics.len(),
            "compiled ontology"
        );

        Ok(CompileOutcome {
            schema,
            diagnostics: diagnostics.into_vec(),
            documents: source.documents().to_vec(),
        })
    }

    /// Content digests of the configured documents, without compiling.
    pub fn source_digests(&self) -> Result<Vec<String>, SourceError> {
        let source = load_sources(&self.sources)?;
        Ok(source
            .documents()
            .iter()
            .map(|d| d.digest.clone())
            .collect())
    }
}
