//! The published schema: a versioned value, replaced atomically on reload.
//!
//! Readers take `Arc<PublishedSchema>` snapshots; a snapshot never changes
//! after it is published. Rebuilds run outside the read lock and are
//! serialized with a separate mutex, so there is one writer at a time.

use crate::compile::{CompileError, CompileOutcome, Compiler};
use crate::field::CompiledSchema;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use quoteform_ontology::{Diagnostic, DocumentSpan, SourceError};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct PublishedSchema {
    /// 0 for the initial empty schema, incremented on every successful reload.
    pub version: u64,
    pub compiled_at: Option<DateTime<Utc>>,
    pub schema: CompiledSchema,
    pub diagnostics: Vec<Diagnostic>,
    pub sources: Vec<DocumentSpan>,
}

impl PublishedSchema {
    pub fn initial() -> Self {
        Self {
            version: 0,
            compiled_at: None,
            schema: CompiledSchema::empty(),
            diagnostics: Vec::new(),
            sources: Vec::new(),
        }
    }

    fn from_outcome(version: u64, outcome: CompileOutcome) -> Self {
        Self {
            version,
            compiled_at: Some(Utc::now()),
            schema: outcome.schema,
            diagnostics: outcome.diagnostics,
            sources: outcome.documents,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("reload was cancelled before publishing")]
    Cancelled,
}

#[derive(Debug)]
pub struct SchemaPublisher {
    compiler: Compiler,
    current: RwLock<Arc<PublishedSchema>>,
    reload_lock: Mutex<()>,
}

impl SchemaPublisher {
    /// A publisher holding the initial empty schema. Call [`reload`] to
    /// compile for the first time.
    ///
    /// [`reload`]: SchemaPublisher::reload
    pub fn new(compiler: Compiler) -> Self {
        Self {
            compiler,
            current: RwLock::new(Arc::new(PublishedSchema::initial())),
            reload_lock: Mutex::new(()),
        }
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    pub fn current(&self) -> Arc<PublishedSchema> {
        self.current.read().clone()
    }

    /// Recompile and publish. On failure the current schema is kept.
    pub fn reload(&self) -> Result<Arc<PublishedSchema>, ReloadError> {
        self.reload_unless_cancelled(&AtomicBool::new(false))
    }

    /// Like [`reload`](SchemaPublisher::reload), but skips publishing when
    /// `cancelled` is set by the time the compile finishes.
    pub fn reload_unless_cancelled(
        &self,
        cancelled: &AtomicBool,
    ) -> Result<Arc<PublishedSchema>, ReloadError> {
        let _guard = self.reload_lock.lock();

        let outcome = match self.compiler.compile() {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(error = %err, "schema reload failed; keeping previous schema");
                return Err(err.into());
            }
        };
        if cancelled.load(Ordering::SeqCst) {
            tracing::error!("schema reload cancelled; keeping previous schema");
            return Err(ReloadError::Cancelled);
        }

        let version = self.current.read().version + 1;
        let published = Arc::new(PublishedSchema::from_outcome(version, outcome));
        *self.current.write() = published.clone();

        tracing::info!(
            version,
            fields = published.schema.field_count(),
            diagnostics = published.diagnostics.len(),
            fingerprint = %published.schema.fingerprint,
            "published schema"
        );
        Ok(published)
    }

    /// Whether any configured document differs from the published snapshot.
    pub fn sources_changed(&self) -> Result<bool, SourceError> {
        let digests = self.compiler.source_digests()?;
        let current = self.current();
        let published: Vec<&str> = current.sources.iter().map(|d| d.digest.as_str()).collect();
        Ok(digests.iter().map(String::as_str).ne(published.iter().copied()))
    }
}
