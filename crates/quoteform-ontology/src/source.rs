//! Source loading: read the configured ontology documents and concatenate
//! them, in order, into one logical text stream.
//!
//! Every document is required. A single unreadable document fails the whole
//! load; callers never see a partial stream.

use crate::digest::fnv1a64_digest_bytes;
use serde::Serialize;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Ordered list of ontology documents, optionally relative to a root dir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
    root: PathBuf,
    documents: Vec<PathBuf>,
}

impl SourceSet {
    pub fn new(root: impl Into<PathBuf>, documents: Vec<PathBuf>) -> Self {
        Self {
            root: root.into(),
            documents,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Document paths with relative entries resolved against the root.
    pub fn resolved_paths(&self) -> Vec<PathBuf> {
        self.documents
            .iter()
            .map(|doc| {
                if doc.is_absolute() {
                    doc.clone()
                } else {
                    self.root.join(doc)
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("no ontology documents configured")]
    NoDocuments,
    #[error("failed to read ontology document {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("ontology document {path} is not valid UTF-8")]
    NotUtf8 { path: PathBuf },
}

/// One document's contribution to the combined stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSpan {
    pub path: PathBuf,
    /// Byte range of this document inside [`CombinedSource::text`].
    #[serde(skip)]
    pub span: Range<usize>,
    pub digest: String,
}

/// A location inside one source document (1-based line).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SourceLocation {
    pub document: String,
    pub line: usize,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.document, self.line)
    }
}

/// The concatenated text of every document, in configured order.
#[derive(Debug, Clone, Default)]
pub struct CombinedSource {
    text: String,
    documents: Vec<DocumentSpan>,
}

impl CombinedSource {
    /// Build a combined stream from in-memory documents (name, text).
    pub fn from_documents<I, N, T>(documents: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<PathBuf>,
        T: AsRef<str>,
    {
        let mut combined = Self::default();
        for (name, text) in documents {
            combined.push_document(name.into(), text.as_ref());
        }
        combined
    }

    fn push_document(&mut self, path: PathBuf, text: &str) {
        // Documents are newline-separated so a trailing token of one document
        // cannot fuse with the first token of the next.
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        let start = self.text.len();
        self.text.push_str(text);
        let end = self.text.len();
        self.documents.push(DocumentSpan {
            path,
            span: start..end,
            digest: fnv1a64_digest_bytes(text.as_bytes()),
        });
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn documents(&self) -> &[DocumentSpan] {
        &self.documents
    }

    /// Map a byte offset of the combined text back to (document, line).
    pub fn locate(&self, offset: usize) -> SourceLocation {
        let doc = self
            .documents
            .iter()
            .rev()
            .find(|d| d.span.start <= offset)
            .or_else(|| self.documents.first());

        match doc {
            Some(doc) => {
                let end = offset.min(doc.span.end).max(doc.span.start);
                let line = self.text[doc.span.start..end]
                    .bytes()
                    .filter(|b| *b == b'\n')
                    .count()
                    + 1;
                SourceLocation {
                    document: doc.path.display().to_string(),
                    line,
                }
            }
            None => SourceLocation {
                document: "<memory>".to_string(),
                line: 1,
            },
        }
    }
}

/// Read every document of `sources`, failing fast on the first error.
pub fn load_sources(sources: &SourceSet) -> Result<CombinedSource, SourceError> {
    if sources.is_empty() {
        return Err(SourceError::NoDocuments);
    }

    let mut combined = CombinedSource::default();
    // Spans record the path as configured, not the resolved one.
    for (name, path) in sources.documents.iter().zip(sources.resolved_paths()) {
        let bytes = std::fs::read(&path).map_err(|source| SourceError::Read {
            path: path.clone(),
            source,
        })?;
        let text =
            String::from_utf8(bytes).map_err(|_| SourceError::NotUtf8 { path: path.clone() })?;
        tracing::debug!(path = %path.display(), bytes = text.len(), "loaded ontology document");
        combined.push_document(name.clone(), &text);
    }

    Ok(combined)
}
