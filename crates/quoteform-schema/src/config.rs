//! Compiler configuration (JSON).

use crate::classify::{ClassRule, ClassificationTable};
use quoteform_ontology::vocab::DEFAULT_PREFIXES;
use quoteform_ontology::{SourceSet, Vocabulary, VocabularyError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ONTOLOGY_DIR: &str = "ontology";

/// Knowledge-base documents, in the order they are concatenated.
pub const DEFAULT_DOCUMENTS: &[&str] = &[
    "AI_Driver_Details.ttl",
    "AI_Vehicle_Details.ttl",
    "AI_Claims_History.ttl",
    "user_ux.ttl",
    "user_documents.ttl",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Directory that relative document paths are resolved against.
    pub ontology_dir: PathBuf,
    pub documents: Vec<PathBuf>,
    pub accepted_prefixes: Vec<String>,
    /// Rows added to (or extending) the default classification table.
    pub extra_classes: Vec<ClassRule>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            ontology_dir: PathBuf::from(DEFAULT_ONTOLOGY_DIR),
            documents: DEFAULT_DOCUMENTS.iter().map(PathBuf::from).collect(),
            accepted_prefixes: DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
            extra_classes: Vec::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),
    #[error("config lists no ontology documents")]
    NoDocuments,
}

impl CompilerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check the parts of the config that every compile depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.documents.is_empty() {
            return Err(ConfigError::NoDocuments);
        }
        self.vocabulary()?;
        Ok(())
    }

    pub fn vocabulary(&self) -> Result<Vocabulary, ConfigError> {
        Ok(Vocabulary::new(self.accepted_prefixes.iter().cloned())?)
    }

    pub fn source_set(&self) -> SourceSet {
        SourceSet::new(self.ontology_dir.clone(), self.documents.clone())
    }

    pub fn classification_table(&self) -> ClassificationTable {
        ClassificationTable::default().with_rules(self.extra_classes.iter().cloned())
    }
}
