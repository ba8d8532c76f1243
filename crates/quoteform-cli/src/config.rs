//! CLI configuration file and override layering.
//!
//! Precedence, lowest first: built-in defaults, `--config <file.json>`,
//! `QUOTEFORM_ONTOLOGY_DIR`, explicit command-line flags. The environment
//! variable is bound to `--ontology-dir` through clap, so the last two layers
//! resolve to one optional value.

use anyhow::{Context, Result};
use quoteform_schema::CompilerConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    pub listen: SocketAddr,
    /// Poll interval for `--watch`.
    pub watch_interval_secs: u64,
    /// 0 disables the compile timeout.
    pub compile_timeout_secs: u64,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            watch_interval_secs: 2,
            compile_timeout_secs: 30,
        }
    }
}

impl ServeConfig {
    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs.max(1))
    }

    pub fn compile_timeout(&self) -> Option<Duration> {
        (self.compile_timeout_secs > 0).then(|| Duration::from_secs(self.compile_timeout_secs))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub compiler: CompilerConfig,
    pub serve: ServeConfig,
}

/// Overrides collected from flags and the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub ontology_dir: Option<PathBuf>,
    pub documents: Vec<PathBuf>,
    pub accepted_prefixes: Vec<String>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn resolve(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        config
            .compiler
            .validate()
            .context("invalid compiler configuration")?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(dir) = &overrides.ontology_dir {
            self.compiler.ontology_dir = dir.clone();
        }
        if !overrides.documents.is_empty() {
            self.compiler.documents = overrides.documents.clone();
        }
        if !overrides.accepted_prefixes.is_empty() {
            self.compiler.accepted_prefixes = overrides.accepted_prefixes.clone();
        }
    }
}
