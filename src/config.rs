//! Configuration file
//!
//! One JSON document holding the sandbox root and a section per subsystem.
//! Every section is optional; `root` is required unless supplied on the
//! command line.
//!
//! ```json
//! {
//!   "root": "/srv/lake",
//!   "query": { "default_limit": 10, "max_limit": 100 },
//!   "http": { "port": 8000 },
//!   "access": { "grants": [{ "principal": "alice", "path": "orders" }] },
//!   "log": { "level": "info", "format": "json" }
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::{AccessConfig, MemoryAccessGate};
use crate::http_server::HttpServerConfig;
use crate::observability::LogConfig;
use crate::query::{PathResolver, QueryConfig, QueryService};

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Sandbox root directory
    #[serde(default)]
    pub root: PathBuf,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub http: HttpServerConfig,

    #[serde(default)]
    pub access: AccessConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse without validating; overrides are applied before `validate`
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Replace the sandbox root
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "root is required (set it in the config file or pass --root)".to_string(),
            ));
        }

        self.query.validate().map_err(ConfigError::Invalid)?;
        self.http.validate().map_err(ConfigError::Invalid)?;
        self.access.validate().map_err(ConfigError::Invalid)?;

        Ok(())
    }

    /// Build the query service this configuration describes.
    ///
    /// Fails if the root does not exist or is not a directory.
    pub fn build_service(&self) -> Result<QueryService, ConfigError> {
        let resolver =
            PathResolver::new(&self.root).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let gate = MemoryAccessGate::from_config(&self.access);
        Ok(QueryService::new(resolver, self.query.clone(), Arc::new(gate)))
    }
}
