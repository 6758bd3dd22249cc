//! Typed errors. The loader's return-code policy still produces
//! exactly the booleans and counters the base spec describes; these types
//! are an additional, richer channel layered on top of that policy.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityStage {
    File,
    Segment,
}

impl std::fmt::Display for IntegrityStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityStage::File => write!(f, "file"),
            IntegrityStage::Segment => write!(f, "segment"),
        }
    }
}

/// Failure to resolve and instantiate a plugin constructor.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no constructor symbol for plugin '{name}'")]
    NotFound { name: String },

    #[error("constructor for plugin '{name}' returned null")]
    ConstructorFailed { name: String },

    #[error("{stage} integrity check failed for plugin '{name}'")]
    IntegrityFailed { name: String, stage: IntegrityStage },

    #[error("failed to open shared object: {0}")]
    Open(#[from] libloading::Error),
}

/// Surfaced when a critical plugin aborts the whole `load()` call.
#[derive(Debug, Error)]
#[error("critical plugin '{name}' failed to load: {source}")]
pub struct LoadError {
    pub name: String,
    #[source]
    pub source: ResolveError,
}

/// Malformed configuration input.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("plugin name '{0}' is empty after normalization")]
    EmptyName(String),

    #[error("search path does not exist: {0}")]
    MissingPath(PathBuf),
}
