//! Error types for the script deployment reconciler.

use crate::types::ObjectId;
use std::path::PathBuf;
use thiserror::Error;

/// Manifest and snapshot content errors
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Manifest not found: {0}")]
    NotFound(PathBuf),

    #[error("Manifest parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Manifest I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Live catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Object not found: #{0}")]
    ObjectNotFound(ObjectId),

    #[error("Object #{0} is not a script")]
    NotAScript(ObjectId),

    #[error("Object #{0} is not a container")]
    NotAContainer(ObjectId),

    #[error("Catalog storage error: {0}")]
    Storage(String),

    #[error("Catalog I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Snapshot synchronization errors
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Command `{command}` failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Revision {0} is not available from the source")]
    RevisionUnavailable(String),

    #[error("Source not configured: {0}")]
    NotConfigured(String),

    #[error("Source manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Snapshot I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Instance lock errors
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Lock file {path} unusable: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error for check, adjustment and CLI commands
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Lock error: {0}")]
    Lock(#[from] LockError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Tracked file not found: {0}")]
    TrackedFileNotFound(String),

    #[error("Autoload file already exists: {0}")]
    AutoloadExists(PathBuf),

    #[error("Instance is disabled: {0}")]
    InstanceDisabled(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
