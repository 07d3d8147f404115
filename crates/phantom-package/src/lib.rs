//! Phantom package manifest
//!
//! Reads the parts of `package.json` the build engine cares about: the
//! direct and peer dependency names (used to decide which imports stay
//! external) and the pinned runtime-helper version.

pub mod manifest;

pub use manifest::{DependencyManifest, RUNTIME_HELPER_PACKAGE};

use std::path::PathBuf;

/// Manifest loading errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest at {path}: {error}")]
    ReadError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Malformed manifest: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field value: {field} - {reason}")]
    InvalidField { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ManifestError>;
