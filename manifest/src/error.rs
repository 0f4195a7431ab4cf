use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating, parsing or validating a plugin manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file does not exist.
    #[error("manifest not found: {0}")]
    NotFound(PathBuf),

    /// The file exists but is not valid JSON.
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),

    /// The JSON parsed but a required field is missing, empty or malformed.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// The declared shared object does not resolve to an existing file.
    #[error("shared library missing: {0}")]
    LibraryMissing(PathBuf),

    /// Two manifests in the search path declare the same plugin id.
    #[error("duplicate plugin id {id:?} (already loaded from {first})", first = .first.display())]
    DuplicateId {
        /// The contested plugin id.
        id: String,
        /// The manifest that won by discovery order.
        first: PathBuf,
    },

    /// An underlying filesystem error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
