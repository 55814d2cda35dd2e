//! Manifest errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, transforming or applying a bundle
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Bundle source could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File or directory being read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Bundle source is not valid YAML
    #[error("Failed to parse {path}: {source}")]
    Yaml {
        /// File being parsed
        path: PathBuf,
        /// Underlying parse error
        source: serde_yaml::Error,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Cluster rejected a request (used by clients without a kube transport)
    #[error("Cluster API error: {0}")]
    Api(String),

    /// API group/version/kind could not be resolved
    #[error("Failed to discover {kind}: {source}")]
    Discovery {
        /// Kind being resolved
        kind: String,
        /// Underlying discovery error
        source: kube::Error,
    },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Document has an unexpected shape
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// A transformer refused a document
    #[error("Transform failed for {resource}: {reason}")]
    Transform {
        /// Resource the transformer was applied to
        resource: String,
        /// Why it was refused
        reason: String,
    },
}

impl ManifestError {
    /// Returns true for not-found errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
