//! Controller-specific error types.
//!
//! Bundle failures keep their [`ManifestError`] so callers can still tell a
//! missing resource from a rejected one.

use kube::Error as KubeError;
use manifest::ManifestError;
use thiserror::Error;

/// Errors that can occur in the eventing operator.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Bundle load, transform or apply error
    #[error("{0}")]
    Manifest(#[from] ManifestError),

    /// Install request not found
    #[error("Install request not found: {0}")]
    NotFound(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Returns true when the request (or a bundle resource) does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Manifest(e) => e.is_not_found(),
            _ => false,
        }
    }
}
