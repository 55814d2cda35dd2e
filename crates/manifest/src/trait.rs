//! ClusterClient trait for mocking
//!
//! This trait abstracts the cluster access a bundle needs so the convergence
//! logic can be unit tested without a running API server. The concrete
//! [`crate::KubeClusterClient`] implements it, tests use
//! [`crate::MockClusterClient`].

use crate::document::{Document, ObjectKey};
use crate::error::ManifestError;

/// Create-or-update, delete and read of arbitrary resource kinds
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
/// Implementations report a missing resource as [`ManifestError::NotFound`].
#[async_trait::async_trait]
pub trait ClusterClient: Send + Sync {
    /// Creates the resource or brings it in line with `document`.
    async fn apply(&self, document: &Document) -> Result<(), ManifestError>;

    /// Deletes the resource identified by `document`.
    async fn delete(&self, document: &Document) -> Result<(), ManifestError>;

    /// Reads the live state of a resource.
    async fn get(&self, key: &ObjectKey) -> Result<Document, ManifestError>;
}
