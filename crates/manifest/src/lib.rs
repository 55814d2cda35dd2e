//! Resource bundle ("manifest") support
//!
//! Loads an ordered bundle of Kubernetes resource documents from YAML, rewrites
//! it through a chain of transformers and applies or deletes it against a
//! cluster.
//!
//! # Example
//!
//! ```no_run
//! use manifest::{inject_namespace, KubeClusterClient, Manifest};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(KubeClusterClient::new(kube::Client::try_default().await?));
//! let bundle = Manifest::from_path("deploy/resources", false, client)?;
//! bundle.transform(&[inject_namespace("knative-eventing")])?.apply_all().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Typed documents**: nested field access with explicit errors on unexpected shapes
//! - **Transformers**: owner and namespace injection, composable with custom rewrites
//! - **Idempotent apply**: server-side apply in bundle order, deletion in reverse order
//! - **Mocking**: an in-memory cluster behind the `test-util` feature

pub mod client;
pub mod document;
pub mod error;
pub mod loader;
pub mod manifest;
#[path = "trait.rs"]
pub mod client_trait;
pub mod transform;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubeClusterClient;
pub use client_trait::ClusterClient;
pub use document::{Document, ObjectKey};
pub use error::ManifestError;
pub use manifest::Manifest;
pub use transform::{inject_namespace, inject_owner, Transformer};
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockClusterClient;
