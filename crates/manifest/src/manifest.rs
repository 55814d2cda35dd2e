//! The resource bundle.

use crate::client_trait::ClusterClient;
use crate::document::Document;
use crate::error::ManifestError;
use crate::loader;
use crate::transform::Transformer;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// An ordered bundle of resource documents bound to a cluster client
///
/// Cloning is cheap for the client (shared) and copies the documents, so a
/// transformed bundle never aliases the bundle it was derived from.
#[derive(Clone)]
pub struct Manifest {
    resources: Vec<Document>,
    client: Arc<dyn ClusterClient>,
}

impl fmt::Debug for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manifest")
            .field("resources", &self.resources.len())
            .finish_non_exhaustive()
    }
}

impl Manifest {
    /// Creates a bundle from documents already in memory.
    pub fn new(resources: Vec<Document>, client: Arc<dyn ClusterClient>) -> Self {
        Self { resources, client }
    }

    /// Loads a bundle from a file or directory.
    pub fn from_path(
        path: impl AsRef<Path>,
        recursive: bool,
        client: Arc<dyn ClusterClient>,
    ) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let resources = loader::load_path(path, recursive)?;
        info!("Loaded {} resources from {}", resources.len(), path.display());
        Ok(Self::new(resources, client))
    }

    /// Documents in bundle order.
    pub fn resources(&self) -> &[Document] {
        &self.resources
    }

    /// Client the bundle is applied through.
    pub fn client(&self) -> Arc<dyn ClusterClient> {
        Arc::clone(&self.client)
    }

    /// Returns a copy of the bundle with `transformers` applied, in order, to
    /// every document.
    ///
    /// The first error aborts the whole transform and nothing is returned.
    pub fn transform(&self, transformers: &[Transformer]) -> Result<Self, ManifestError> {
        let mut resources = self.resources.clone();
        for document in &mut resources {
            for transform in transformers {
                transform(document)?;
            }
        }
        Ok(Self {
            resources,
            client: Arc::clone(&self.client),
        })
    }

    /// Applies every document in bundle order, stopping at the first failure.
    pub async fn apply_all(&self) -> Result<(), ManifestError> {
        for document in &self.resources {
            self.client.apply(document).await?;
        }
        debug!("Applied {} resources", self.resources.len());
        Ok(())
    }

    /// Deletes every document in reverse bundle order.
    ///
    /// Resources that are already gone are skipped.
    pub async fn delete_all(&self) -> Result<(), ManifestError> {
        for document in self.resources.iter().rev() {
            match self.client.delete(document).await {
                Ok(()) => debug!("Deleted {}", document.describe()),
                Err(e) if e.is_not_found() => debug!("{} already deleted", document.describe()),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ObjectKey;
    use crate::mock::MockClusterClient;
    use crate::transform::inject_namespace;
    use serde_json::json;

    fn bundle(client: Arc<MockClusterClient>) -> Manifest {
        let docs = vec![
            Document::from_value(json!({
                "apiVersion": "v1", "kind": "ConfigMap",
                "metadata": {"name": "config", "namespace": "knative-eventing"}
            }))
            .unwrap(),
            Document::from_value(json!({
                "apiVersion": "apps/v1", "kind": "Deployment",
                "metadata": {"name": "svc", "namespace": "knative-eventing"}
            }))
            .unwrap(),
        ];
        Manifest::new(docs, client)
    }

    #[test]
    fn test_transform_does_not_touch_source() {
        let manifest = bundle(Arc::new(MockClusterClient::new()));
        let moved = manifest.transform(&[inject_namespace("eventing")]).unwrap();

        assert!(moved.resources().iter().all(|d| d.namespace() == Some("eventing")));
        assert!(manifest.resources().iter().all(|d| d.namespace() == Some("knative-eventing")));
    }

    #[test]
    fn test_transform_error_aborts() {
        let manifest = bundle(Arc::new(MockClusterClient::new()));
        let refuse: Transformer = Box::new(|d: &mut Document| {
            Err(ManifestError::Transform {
                resource: d.describe(),
                reason: "refused".to_string(),
            })
        });

        let err = manifest.transform(&[refuse]).unwrap_err();
        assert!(matches!(err, ManifestError::Transform { ref resource, .. } if resource == "ConfigMap knative-eventing/config"));
    }

    #[tokio::test]
    async fn test_apply_all_is_idempotent() {
        let client = Arc::new(MockClusterClient::new());
        let manifest = bundle(Arc::clone(&client));

        manifest.apply_all().await.unwrap();
        manifest.apply_all().await.unwrap();

        assert_eq!(client.apply_count(), 4);
        assert_eq!(client.object_count(), 2);
    }

    #[tokio::test]
    async fn test_apply_all_stops_at_first_failure() {
        let client = Arc::new(MockClusterClient::new());
        client.fail_apply("ConfigMap", "config", "admission webhook denied");
        let manifest = bundle(Arc::clone(&client));

        let err = manifest.apply_all().await.unwrap_err();
        assert!(err.to_string().contains("admission webhook denied"));
        assert_eq!(client.object_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_all_reverse_order_ignores_missing() {
        let client = Arc::new(MockClusterClient::new());
        let manifest = bundle(Arc::clone(&client));
        client.insert(manifest.resources()[1].clone());

        manifest.delete_all().await.unwrap();

        let deleted: Vec<ObjectKey> = client.deleted();
        assert_eq!(deleted.len(), 2);
        assert_eq!(deleted[0].kind, "Deployment");
        assert_eq!(deleted[1].kind, "ConfigMap");
        assert_eq!(client.object_count(), 0);
    }
}
