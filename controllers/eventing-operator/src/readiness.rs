//! Deployment readiness aggregation.

use manifest::{ClusterClient, Document, ManifestError, ObjectKey};
use serde_json::Value;
use tracing::debug;

/// Aggregate readiness of a bundle's Deployments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Every Deployment reports `Available=True`
    Available,
    /// The first Deployment found missing or unavailable
    NotReady {
        /// Identity of that Deployment
        key: ObjectKey,
    },
}

impl Readiness {
    /// Condition message for a not-ready bundle.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Available => None,
            Self::NotReady { key } => Some(format!("{key} is not available")),
        }
    }
}

/// Checks every `Deployment` of `resources`, in bundle order.
///
/// Stops at the first Deployment that is missing or lacks an `Available=True`
/// condition. Any other lookup error is returned as is; the caller cannot
/// tell whether the bundle is ready.
pub async fn check_deployments(
    resources: &[Document],
    client: &dyn ClusterClient,
) -> Result<Readiness, ManifestError> {
    for document in resources.iter().filter(|d| d.kind() == "Deployment") {
        let key = document.key();
        match client.get(&key).await {
            Ok(live) if is_available(&live)? => debug!("{} is available", key),
            Ok(_) => return Ok(Readiness::NotReady { key }),
            Err(e) if e.is_not_found() => return Ok(Readiness::NotReady { key }),
            Err(e) => return Err(e),
        }
    }
    Ok(Readiness::Available)
}

fn is_available(deployment: &Document) -> Result<bool, ManifestError> {
    let Some(conditions) = deployment.nested_field(&["status", "conditions"])? else {
        return Ok(false);
    };
    Ok(conditions.as_array().is_some_and(|conditions| {
        conditions.iter().any(|c| {
            c.get("type").and_then(Value::as_str) == Some("Available")
                && c.get("status").and_then(Value::as_str) == Some("True")
        })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use manifest::MockClusterClient;
    use serde_json::json;

    fn deployment(name: &str) -> Document {
        Document::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": name, "namespace": "knative-eventing"}
        }))
        .unwrap()
    }

    fn with_available(mut document: Document, status: &str) -> Document {
        document
            .set_nested_field(
                &["status", "conditions"],
                json!([
                    {"type": "Progressing", "status": "True"},
                    {"type": "Available", "status": status}
                ]),
            )
            .unwrap();
        document
    }

    fn bundle() -> Vec<Document> {
        vec![
            Document::from_value(json!({
                "apiVersion": "v1", "kind": "ConfigMap",
                "metadata": {"name": "config-logging", "namespace": "knative-eventing"}
            }))
            .unwrap(),
            deployment("eventing-controller"),
            deployment("eventing-webhook"),
            deployment("imc-controller"),
        ]
    }

    #[tokio::test]
    async fn test_first_missing_deployment_short_circuits() {
        let client = MockClusterClient::new();
        client.insert(with_available(deployment("eventing-webhook"), "True"));
        client.insert(with_available(deployment("imc-controller"), "True"));

        let readiness = check_deployments(&bundle(), &client).await.unwrap();

        assert_eq!(client.lookups().len(), 1);
        assert_eq!(
            readiness,
            Readiness::NotReady {
                key: ObjectKey::namespaced("apps/v1", "Deployment", "knative-eventing", "eventing-controller")
            }
        );
    }

    #[tokio::test]
    async fn test_unavailable_deployment_is_not_ready() {
        let client = MockClusterClient::new();
        client.insert(with_available(deployment("eventing-controller"), "True"));
        client.insert(with_available(deployment("eventing-webhook"), "False"));

        let readiness = check_deployments(&bundle(), &client).await.unwrap();

        assert_eq!(client.lookups().len(), 2);
        assert_eq!(
            readiness.message().as_deref(),
            Some("Deployment knative-eventing/eventing-webhook is not available")
        );
    }

    #[tokio::test]
    async fn test_all_available() {
        let client = MockClusterClient::new();
        for d in bundle().into_iter().filter(|d| d.kind() == "Deployment") {
            client.insert(with_available(d, "True"));
        }

        let readiness = check_deployments(&bundle(), &client).await.unwrap();

        assert_eq!(readiness, Readiness::Available);
        assert_eq!(client.lookups().len(), 3);
    }

    #[tokio::test]
    async fn test_lookup_error_propagates() {
        let client = MockClusterClient::new();
        client.fail_get("Deployment", "eventing-controller", "connection refused");

        let err = check_deployments(&bundle(), &client).await.unwrap_err();

        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_bundle_without_deployments_is_available() {
        let client = MockClusterClient::new();
        let readiness = check_deployments(&bundle()[..1], &client).await.unwrap();
        assert_eq!(readiness, Readiness::Available);
        assert!(client.lookups().is_empty());
    }
}
