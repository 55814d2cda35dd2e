//! Automatic install.
//!
//! When a bootstrap namespace is configured, a one-shot task makes sure at
//! least one request exists there by applying the profile's default request
//! document. It runs beside the controllers; its errors are logged only.

use crate::client::RequestClient;
use crate::error::ControllerError;
use crds::InstallRequest;
use kube::ResourceExt;
use manifest::{inject_namespace, ClusterClient, Manifest};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// What the bootstrap task found or did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bootstrap {
    /// A request already existed; holds its name
    Existing(String),
    /// The default request document was applied
    Created,
}

/// Spawns the bootstrap task for `namespace`.
pub fn spawn<K: InstallRequest>(
    requests: Arc<dyn RequestClient<K>>,
    cluster: Arc<dyn ClusterClient>,
    namespace: String,
    path: PathBuf,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = ensure_request(requests.as_ref(), cluster, &namespace, path).await {
            error!("Automatic install in namespace {} failed: {}", namespace, e);
        }
    })
}

/// Applies the default request document into `namespace` unless a request
/// already exists there.
pub async fn ensure_request<K: InstallRequest>(
    requests: &dyn RequestClient<K>,
    cluster: Arc<dyn ClusterClient>,
    namespace: &str,
    path: PathBuf,
) -> Result<Bootstrap, ControllerError> {
    info!("Automatic install requested in namespace {}", namespace);

    if let Some(existing) = requests.list(namespace).await?.first() {
        let name = existing.name_any();
        info!("Found existing request {}/{}", namespace, name);
        return Ok(Bootstrap::Existing(name));
    }

    let manifest = Manifest::from_path(&path, false, cluster)?;
    manifest.transform(&[inject_namespace(namespace)])?.apply_all().await?;
    info!("Created request from {} in namespace {}", path.display(), namespace);
    Ok(Bootstrap::Created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_install, MockRequestClient};
    use crds::Install;
    use manifest::{MockClusterClient, ObjectKey};
    use std::io::Write;

    const DEFAULT_REQUEST: &str = "\
apiVersion: operator.eventing.knative.dev/v1alpha1
kind: Install
metadata:
  name: knative-eventing-install
  namespace: default
";

    fn request_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(DEFAULT_REQUEST.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_creates_request_in_empty_namespace() {
        let requests = MockRequestClient::<Install>::new();
        let cluster = Arc::new(MockClusterClient::new());
        let file = request_file();

        let outcome = ensure_request(
            &requests,
            Arc::clone(&cluster) as Arc<dyn ClusterClient>,
            "knative-eventing",
            file.path().to_path_buf(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, Bootstrap::Created);
        assert_eq!(
            cluster.applied(),
            vec![ObjectKey::namespaced(
                "operator.eventing.knative.dev/v1alpha1",
                "Install",
                "knative-eventing",
                "knative-eventing-install"
            )]
        );
    }

    #[tokio::test]
    async fn test_existing_request_is_left_alone() {
        let requests = MockRequestClient::<Install>::new();
        requests.insert(create_test_install("custom", "knative-eventing", None));
        let cluster = Arc::new(MockClusterClient::new());
        let file = request_file();

        let outcome = ensure_request(
            &requests,
            Arc::clone(&cluster) as Arc<dyn ClusterClient>,
            "knative-eventing",
            file.path().to_path_buf(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, Bootstrap::Existing("custom".to_string()));
        assert_eq!(cluster.apply_count(), 0);
        assert_eq!(requests.count(), 1);
    }

    #[tokio::test]
    async fn test_requests_in_other_namespaces_do_not_count() {
        let requests = MockRequestClient::<Install>::new();
        requests.insert(create_test_install("custom", "elsewhere", None));
        let cluster = Arc::new(MockClusterClient::new());
        let file = request_file();

        let outcome = ensure_request(
            &requests,
            Arc::clone(&cluster) as Arc<dyn ClusterClient>,
            "knative-eventing",
            file.path().to_path_buf(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, Bootstrap::Created);
        assert_eq!(cluster.apply_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_request_file_is_an_error() {
        let requests = MockRequestClient::<Install>::new();
        let cluster = Arc::new(MockClusterClient::new());

        let err = ensure_request(
            &requests,
            cluster as Arc<dyn ClusterClient>,
            "knative-eventing",
            PathBuf::from("/nonexistent/install_cr.yaml"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ControllerError::Manifest(_)));
    }
}
