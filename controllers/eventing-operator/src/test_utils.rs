//! Test utilities for unit testing the convergence engine
//!
//! This module provides an in-memory request store and helpers for building
//! requests and bundles.

use crate::client::RequestClient;
use crate::error::ControllerError;
use crds::{Install, InstallRequest, InstallSpec, KnativeEventing, KnativeEventingSpec};
use kube::ResourceExt;
use manifest::{ClusterClient, Document, Manifest, ManifestError, MockClusterClient};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// In-memory [`RequestClient`]
#[derive(Debug)]
pub struct MockRequestClient<K> {
    requests: Mutex<BTreeMap<(String, String), K>>,
    status_updates: Mutex<Vec<K>>,
    get_failure: Mutex<Option<String>>,
}

impl<K: InstallRequest> MockRequestClient<K> {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(BTreeMap::new()),
            status_updates: Mutex::new(Vec::new()),
            get_failure: Mutex::new(None),
        }
    }

    pub fn insert(&self, request: K) {
        let key = (request.namespace().unwrap_or_default(), request.name_any());
        self.requests.lock().unwrap().insert(key, request);
    }

    pub fn remove(&self, namespace: &str, name: &str) {
        self.requests.lock().unwrap().remove(&(namespace.to_string(), name.to_string()));
    }

    pub fn stored(&self, namespace: &str, name: &str) -> Option<K> {
        self.requests.lock().unwrap().get(&(namespace.to_string(), name.to_string())).cloned()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests passed to `update_status`, in call order
    pub fn status_updates(&self) -> Vec<K> {
        self.status_updates.lock().unwrap().clone()
    }

    pub fn fail_get(&self, message: &str) {
        *self.get_failure.lock().unwrap() = Some(message.to_string());
    }
}

#[async_trait::async_trait]
impl<K: InstallRequest> RequestClient<K> for MockRequestClient<K> {
    async fn get(&self, namespace: &str, name: &str) -> Result<K, ControllerError> {
        if let Some(message) = self.get_failure.lock().unwrap().clone() {
            return Err(ControllerError::Manifest(ManifestError::Api(message)));
        }
        self.stored(namespace, name)
            .ok_or_else(|| ControllerError::NotFound(format!("{namespace}/{name}")))
    }

    async fn list(&self, namespace: &str) -> Result<Vec<K>, ControllerError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, request)| request.clone())
            .collect())
    }

    async fn update_status(&self, request: &K) -> Result<(), ControllerError> {
        self.status_updates.lock().unwrap().push(request.clone());
        let key = (request.namespace().unwrap_or_default(), request.name_any());
        let mut requests = self.requests.lock().unwrap();
        let stored = requests
            .get_mut(&key)
            .ok_or_else(|| ControllerError::NotFound(format!("{}/{}", key.0, key.1)))?;
        *stored.install_status_mut() = request.install_status().cloned().unwrap_or_default();
        Ok(())
    }
}

/// Helper to create a test KnativeEventing request
pub fn create_test_knative_eventing(name: &str, namespace: &str) -> KnativeEventing {
    let mut request = KnativeEventing::new(name, KnativeEventingSpec::default());
    request.metadata.namespace = Some(namespace.to_string());
    request.metadata.uid = Some(format!("uid-{name}"));
    request
}

/// Helper to create a test Install request
pub fn create_test_install(name: &str, namespace: &str, target: Option<&str>) -> Install {
    let mut request = Install::new(
        name,
        InstallSpec {
            namespace: target.map(str::to_string),
        },
    );
    request.metadata.namespace = Some(namespace.to_string());
    request.metadata.uid = Some(format!("uid-{name}"));
    request
}

pub fn document(value: Value) -> Document {
    Document::from_value(value).unwrap()
}

pub fn config_map(name: &str) -> Document {
    document(json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {"name": name, "namespace": "knative-eventing"},
        "data": {"loglevel": "info"}
    }))
}

pub fn deployment(name: &str) -> Document {
    document(json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {"name": name, "namespace": "knative-eventing"},
        "spec": {"replicas": 1}
    }))
}

pub fn cluster_role(name: &str) -> Document {
    document(json!({
        "apiVersion": "rbac.authorization.k8s.io/v1",
        "kind": "ClusterRole",
        "metadata": {"name": name},
        "rules": [{"apiGroups": [""], "resources": ["pods"], "verbs": ["get", "list", "watch"]}]
    }))
}

/// Bundle bound to a mock cluster
pub fn bundle(client: &Arc<MockClusterClient>, resources: Vec<Document>) -> Arc<Manifest> {
    Arc::new(Manifest::new(resources, Arc::clone(client) as Arc<dyn ClusterClient>))
}

/// Sets the Available condition of a Deployment stored in the mock cluster
pub fn set_available(client: &MockClusterClient, deployment: &Document, available: bool) {
    client
        .set_field(
            &deployment.key(),
            &["status", "conditions"],
            json!([{"type": "Available", "status": if available { "True" } else { "False" }}]),
        )
        .unwrap();
}
