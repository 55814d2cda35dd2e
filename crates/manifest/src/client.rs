//! Kubernetes-backed cluster client.
//!
//! Resolves each document's group/version/kind through API discovery and
//! talks to the API server through a `DynamicObject` API. Discovery results are
//! cached per kind for the life of the client. Writes use server-side apply
//! with a fixed field manager, which makes repeated applies of the same
//! document a no-op.

use crate::client_trait::ClusterClient;
use crate::document::{Document, ObjectKey};
use crate::error::ManifestError;
use kube::api::{Api, DeleteParams, DynamicObject, Patch, PatchParams};
use kube::core::GroupVersionKind;
use kube::discovery::{self, ApiResource, Scope};
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Field manager recorded on every applied field.
pub const FIELD_MANAGER: &str = "eventing-operator";

/// Resolved resources per group/version/kind
#[derive(Debug, Default)]
struct DiscoveryCache {
    resources: Mutex<HashMap<GroupVersionKind, (ApiResource, Scope)>>,
}

impl DiscoveryCache {
    fn get(&self, gvk: &GroupVersionKind) -> Option<(ApiResource, Scope)> {
        self.resources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(gvk)
            .cloned()
    }

    fn insert(&self, gvk: GroupVersionKind, resource: ApiResource, scope: Scope) {
        self.resources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(gvk, (resource, scope));
    }
}

/// Cluster client backed by a kube [`Client`]
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
    discovered: Arc<DiscoveryCache>,
}

impl std::fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterClient").finish_non_exhaustive()
    }
}

impl KubeClusterClient {
    /// Creates a new cluster client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            discovered: Arc::new(DiscoveryCache::default()),
        }
    }

    async fn resolve(&self, key: &ObjectKey) -> Result<(ApiResource, Scope), ManifestError> {
        let gvk = parse_gvk(&key.api_version, &key.kind);
        if let Some(resolved) = self.discovered.get(&gvk) {
            return Ok(resolved);
        }
        let (resource, capabilities) = discovery::pinned_kind(&self.client, &gvk)
            .await
            .map_err(|e| ManifestError::Discovery {
                kind: format!("{}/{}", key.api_version, key.kind),
                source: e,
            })?;
        self.discovered.insert(gvk, resource.clone(), capabilities.scope.clone());
        Ok((resource, capabilities.scope))
    }

    async fn api_for(&self, key: &ObjectKey) -> Result<Api<DynamicObject>, ManifestError> {
        let (resource, scope) = self.resolve(key).await?;
        let api = match (scope, key.namespace.as_deref()) {
            (Scope::Namespaced, Some(ns)) => Api::namespaced_with(self.client.clone(), ns, &resource),
            (Scope::Namespaced, None) => Api::default_namespaced_with(self.client.clone(), &resource),
            (Scope::Cluster, _) => Api::all_with(self.client.clone(), &resource),
        };
        Ok(api)
    }
}

#[async_trait::async_trait]
impl ClusterClient for KubeClusterClient {
    async fn apply(&self, document: &Document) -> Result<(), ManifestError> {
        let key = document.key();
        debug!("Applying {}", key);
        let api = self.api_for(&key).await?;
        let params = PatchParams::apply(FIELD_MANAGER).force();
        api.patch(&key.name, &params, &Patch::Apply(document))
            .await
            .map_err(|e| map_kube_error(&key, e))?;
        Ok(())
    }

    async fn delete(&self, document: &Document) -> Result<(), ManifestError> {
        let key = document.key();
        debug!("Deleting {}", key);
        let api = self.api_for(&key).await?;
        api.delete(&key.name, &DeleteParams::background())
            .await
            .map_err(|e| map_kube_error(&key, e))?;
        Ok(())
    }

    async fn get(&self, key: &ObjectKey) -> Result<Document, ManifestError> {
        let api = self.api_for(key).await?;
        let object = api.get(&key.name).await.map_err(|e| map_kube_error(key, e))?;
        Document::from_value(serde_json::to_value(object)?)
    }
}

/// Splits an apiVersion ("apps/v1" or "v1") into a GroupVersionKind.
fn parse_gvk(api_version: &str, kind: &str) -> GroupVersionKind {
    match api_version.split_once('/') {
        Some((group, version)) => GroupVersionKind::gvk(group, version, kind),
        None => GroupVersionKind::gvk("", api_version, kind),
    }
}

fn map_kube_error(key: &ObjectKey, error: kube::Error) -> ManifestError {
    match error {
        kube::Error::Api(ref response) if response.code == 404 => ManifestError::NotFound(key.to_string()),
        other => ManifestError::Kube(other),
    }
}
