//! Access to the install requests themselves.
//!
//! The engine only needs three calls on its own custom resources, so they sit
//! behind a small trait that tests replace with an in-memory store.

use crate::error::ControllerError;
use crds::InstallRequest;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::Client;
use serde_json::json;
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

/// Reads install requests and writes their status subresource
#[async_trait::async_trait]
pub trait RequestClient<K: InstallRequest>: Send + Sync {
    /// Fetch a request; a missing request is [`ControllerError::NotFound`].
    async fn get(&self, namespace: &str, name: &str) -> Result<K, ControllerError>;

    /// List the requests in a namespace.
    async fn list(&self, namespace: &str) -> Result<Vec<K>, ControllerError>;

    /// Write the request's status subresource (single attempt).
    async fn update_status(&self, request: &K) -> Result<(), ControllerError>;
}

/// [`RequestClient`] backed by the Kubernetes API
pub struct KubeRequestClient<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> fmt::Debug for KubeRequestClient<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeRequestClient").finish_non_exhaustive()
    }
}

impl<K: InstallRequest> KubeRequestClient<K> {
    /// Creates a new request client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }

    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl<K: InstallRequest> RequestClient<K> for KubeRequestClient<K> {
    async fn get(&self, namespace: &str, name: &str) -> Result<K, ControllerError> {
        match self.api(namespace).get(name).await {
            Ok(request) => Ok(request),
            Err(kube::Error::Api(response)) if response.code == 404 => {
                Err(ControllerError::NotFound(format!("{namespace}/{name}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, namespace: &str) -> Result<Vec<K>, ControllerError> {
        let list = self.api(namespace).list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn update_status(&self, request: &K) -> Result<(), ControllerError> {
        let meta = request.meta();
        let namespace = meta.namespace.as_deref().unwrap_or_default();
        let name = meta.name.as_deref().unwrap_or_default();
        let patch = json!({ "status": request.install_status() });
        self.api(namespace)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        debug!("Updated status of {}/{}", namespace, name);
        Ok(())
    }
}
