//! The convergence engine.
//!
//! One engine instance serves one request kind. Every reconcile fetches the
//! request, derives a transformed copy of the shared base bundle and runs the
//! profile's stages against it. The base bundle itself is never mutated.
//!
//! Mutable engine state (the per-request applied bundles and backoff states)
//! lives behind `std::sync::Mutex` and is never held across an `.await`.
//! Reconciles and deletion teardowns of the same request are serialized by a
//! per-request async lock.

use crate::backoff::BackoffState;
use crate::client::RequestClient;
use crate::error::ControllerError;
use crate::platform::add_scc_for_cluster_roles;
use crate::profile::{Profile, Stage};
use crate::readiness::{self, Readiness};
use crds::{InstallRequest, InstallStatus, ResourceReference};
use kube::ResourceExt;
use manifest::{inject_namespace, inject_owner, Document, Manifest, ManifestError, Transformer};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Version recorded in `status.version` after a successful install.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identity of an install request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    /// Namespace of the request
    pub namespace: String,
    /// Name of the request
    pub name: String,
}

impl RequestKey {
    /// Creates a key from its parts.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an existing request.
    pub fn of<K: InstallRequest>(request: &K) -> Self {
        Self::new(request.namespace().unwrap_or_default(), request.name_any())
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Result of a successful reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every stage of the profile ran
    Reconciled,
    /// The request is gone and its bundle was deleted
    TornDown,
    /// A deleted request was already replaced by a new one with the same name
    Superseded,
}

/// Drives the cluster toward the bundle described by each request of kind `K`
pub struct ConvergenceEngine<K: InstallRequest> {
    profile: &'static Profile,
    requests: Arc<dyn RequestClient<K>>,
    bundle: Arc<Manifest>,
    /// Last transformed bundle per request (namespace/name)
    applied: Mutex<HashMap<RequestKey, Manifest>>,
    /// Error backoff per request (namespace/name)
    backoff_states: Mutex<HashMap<RequestKey, BackoffState>>,
    /// Held for the whole of a reconcile or teardown of a request
    key_locks: Mutex<HashMap<RequestKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl<K: InstallRequest> fmt::Debug for ConvergenceEngine<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvergenceEngine")
            .field("kind", &self.profile.kind)
            .field("bundle", &self.bundle)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K: InstallRequest> ConvergenceEngine<K> {
    /// Creates an engine for `profile` over the shared base `bundle`.
    pub fn new(profile: &'static Profile, requests: Arc<dyn RequestClient<K>>, bundle: Arc<Manifest>) -> Self {
        Self {
            profile,
            requests,
            bundle,
            applied: Mutex::new(HashMap::new()),
            backoff_states: Mutex::new(HashMap::new()),
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Profile this engine runs.
    pub fn profile(&self) -> &'static Profile {
        self.profile
    }

    /// Converges the request identified by `key`.
    ///
    /// A request that no longer exists has its bundle deleted: the bundle last
    /// applied for it when known, the base bundle otherwise.
    pub async fn reconcile(&self, key: &RequestKey) -> Result<Outcome, ControllerError> {
        info!("Reconciling {} {}", self.profile.kind, key);
        let key_lock = self.key_lock(key);
        let _guard = key_lock.lock().await;

        let mut request = match self.requests.get(&key.namespace, &key.name).await {
            Ok(request) => request,
            Err(e) if e.is_not_found() => {
                self.teardown(key, None).await;
                return Ok(Outcome::TornDown);
            }
            Err(e) => return Err(e),
        };
        let mut persisted = request.install_status().cloned();

        for stage in self.profile.stages {
            debug!("Running {:?} stage for {} {}", stage, self.profile.kind, key);
            match stage {
                Stage::InitStatus => self.init_status(&mut request, &mut persisted).await?,
                Stage::Install => self.install(key, &mut request, &mut persisted).await?,
                Stage::CheckDeployments => self.check_deployments(key, &mut request, &mut persisted).await?,
            }
        }

        Ok(Outcome::Reconciled)
    }

    /// Deletes the bundle of a request the cluster reported as deleted.
    ///
    /// Without a record of what was applied for it, the bundle is rebuilt from
    /// the deleted object itself, so its owner and target namespace match what
    /// an earlier run installed. Nothing is deleted when a request with the
    /// same name but another uid exists by now.
    pub async fn teardown_deleted(&self, request: &K) -> Result<Outcome, ControllerError> {
        let key = RequestKey::of(request);
        let key_lock = self.key_lock(&key);
        let _guard = key_lock.lock().await;

        match self.requests.get(&key.namespace, &key.name).await {
            Ok(current) if current.uid() != request.uid() => {
                info!("{} {} was recreated, keeping its resources", self.profile.kind, key);
                return Ok(Outcome::Superseded);
            }
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        self.teardown(&key, Some(request)).await;
        Ok(Outcome::TornDown)
    }

    /// Initializes the conditions of a request seen for the first time.
    async fn init_status(&self, request: &mut K, persisted: &mut Option<InstallStatus>) -> Result<(), ControllerError> {
        let status = request.install_status_mut();
        if status.conditions.is_empty() {
            status.initialize_conditions();
            self.persist(request, persisted).await?;
        }
        Ok(())
    }

    /// Transforms the bundle for `request` and applies it unless this version
    /// already did.
    async fn install(
        &self,
        key: &RequestKey,
        request: &mut K,
        persisted: &mut Option<InstallStatus>,
    ) -> Result<(), ControllerError> {
        let transformed = match self.transformers(request).and_then(|fns| self.bundle.transform(&fns)) {
            Ok(transformed) => transformed,
            Err(e) => return self.fail_install(key, request, persisted, e).await,
        };
        lock(&self.applied).insert(key.clone(), transformed.clone());

        if request.install_status().and_then(|s| s.version.as_deref()) == Some(VERSION) {
            debug!("{} {} already installed at version {}", self.profile.kind, key, VERSION);
            return Ok(());
        }

        if let Err(e) = transformed.apply_all().await {
            return self.fail_install(key, request, persisted, e).await;
        }
        info!(
            "Installed {} resources for {} {}",
            transformed.resources().len(),
            self.profile.kind,
            key
        );

        let status = request.install_status_mut();
        status.version = Some(VERSION.to_string());
        status.resources = transformed.resources().iter().map(reference).collect();
        status.mark_install_succeeded();
        self.persist(request, persisted).await
    }

    async fn fail_install(
        &self,
        key: &RequestKey,
        request: &mut K,
        persisted: &mut Option<InstallStatus>,
        error: ManifestError,
    ) -> Result<(), ControllerError> {
        error!("Install of {} {} failed: {}", self.profile.kind, key, error);
        request.install_status_mut().mark_install_failed(&error.to_string());
        if let Err(e) = self.persist(request, persisted).await {
            warn!("Failed to record install failure of {} {}: {}", self.profile.kind, key, e);
        }
        Err(error.into())
    }

    /// Records whether every Deployment of the bundle is available.
    ///
    /// Runs whatever the install outcome was.
    async fn check_deployments(
        &self,
        key: &RequestKey,
        request: &mut K,
        persisted: &mut Option<InstallStatus>,
    ) -> Result<(), ControllerError> {
        let bundle = self.bundle_for(key);
        let client = bundle.client();
        let status = request.install_status_mut();
        match readiness::check_deployments(bundle.resources(), client.as_ref()).await? {
            Readiness::Available => status.mark_deployments_available(),
            not_ready @ Readiness::NotReady { .. } => {
                let message = not_ready.message().unwrap_or_default();
                debug!("{} {}: {}", self.profile.kind, key, message);
                status.mark_deployments_not_ready(&message);
            }
        }
        self.persist(request, persisted).await
    }

    /// Writes the request's status unless it matches what was last persisted.
    async fn persist(&self, request: &K, persisted: &mut Option<InstallStatus>) -> Result<(), ControllerError> {
        if request.install_status() == persisted.as_ref() {
            return Ok(());
        }
        self.requests.update_status(request).await?;
        *persisted = request.install_status().cloned();
        Ok(())
    }

    /// Deletes the bundle caused by a request that no longer exists.
    ///
    /// Prefers the recorded bundle, then one rebuilt from the deleted
    /// `request`, then the base bundle.
    async fn teardown(&self, key: &RequestKey, request: Option<&K>) {
        let recorded = lock(&self.applied).remove(key);
        let bundle = match (recorded, request) {
            (Some(bundle), _) => bundle,
            (None, Some(request)) => match self.transformers(request).and_then(|fns| self.bundle.transform(&fns)) {
                Ok(bundle) => bundle,
                Err(e) => {
                    warn!("Cannot rebuild bundle of {} {}, using the base bundle: {}", self.profile.kind, key, e);
                    self.bundle.as_ref().clone()
                }
            },
            (None, None) => self.bundle.as_ref().clone(),
        };
        info!(
            "{} {} not found, deleting {} resources",
            self.profile.kind,
            key,
            bundle.resources().len()
        );
        if let Err(e) = bundle.delete_all().await {
            warn!("Teardown of {} {} incomplete: {}", self.profile.kind, key, e);
        }
        self.reset_backoff(key);
    }

    fn transformers(&self, request: &K) -> Result<Vec<Transformer>, ManifestError> {
        let owner = request
            .controller_owner_ref(&())
            .ok_or_else(|| ManifestError::Transform {
                resource: format!("{} {}", self.profile.kind, RequestKey::of(request)),
                reason: "request has no uid".to_string(),
            })?;
        let mut fns = vec![inject_owner(owner)];
        if let Some(namespace) = request.target_namespace() {
            fns.push(inject_namespace(namespace));
        }
        fns.push(add_scc_for_cluster_roles(self.profile.scc_cluster_roles));
        Ok(fns)
    }

    fn key_lock(&self, key: &RequestKey) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(lock(&self.key_locks).entry(key.clone()).or_default())
    }

    fn bundle_for(&self, key: &RequestKey) -> Manifest {
        self.applied_bundle(key)
            .unwrap_or_else(|| self.bundle.as_ref().clone())
    }

    /// Bundle most recently transformed for `key`, if any.
    pub fn applied_bundle(&self, key: &RequestKey) -> Option<Manifest> {
        lock(&self.applied).get(key).cloned()
    }

    /// Records a failed reconcile of `key` and returns the requeue delay.
    pub fn next_backoff(&self, key: &RequestKey) -> Duration {
        let (delay, error_count) = lock(&self.backoff_states)
            .entry(key.clone())
            .or_default()
            .record_error();
        debug!(
            "{} {} failed {} time(s), retrying in {}s",
            self.profile.kind,
            key,
            error_count,
            delay.as_secs()
        );
        delay
    }

    /// Forgets previous failures of `key`.
    pub fn reset_backoff(&self, key: &RequestKey) {
        if let Some(state) = lock(&self.backoff_states).get_mut(key) {
            state.reset();
        }
    }
}

fn reference(document: &Document) -> ResourceReference {
    match document.namespace() {
        Some(namespace) => {
            ResourceReference::with_namespace(document.api_version(), document.kind(), document.name(), namespace)
        }
        None => ResourceReference::new(document.api_version(), document.kind(), document.name()),
    }
}
