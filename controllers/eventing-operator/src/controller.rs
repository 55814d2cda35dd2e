//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the shared bundle,
//! one convergence engine per enabled request kind and their watch loops.

use crate::bootstrap;
use crate::client::{KubeRequestClient, RequestClient};
use crate::config::Config;
use crate::error::ControllerError;
use crate::profile::RequestKind;
use crate::reconciler::ConvergenceEngine;
use crate::watcher::{run_controller, watch_deletions};
use crds::{Install, InstallRequest, KnativeEventing};
use futures::future::select_all;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{Api, Client};
use manifest::{ClusterClient, KubeClusterClient, Manifest};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

type WatchTask = (String, JoinHandle<Result<(), ControllerError>>);

/// Main controller for the eventing operator.
#[derive(Debug)]
pub struct Controller {
    tasks: Vec<WatchTask>,
}

impl Controller {
    /// Creates a new controller instance and starts its watch loops.
    pub async fn new(config: &Config) -> Result<Self, ControllerError> {
        info!("Initializing eventing operator");

        let kube_client = Client::try_default().await?;
        let cluster: Arc<dyn ClusterClient> = Arc::new(KubeClusterClient::new(kube_client.clone()));

        // Loaded once; every engine derives its own transformed copies.
        let bundle = Arc::new(Manifest::from_path(
            &config.manifest_path,
            config.manifest_recursive,
            Arc::clone(&cluster),
        )?);

        let mut tasks = Vec::new();
        for kind in &config.controllers {
            let started = match kind {
                RequestKind::KnativeEventing => {
                    start::<KnativeEventing>(*kind, &kube_client, &cluster, &bundle, config)
                }
                RequestKind::Install => start::<Install>(*kind, &kube_client, &cluster, &bundle, config),
            };
            tasks.extend(started);
        }

        Ok(Self { tasks })
    }

    /// Runs the controller until shutdown.
    ///
    /// Returns as soon as any watch loop exits; they should run forever.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("Eventing operator running");

        let (names, handles): (Vec<String>, Vec<_>) = self.tasks.into_iter().unzip();
        if handles.is_empty() {
            return Ok(());
        }
        let (result, index, _) = select_all(handles).await;
        let name = &names[index];
        result
            .map_err(|e| ControllerError::Watch(format!("{name} panicked: {e}")))?
            .map_err(|e| ControllerError::Watch(format!("{name} error: {e}")))?;

        Ok(())
    }
}

fn start<K: InstallRequest>(
    kind: RequestKind,
    kube_client: &Client,
    cluster: &Arc<dyn ClusterClient>,
    bundle: &Arc<Manifest>,
    config: &Config,
) -> Vec<WatchTask> {
    let profile = kind.profile();
    let requests: Arc<dyn RequestClient<K>> = Arc::new(KubeRequestClient::<K>::new(kube_client.clone()));
    let engine = Arc::new(ConvergenceEngine::new(profile, Arc::clone(&requests), Arc::clone(bundle)));

    let api: Api<K> = match config.watch_namespace.as_deref() {
        Some(ns) => Api::namespaced(kube_client.clone(), ns),
        None => Api::all(kube_client.clone()),
    };
    let deployments: Api<Deployment> = Api::all(kube_client.clone());

    if let (Some(namespace), Some(path)) = (&config.install_namespace, profile.default_request_path) {
        // Detached: bootstrap failures never stop the controller.
        drop(bootstrap::spawn(
            requests,
            Arc::clone(cluster),
            namespace.clone(),
            PathBuf::from(path),
        ));
    }

    let controller = {
        let engine = Arc::clone(&engine);
        let api = api.clone();
        let concurrency = config.reconcile_concurrency;
        tokio::spawn(async move { run_controller(engine, api, deployments, concurrency).await })
    };
    let deletions = tokio::spawn(async move { watch_deletions(engine, api).await });

    vec![
        (format!("{kind} controller"), controller),
        (format!("{kind} deletion watcher"), deletions),
    ]
}
