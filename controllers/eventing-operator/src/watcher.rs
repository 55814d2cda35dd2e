//! Kubernetes resource watchers.
//!
//! Each request kind gets two watch loops:
//! - a `kube_runtime` controller that reconciles a request whenever its
//!   generation changes or a Deployment it owns changes. Status writes do not
//!   bump the generation, so they do not trigger another reconcile.
//! - a deletion watcher, since the controller never reconciles an object
//!   that has left its cache

use crate::error::ControllerError;
use crate::reconciler::{ConvergenceEngine, RequestKey};
use crds::InstallRequest;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::Api;
use kube_runtime::controller::{Action, Config as ControllerConfig, Controller};
use kube_runtime::{predicates, reflector, watcher, WatchStreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Runs the reconcile loop for requests of kind `K` until the stream ends.
pub async fn run_controller<K: InstallRequest>(
    engine: Arc<ConvergenceEngine<K>>,
    requests: Api<K>,
    deployments: Api<Deployment>,
    concurrency: u16,
) -> Result<(), ControllerError> {
    let kind = engine.profile().kind;
    info!("Starting {} controller", kind);

    let (reader, writer) = reflector::store();
    let changes = watcher(requests, watcher::Config::default())
        .default_backoff()
        .reflect(writer)
        .applied_objects()
        .predicate_filter(predicates::generation);

    Controller::for_stream(changes, reader)
        .owns(deployments, watcher::Config::default())
        .with_config(ControllerConfig::default().concurrency(concurrency))
        .run(reconcile::<K>, error_policy::<K>, engine)
        .for_each(|result| async move {
            match result {
                Ok((request, _)) => debug!("Reconciled {} {}", kind, request),
                Err(e) => warn!("{} controller error: {}", kind, e),
            }
        })
        .await;

    Err(ControllerError::Watch(format!("{kind} controller stream ended")))
}

async fn reconcile<K: InstallRequest>(
    request: Arc<K>,
    engine: Arc<ConvergenceEngine<K>>,
) -> Result<Action, ControllerError> {
    let key = RequestKey::of(request.as_ref());
    engine.reconcile(&key).await?;
    engine.reset_backoff(&key);
    Ok(Action::await_change())
}

fn error_policy<K: InstallRequest>(
    request: Arc<K>,
    error: &ControllerError,
    engine: Arc<ConvergenceEngine<K>>,
) -> Action {
    let key = RequestKey::of(request.as_ref());
    let delay = engine.next_backoff(&key);
    error!(
        "Reconcile of {} {} failed, retrying in {}s: {}",
        engine.profile().kind,
        key,
        delay.as_secs(),
        error
    );
    Action::requeue(delay)
}

/// Tears down the bundle of every request of kind `K` that gets deleted.
pub async fn watch_deletions<K: InstallRequest>(
    engine: Arc<ConvergenceEngine<K>>,
    requests: Api<K>,
) -> Result<(), ControllerError> {
    let kind = engine.profile().kind;
    info!("Starting {} deletion watcher", kind);

    let mut stream = Box::pin(watcher(requests, watcher::Config::default()).default_backoff());
    while let Some(result) = stream.next().await {
        match result {
            Ok(watcher::Event::Delete(request)) => {
                let key = RequestKey::of(&request);
                info!("{} {} deleted", kind, key);
                match engine.teardown_deleted(&request).await {
                    Ok(outcome) => debug!("{} {}: {:?}", kind, key, outcome),
                    Err(e) => error!("Failed to tear down {} {}: {}", kind, key, e),
                }
            }
            Ok(watcher::Event::InitDone) => debug!("{} deletion watcher initialized", kind),
            Ok(_) => {}
            Err(e) => warn!("{} deletion watcher error: {}", kind, e),
        }
    }

    Err(ControllerError::Watch(format!("{kind} deletion watcher stream ended")))
}
