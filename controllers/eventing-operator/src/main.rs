//! Eventing Operator
//!
//! Installs the eventing resource bundle for every request resource:
//! - KnativeEventing: installs into the request's namespace and tracks
//!   deployment readiness through status conditions
//! - Install: installs into an optional target namespace and records the
//!   applied version
//!
//! Deleting a request deletes the resources installed for it.

mod backoff;
mod bootstrap;
mod client;
mod config;
mod controller;
mod error;
mod platform;
mod profile;
mod readiness;
mod reconciler;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::Config;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("A rustls crypto provider was already installed");
    }

    info!("Starting eventing operator {}", reconciler::VERSION);

    let config = Config::from_env()?;

    info!("Configuration:");
    info!("  Manifest path: {} (recursive: {})", config.manifest_path.display(), config.manifest_recursive);
    info!(
        "  Controllers: {}",
        config.controllers.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    );
    info!("  Namespace: {}", config.watch_namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Install namespace: {}", config.install_namespace.as_deref().unwrap_or("none"));
    info!("  Reconcile concurrency: {}", config.reconcile_concurrency);

    let controller = Controller::new(&config).await?;
    controller.run().await?;

    Ok(())
}
