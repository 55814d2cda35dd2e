//! Common view over the install request kinds.
//!
//! The convergence engine is generic over this trait so the same stages run
//! for every request kind.

use crate::install::Install;
use crate::knative_eventing::KnativeEventing;
use crate::status::InstallStatus;
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// A namespaced custom resource that asks for the bundle to be installed.
pub trait InstallRequest:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Observed status, if any has been written.
    fn install_status(&self) -> Option<&InstallStatus>;

    /// Mutable status, created empty when absent.
    fn install_status_mut(&mut self) -> &mut InstallStatus;

    /// Namespace the bundle should be rewritten into, if any.
    fn target_namespace(&self) -> Option<String>;
}

impl InstallRequest for KnativeEventing {
    fn install_status(&self) -> Option<&InstallStatus> {
        self.status.as_ref()
    }

    fn install_status_mut(&mut self) -> &mut InstallStatus {
        self.status.get_or_insert_with(InstallStatus::default)
    }

    fn target_namespace(&self) -> Option<String> {
        self.metadata.namespace.clone()
    }
}

impl InstallRequest for Install {
    fn install_status(&self) -> Option<&InstallStatus> {
        self.status.as_ref()
    }

    fn install_status_mut(&mut self) -> &mut InstallStatus {
        self.status.get_or_insert_with(InstallStatus::default)
    }

    fn target_namespace(&self) -> Option<String> {
        self.spec.namespace.clone().filter(|ns| !ns.is_empty())
    }
}
