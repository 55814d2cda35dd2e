//! Install CRD
//!
//! Requests installation of the bundle, optionally into a namespace other
//! than the one the request lives in.

use crate::status::InstallStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "operator.eventing.knative.dev",
    version = "v1alpha1",
    kind = "Install",
    namespaced,
    status = "InstallStatus",
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".status.version"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InstallSpec {
    /// Namespace the bundle is installed into (defaults to the bundle's own namespaces)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}
