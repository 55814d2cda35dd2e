//! KnativeEventing CRD
//!
//! Requests installation of the eventing bundle into the namespace the
//! resource itself lives in.

use crate::status::InstallStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "operator.eventing.knative.dev",
    version = "v1alpha1",
    kind = "KnativeEventing",
    namespaced,
    status = "InstallStatus",
    shortname = "ke",
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".status.version"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct KnativeEventingSpec {}
