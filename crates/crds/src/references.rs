//! Applied resource references
//!
//! Records which bundle documents an install request caused to exist.
//! Follows the Kubernetes `TypedObjectReference` shape with apiVersion, kind,
//! name and optional namespace (absent for cluster-scoped kinds).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to one applied resource
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReference {
    /// API version of the resource (e.g., "apps/v1")
    pub api_version: String,

    /// Kind of the resource (e.g., "Deployment")
    pub kind: String,

    /// Name of the resource
    pub name: String,

    /// Namespace of the resource, unset for cluster-scoped kinds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ResourceReference {
    /// Create a reference to a cluster-scoped resource
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            name: name.into(),
            namespace: None,
        }
    }

    /// Create a reference to a namespaced resource
    pub fn with_namespace(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::new(api_version, kind, name)
        }
    }
}
