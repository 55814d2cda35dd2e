//! Document transformers.
//!
//! A transformer rewrites one document in place or refuses it with an error.
//! Transformers are applied in order to every document of a bundle by
//! [`crate::Manifest::transform`].

use crate::document::Document;
use crate::error::ManifestError;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use serde_json::Value;

/// A document rewrite applied before a bundle is applied
pub type Transformer = Box<dyn Fn(&mut Document) -> Result<(), ManifestError> + Send + Sync>;

/// Kinds that never carry a namespace.
const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "apiservice",
    "certificatesigningrequest",
    "clusterrole",
    "clusterrolebinding",
    "componentstatus",
    "customresourcedefinition",
    "meshpolicy",
    "mutatingwebhookconfiguration",
    "namespace",
    "node",
    "persistentvolume",
    "podsecuritypolicy",
    "priorityclass",
    "selfsubjectaccessreview",
    "selfsubjectrulesreview",
    "storageclass",
    "subjectaccessreview",
    "tokenreview",
    "validatingwebhookconfiguration",
    "volumeattachment",
];

/// Returns true for kinds that are cluster-scoped.
pub fn is_cluster_scoped(kind: &str) -> bool {
    let kind = kind.to_ascii_lowercase();
    CLUSTER_SCOPED_KINDS.contains(&kind.as_str())
}

/// Replaces every document's owner references with `owner`.
pub fn inject_owner(owner: OwnerReference) -> Transformer {
    Box::new(move |document: &mut Document| {
        let refs = serde_json::to_value(vec![owner.clone()])?;
        document.set_nested_field(&["metadata", "ownerReferences"], refs)
    })
}

/// Moves every namespaced document into `namespace`.
///
/// Cluster-scoped documents keep no namespace, but the namespace references
/// they carry are re-pointed: a `Namespace` is renamed, `ClusterRoleBinding`
/// ServiceAccount subjects, webhook client services and `APIService` services
/// follow the target namespace.
pub fn inject_namespace(namespace: impl Into<String>) -> Transformer {
    let namespace = namespace.into();
    Box::new(move |document: &mut Document| {
        if !is_cluster_scoped(document.kind()) {
            document.set_namespace(&namespace)?;
        }
        match document.kind().to_ascii_lowercase().as_str() {
            "namespace" => document.set_name(&namespace),
            "clusterrolebinding" => rewrite_subjects(document, &namespace),
            "validatingwebhookconfiguration" | "mutatingwebhookconfiguration" => {
                rewrite_webhooks(document, &namespace)
            }
            "apiservice" => {
                if document.nested_field(&["spec", "service"])?.is_some() {
                    document.set_nested_field(
                        &["spec", "service", "namespace"],
                        Value::String(namespace.clone()),
                    )?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    })
}

fn rewrite_subjects(document: &mut Document, namespace: &str) -> Result<(), ManifestError> {
    let resource = document.describe();
    let Some(subjects) = document.nested_field_mut(&["subjects"])? else {
        return Ok(());
    };
    let Value::Array(subjects) = subjects else {
        return Err(ManifestError::Transform {
            resource,
            reason: "subjects is not a list".to_string(),
        });
    };
    for subject in subjects.iter_mut().filter_map(Value::as_object_mut) {
        if subject.get("kind").and_then(Value::as_str) == Some("ServiceAccount") {
            subject.insert("namespace".to_string(), Value::String(namespace.to_string()));
        }
    }
    Ok(())
}

fn rewrite_webhooks(document: &mut Document, namespace: &str) -> Result<(), ManifestError> {
    let resource = document.describe();
    let Some(webhooks) = document.nested_field_mut(&["webhooks"])? else {
        return Ok(());
    };
    let Value::Array(webhooks) = webhooks else {
        return Err(ManifestError::Transform {
            resource,
            reason: "webhooks is not a list".to_string(),
        });
    };
    for service in webhooks
        .iter_mut()
        .filter_map(|w| w.pointer_mut("/clientConfig/service"))
        .filter_map(Value::as_object_mut)
    {
        service.insert("namespace".to_string(), Value::String(namespace.to_string()));
    }
    Ok(())
}
