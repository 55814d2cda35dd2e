//! Platform policy patch.
//!
//! Some eventing components need to run under privileged security context
//! constraints on OpenShift. Their cluster roles get one extra rule granting
//! `use` of those constraints.

use manifest::{Document, ManifestError, Transformer};
use serde_json::{json, Value};

/// The rule appended to every matching cluster role.
pub fn scc_rule() -> Value {
    json!({
        "apiGroups": ["security.openshift.io"],
        "verbs": ["use"],
        "resources": ["securitycontextconstraints"],
        "resourceNames": ["privileged", "anyuid"],
    })
}

/// Appends [`scc_rule`] to the `rules` of each `ClusterRole` named in `roles`.
///
/// A matching role without a `rules` list is refused.
pub fn add_scc_for_cluster_roles(roles: &'static [&'static str]) -> Transformer {
    Box::new(move |document: &mut Document| {
        if document.kind() != "ClusterRole" || !roles.contains(&document.name()) {
            return Ok(());
        }
        let resource = document.describe();
        match document.nested_field_mut(&["rules"])? {
            Some(Value::Array(rules)) => {
                rules.push(scc_rule());
                Ok(())
            }
            Some(_) => Err(ManifestError::Transform {
                resource,
                reason: "rules is not a list".to_string(),
            }),
            None => Err(ManifestError::Transform {
                resource,
                reason: "rules is missing".to_string(),
            }),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::KNATIVE_EVENTING;

    fn cluster_role(name: &str, rules: Value) -> Document {
        Document::from_value(json!({
            "apiVersion": "rbac.authorization.k8s.io/v1",
            "kind": "ClusterRole",
            "metadata": {"name": name},
            "rules": rules
        }))
        .unwrap()
    }

    fn rules(document: &Document) -> Vec<Value> {
        document.nested_field(&["rules"]).unwrap().unwrap().as_array().unwrap().clone()
    }

    #[test]
    fn test_matching_role_gets_one_extra_rule() {
        let existing = json!([
            {"apiGroups": [""], "resources": ["pods"], "verbs": ["get"]},
            {"apiGroups": ["apps"], "resources": ["deployments"], "verbs": ["list"]}
        ]);
        let mut role = cluster_role("knative-eventing-controller", existing.clone());

        add_scc_for_cluster_roles(KNATIVE_EVENTING.scc_cluster_roles)(&mut role).unwrap();

        let after = rules(&role);
        assert_eq!(after.len(), 3);
        assert_eq!(&after[..2], existing.as_array().unwrap().as_slice());
        assert_eq!(after[2], scc_rule());
        assert_eq!(after[2]["resourceNames"], json!(["privileged", "anyuid"]));
    }

    #[test]
    fn test_unrelated_role_is_unchanged() {
        let mut role = cluster_role("unrelated-role", json!([{"verbs": ["get"]}]));
        let before = role.clone();

        add_scc_for_cluster_roles(KNATIVE_EVENTING.scc_cluster_roles)(&mut role).unwrap();

        assert_eq!(role, before);
    }

    #[test]
    fn test_other_kinds_pass_through() {
        let mut binding = Document::from_value(json!({
            "apiVersion": "rbac.authorization.k8s.io/v1",
            "kind": "ClusterRoleBinding",
            "metadata": {"name": "knative-eventing-controller"}
        }))
        .unwrap();
        let before = binding.clone();

        add_scc_for_cluster_roles(KNATIVE_EVENTING.scc_cluster_roles)(&mut binding).unwrap();

        assert_eq!(binding, before);
    }

    #[test]
    fn test_malformed_rules_are_refused() {
        let transform = add_scc_for_cluster_roles(KNATIVE_EVENTING.scc_cluster_roles);

        let mut missing = Document::from_value(json!({
            "apiVersion": "rbac.authorization.k8s.io/v1",
            "kind": "ClusterRole",
            "metadata": {"name": "eventing-broker-filter"}
        }))
        .unwrap();
        let err = transform(&mut missing).unwrap_err();
        assert!(matches!(err, ManifestError::Transform { ref reason, .. } if reason == "rules is missing"));

        let mut scalar = cluster_role("eventing-broker-filter", json!("all"));
        let err = transform(&mut scalar).unwrap_err();
        assert!(matches!(err, ManifestError::Transform { ref reason, .. } if reason == "rules is not a list"));
    }
}
