//! Typed wrapper over a generic resource document.
//!
//! A `Document` is always a JSON object carrying `apiVersion`, `kind` and
//! `metadata.name`. Nested access goes through explicit paths and reports an
//! error when an intermediate field is present but is not an object, instead
//! of silently ignoring the shape mismatch.

use crate::error::ManifestError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identity of a resource in the cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// API version (e.g., "apps/v1")
    pub api_version: String,
    /// Kind (e.g., "Deployment")
    pub kind: String,
    /// Namespace, unset for cluster-scoped resources
    pub namespace: Option<String>,
    /// Name
    pub name: String,
}

impl ObjectKey {
    /// Creates a key for a namespaced resource.
    pub fn namespaced(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.kind, ns, self.name),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}

/// A single resource document of a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Document {
    object: Map<String, Value>,
}

impl TryFrom<Value> for Document {
    type Error = ManifestError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<Document> for Value {
    fn from(document: Document) -> Self {
        Value::Object(document.object)
    }
}

impl Document {
    /// Validates and wraps a JSON value.
    pub fn from_value(value: Value) -> Result<Self, ManifestError> {
        let Value::Object(object) = value else {
            return Err(ManifestError::InvalidDocument(format!(
                "expected an object, found {}",
                type_name(&value)
            )));
        };
        let document = Self { object };
        let required: [&[&str]; 3] = [&["apiVersion"], &["kind"], &["metadata", "name"]];
        for path in required {
            match document.nested_str(path)? {
                Some(s) if !s.is_empty() => {}
                _ => {
                    return Err(ManifestError::InvalidDocument(format!(
                        "missing {} in {}",
                        path.join("."),
                        document.describe()
                    )));
                }
            }
        }
        Ok(document)
    }

    /// Borrows the underlying object.
    pub fn as_object(&self) -> &Map<String, Value> {
        &self.object
    }

    /// API version, e.g. "rbac.authorization.k8s.io/v1".
    pub fn api_version(&self) -> &str {
        self.str_or_empty(&["apiVersion"])
    }

    /// Resource kind, e.g. "ClusterRole".
    pub fn kind(&self) -> &str {
        self.str_or_empty(&["kind"])
    }

    /// `metadata.name`.
    pub fn name(&self) -> &str {
        self.str_or_empty(&["metadata", "name"])
    }

    /// `metadata.namespace`, if set and non-empty.
    pub fn namespace(&self) -> Option<&str> {
        self.nested_str(&["metadata", "namespace"])
            .ok()
            .flatten()
            .filter(|ns| !ns.is_empty())
    }

    /// Sets `metadata.name`.
    pub fn set_name(&mut self, name: &str) -> Result<(), ManifestError> {
        self.set_nested_field(&["metadata", "name"], Value::String(name.to_string()))
    }

    /// Sets `metadata.namespace`.
    pub fn set_namespace(&mut self, namespace: &str) -> Result<(), ManifestError> {
        self.set_nested_field(&["metadata", "namespace"], Value::String(namespace.to_string()))
    }

    /// Cluster identity of this document.
    pub fn key(&self) -> ObjectKey {
        ObjectKey {
            api_version: self.api_version().to_string(),
            kind: self.kind().to_string(),
            namespace: self.namespace().map(str::to_string),
            name: self.name().to_string(),
        }
    }

    /// Short human-readable identity, e.g. "ClusterRole knative-eventing-controller".
    pub fn describe(&self) -> String {
        self.key().to_string()
    }

    /// Looks up a nested field.
    ///
    /// Returns `Ok(None)` when any segment is absent and an error when an
    /// intermediate segment exists but is not an object.
    pub fn nested_field(&self, path: &[&str]) -> Result<Option<&Value>, ManifestError> {
        let Some((last, parents)) = path.split_last() else {
            return Err(ManifestError::InvalidDocument("empty field path".to_string()));
        };
        let mut current = &self.object;
        for (depth, segment) in parents.iter().enumerate() {
            match current.get(*segment) {
                None | Some(Value::Null) => return Ok(None),
                Some(Value::Object(map)) => current = map,
                Some(other) => return Err(self.not_an_object(&path[..=depth], other)),
            }
        }
        Ok(current.get(*last).filter(|v| !v.is_null()))
    }

    /// Mutable variant of [`Document::nested_field`].
    pub fn nested_field_mut(&mut self, path: &[&str]) -> Result<Option<&mut Value>, ManifestError> {
        // Validate the shape first so the mutable walk below cannot fail.
        if self.nested_field(path)?.is_none() {
            return Ok(None);
        }
        let mut current = &mut self.object;
        let Some((last, parents)) = path.split_last() else {
            return Ok(None);
        };
        for segment in parents {
            match current.get_mut(*segment) {
                Some(Value::Object(map)) => current = map,
                _ => return Ok(None),
            }
        }
        Ok(current.get_mut(*last))
    }

    /// Looks up a nested string field; a present non-string value is an error.
    pub fn nested_str(&self, path: &[&str]) -> Result<Option<&str>, ManifestError> {
        match self.nested_field(path)? {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(ManifestError::InvalidDocument(format!(
                "field {} is {}, expected a string",
                path.join("."),
                type_name(other)
            ))),
        }
    }

    /// Sets a nested field, creating intermediate objects as needed.
    pub fn set_nested_field(&mut self, path: &[&str], value: Value) -> Result<(), ManifestError> {
        let Some((last, parents)) = path.split_last() else {
            return Err(ManifestError::InvalidDocument("empty field path".to_string()));
        };
        if let Some((depth, other)) = self.first_non_object(parents) {
            return Err(self.not_an_object(&parents[..=depth], &other));
        }
        let mut current = &mut self.object;
        for segment in parents {
            let entry = current
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if entry.is_null() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(map) = entry else {
                return Err(ManifestError::InvalidDocument(format!(
                    "field {segment} is not an object"
                )));
            };
            current = map;
        }
        current.insert((*last).to_string(), value);
        Ok(())
    }

    fn first_non_object(&self, parents: &[&str]) -> Option<(usize, Value)> {
        let mut current = &self.object;
        for (depth, segment) in parents.iter().enumerate() {
            match current.get(*segment) {
                None | Some(Value::Null) => return None,
                Some(Value::Object(map)) => current = map,
                Some(other) => return Some((depth, other.clone())),
            }
        }
        None
    }

    fn str_or_empty(&self, path: &[&str]) -> &str {
        self.nested_str(path).ok().flatten().unwrap_or_default()
    }

    fn not_an_object(&self, path: &[&str], found: &Value) -> ManifestError {
        ManifestError::InvalidDocument(format!(
            "field {} of {} {} is {}, expected an object",
            path.join("."),
            self.kind(),
            self.name(),
            type_name(found)
        ))
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
