//! Mock ClusterClient for unit testing
//!
//! This module provides an in-memory implementation of [`ClusterClient`] that
//! can be used in unit tests without requiring a running API server. It
//! records every call so tests can assert on the exact traffic a bundle
//! produced, and can be told to fail specific calls.

use crate::client_trait::ClusterClient;
use crate::document::{Document, ObjectKey};
use crate::error::ManifestError;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Mock ClusterClient for testing
///
/// Applied documents are stored keyed by identity; an apply over an existing
/// object keeps the object's `status`, the way a spec apply would.
#[derive(Clone, Debug, Default)]
pub struct MockClusterClient {
    objects: Arc<Mutex<BTreeMap<ObjectKey, Document>>>,
    applied: Arc<Mutex<Vec<ObjectKey>>>,
    deleted: Arc<Mutex<Vec<ObjectKey>>>,
    lookups: Arc<Mutex<Vec<ObjectKey>>>,
    apply_failures: Arc<Mutex<HashMap<(String, String), String>>>,
    get_failures: Arc<Mutex<HashMap<(String, String), String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockClusterClient {
    /// Create a new, empty mock cluster
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object directly (for test setup)
    pub fn insert(&self, document: Document) {
        lock(&self.objects).insert(document.key(), document);
    }

    /// Set a nested field on a stored object (for test setup)
    pub fn set_field(&self, key: &ObjectKey, path: &[&str], value: Value) -> Result<(), ManifestError> {
        let mut objects = lock(&self.objects);
        let document = objects
            .get_mut(key)
            .ok_or_else(|| ManifestError::NotFound(key.to_string()))?;
        document.set_nested_field(path, value)
    }

    /// Make every apply of `kind`/`name` fail with `message`
    pub fn fail_apply(&self, kind: &str, name: &str, message: &str) {
        lock(&self.apply_failures).insert((kind.to_string(), name.to_string()), message.to_string());
    }

    /// Make every get of `kind`/`name` fail with `message`
    pub fn fail_get(&self, kind: &str, name: &str, message: &str) {
        lock(&self.get_failures).insert((kind.to_string(), name.to_string()), message.to_string());
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        lock(&self.apply_failures).clear();
        lock(&self.get_failures).clear();
    }

    /// Stored object, if present
    pub fn object(&self, key: &ObjectKey) -> Option<Document> {
        lock(&self.objects).get(key).cloned()
    }

    /// All stored objects, ordered by identity
    pub fn objects(&self) -> Vec<Document> {
        lock(&self.objects).values().cloned().collect()
    }

    /// Number of stored objects
    pub fn object_count(&self) -> usize {
        lock(&self.objects).len()
    }

    /// Identities passed to `apply`, in call order
    pub fn applied(&self) -> Vec<ObjectKey> {
        lock(&self.applied).clone()
    }

    /// Number of `apply` calls
    pub fn apply_count(&self) -> usize {
        lock(&self.applied).len()
    }

    /// Identities passed to `delete`, in call order
    pub fn deleted(&self) -> Vec<ObjectKey> {
        lock(&self.deleted).clone()
    }

    /// Identities passed to `get`, in call order
    pub fn lookups(&self) -> Vec<ObjectKey> {
        lock(&self.lookups).clone()
    }

    /// Forget recorded calls, keeping stored objects
    pub fn reset_calls(&self) {
        lock(&self.applied).clear();
        lock(&self.deleted).clear();
        lock(&self.lookups).clear();
    }

    fn failure(failures: &Mutex<HashMap<(String, String), String>>, key: &ObjectKey) -> Option<ManifestError> {
        lock(failures)
            .get(&(key.kind.clone(), key.name.clone()))
            .map(|message| ManifestError::Api(message.clone()))
    }
}

#[async_trait::async_trait]
impl ClusterClient for MockClusterClient {
    async fn apply(&self, document: &Document) -> Result<(), ManifestError> {
        let key = document.key();
        lock(&self.applied).push(key.clone());
        if let Some(err) = Self::failure(&self.apply_failures, &key) {
            return Err(err);
        }
        let mut stored = document.clone();
        let mut objects = lock(&self.objects);
        if let Some(status) = objects.get(&key).and_then(|o| o.as_object().get("status").cloned()) {
            stored.set_nested_field(&["status"], status)?;
        }
        objects.insert(key, stored);
        Ok(())
    }

    async fn delete(&self, document: &Document) -> Result<(), ManifestError> {
        let key = document.key();
        lock(&self.deleted).push(key.clone());
        match lock(&self.objects).remove(&key) {
            Some(_) => Ok(()),
            None => Err(ManifestError::NotFound(key.to_string())),
        }
    }

    async fn get(&self, key: &ObjectKey) -> Result<Document, ManifestError> {
        lock(&self.lookups).push(key.clone());
        if let Some(err) = Self::failure(&self.get_failures, key) {
            return Err(err);
        }
        self.object(key).ok_or_else(|| ManifestError::NotFound(key.to_string()))
    }
}
