//! # In-Memory Store
//!
//! [`ClusterStore`] kept in process memory. It follows the API-server rules the
//! reconciler depends on:
//!
//! - create fails with `AlreadyExists`, get/replace/delete with `NotFound`
//! - replace with a stale `metadata.resourceVersion` fails with `Conflict`
//! - a write that changes nothing keeps the resource version
//! - deleting an object that still carries finalizers only stamps
//!   `metadata.deletionTimestamp`; the object disappears once its last
//!   finalizer is removed
//! - the `status` of an existing object is only writable through `patch_status`
//!
//! Faults can be injected per verb, kind and name to exercise error paths.

use super::{ClusterStore, ObjectRef, StoreError};
use async_trait::async_trait;
use kube::core::DynamicObject;
use kube::discovery::ApiResource;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Store operation, used to target injected faults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Create,
    Replace,
    Delete,
    PatchStatus,
}

impl Verb {
    fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Create => "create",
            Verb::Replace => "replace",
            Verb::Delete => "delete",
            Verb::PatchStatus => "patch-status",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct StoreKey {
    api_version: String,
    kind: String,
    namespace: Option<String>,
    name: String,
}

impl StoreKey {
    fn new(resource: &ApiResource, namespace: Option<&str>, name: &str) -> Self {
        Self {
            api_version: resource.api_version.clone(),
            kind: resource.kind.clone(),
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Fault {
    verb: Verb,
    kind: String,
    name: String,
    conflict: bool,
    once: bool,
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<StoreKey, DynamicObject>,
    faults: Vec<Fault>,
    next_version: u64,
    mutations: u64,
}

impl State {
    fn bump(&mut self) -> String {
        self.next_version += 1;
        self.mutations += 1;
        self.next_version.to_string()
    }

    fn take_fault(&mut self, verb: Verb, kind: &str, name: &str) -> Option<StoreError> {
        let index = self
            .faults
            .iter()
            .position(|f| f.verb == verb && f.kind == kind && f.name == name)?;
        let fault = if self.faults[index].once {
            self.faults.remove(index)
        } else {
            self.faults[index].clone()
        };
        Some(if fault.conflict {
            StoreError::Conflict {
                kind: kind.to_string(),
                name: name.to_string(),
                message: "the object has been modified; please apply your changes to the latest version".to_string(),
            }
        } else {
            StoreError::Rejected {
                verb: verb.as_str().to_string(),
                kind: kind.to_string(),
                name: name.to_string(),
                message: "injected fault".to_string(),
            }
        })
    }
}

/// Cluster state store held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every `verb` on `kind`/`name` fail until [`MemoryStore::clear_faults`]
    pub fn fail(&self, verb: Verb, kind: &str, name: &str) {
        self.lock().faults.push(Fault {
            verb,
            kind: kind.to_string(),
            name: name.to_string(),
            conflict: false,
            once: false,
        });
    }

    /// Make the next replace of `kind`/`name` fail with a conflict
    pub fn conflict_once(&self, kind: &str, name: &str) {
        self.lock().faults.push(Fault {
            verb: Verb::Replace,
            kind: kind.to_string(),
            name: name.to_string(),
            conflict: true,
            once: true,
        });
    }

    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    /// Number of state-changing writes performed so far
    #[must_use]
    pub fn mutations(&self) -> u64 {
        self.lock().mutations
    }

    /// Snapshot of every stored object, ordered by kind, namespace and name
    #[must_use]
    pub fn objects(&self) -> Vec<DynamicObject> {
        self.lock().objects.values().cloned().collect()
    }

    /// Snapshot of one object
    #[must_use]
    pub fn object(&self, reference: &ObjectRef) -> Option<DynamicObject> {
        let key = StoreKey::new(
            &reference.resource,
            reference.namespace.as_deref(),
            &reference.name,
        );
        self.lock().objects.get(&key).cloned()
    }

    #[must_use]
    pub fn contains(&self, reference: &ObjectRef) -> bool {
        self.object(reference).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn not_found(resource: &ApiResource, name: &str) -> StoreError {
    StoreError::NotFound {
        kind: resource.kind.clone(),
        name: name.to_string(),
    }
}

fn has_finalizers(object: &DynamicObject) -> bool {
    object
        .metadata
        .finalizers
        .as_ref()
        .is_some_and(|f| !f.is_empty())
}

/// Content compared to decide whether a replace changes anything
fn content(object: &DynamicObject) -> (Value, Value) {
    let mut meta = object.metadata.clone();
    meta.resource_version = None;
    meta.generation = None;
    meta.managed_fields = None;
    (
        serde_json::to_value(&meta).unwrap_or(Value::Null),
        object.data.clone(),
    )
}

fn spec_content(object: &DynamicObject) -> Value {
    let mut data = object.data.clone();
    if let Some(map) = data.as_object_mut() {
        map.remove("status");
    }
    data
}

fn stamp_deletion(object: &mut DynamicObject, kind: &str) -> Result<(), StoreError> {
    let serialization = |source| StoreError::Serialization {
        kind: kind.to_string(),
        source,
    };
    let mut meta = serde_json::to_value(&object.metadata).map_err(serialization)?;
    if let Some(map) = meta.as_object_mut() {
        map.insert(
            "deletionTimestamp".to_string(),
            Value::String(
                chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            ),
        );
    }
    object.metadata = serde_json::from_value(meta).map_err(serialization)?;
    Ok(())
}

/// JSON merge patch (RFC 7386)
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

#[async_trait]
impl ClusterStore for MemoryStore {
    async fn get(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DynamicObject, StoreError> {
        let mut state = self.lock();
        if let Some(err) = state.take_fault(Verb::Get, &resource.kind, name) {
            return Err(err);
        }
        state
            .objects
            .get(&StoreKey::new(resource, namespace, name))
            .cloned()
            .ok_or_else(|| not_found(resource, name))
    }

    async fn create(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject, StoreError> {
        let name = object.metadata.name.clone().unwrap_or_default();
        let mut state = self.lock();
        if let Some(err) = state.take_fault(Verb::Create, &resource.kind, &name) {
            return Err(err);
        }
        let key = StoreKey::new(resource, object.metadata.namespace.as_deref(), &name);
        if state.objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: resource.kind.clone(),
                name,
            });
        }
        let version = state.bump();
        let mut stored = object.clone();
        stored.metadata.uid = Some(format!("uid-{version}"));
        stored.metadata.resource_version = Some(version);
        stored.metadata.generation = Some(1);
        stored.metadata.deletion_timestamp = None;
        state.objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn replace(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject, StoreError> {
        let name = object.metadata.name.clone().unwrap_or_default();
        let mut state = self.lock();
        if let Some(err) = state.take_fault(Verb::Replace, &resource.kind, &name) {
            return Err(err);
        }
        let key = StoreKey::new(resource, object.metadata.namespace.as_deref(), &name);
        let Some(current) = state.objects.get(&key).cloned() else {
            return Err(not_found(resource, &name));
        };
        if let Some(rv) = &object.metadata.resource_version {
            if Some(rv) != current.metadata.resource_version.as_ref() {
                return Err(StoreError::Conflict {
                    kind: resource.kind.clone(),
                    name,
                    message: format!(
                        "resourceVersion {rv} is stale (current {})",
                        current.metadata.resource_version.as_deref().unwrap_or("none")
                    ),
                });
            }
        }

        let mut next = object.clone();
        next.metadata.uid.clone_from(&current.metadata.uid);
        next.metadata
            .deletion_timestamp
            .clone_from(&current.metadata.deletion_timestamp);
        next.metadata.resource_version.clone_from(&current.metadata.resource_version);
        next.metadata.generation = current.metadata.generation;
        if let (Some(status), Some(map)) = (current.data.get("status"), next.data.as_object_mut())
        {
            map.insert("status".to_string(), status.clone());
        }

        if content(&next) == content(&current) {
            return Ok(current);
        }
        if spec_content(&next) != spec_content(&current) {
            next.metadata.generation = Some(current.metadata.generation.unwrap_or(0) + 1);
        }
        next.metadata.resource_version = Some(state.bump());

        if next.metadata.deletion_timestamp.is_some() && !has_finalizers(&next) {
            state.objects.remove(&key);
        } else {
            state.objects.insert(key, next.clone());
        }
        Ok(next)
    }

    async fn delete(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        if let Some(err) = state.take_fault(Verb::Delete, &resource.kind, name) {
            return Err(err);
        }
        let key = StoreKey::new(resource, namespace, name);
        let Some(mut current) = state.objects.get(&key).cloned() else {
            return Err(not_found(resource, name));
        };
        if !has_finalizers(&current) {
            state.objects.remove(&key);
            state.mutations += 1;
            return Ok(());
        }
        if current.metadata.deletion_timestamp.is_none() {
            stamp_deletion(&mut current, &resource.kind)?;
            current.metadata.generation = Some(current.metadata.generation.unwrap_or(0) + 1);
            current.metadata.resource_version = Some(state.bump());
            state.objects.insert(key, current);
        }
        Ok(())
    }

    async fn patch_status(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
        status: &Value,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        if let Some(err) = state.take_fault(Verb::PatchStatus, &resource.kind, name) {
            return Err(err);
        }
        let key = StoreKey::new(resource, namespace, name);
        let Some(mut current) = state.objects.get(&key).cloned() else {
            return Err(not_found(resource, name));
        };
        let before = current.data.clone();
        if !current.data.is_object() {
            current.data = Value::Object(Map::new());
        }
        if let Some(map) = current.data.as_object_mut() {
            merge_patch(map.entry("status").or_insert(Value::Null), status);
        }
        if current.data != before {
            current.metadata.resource_version = Some(state.bump());
            state.objects.insert(key, current);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{from_dynamic, to_dynamic};
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    fn config_map(name: &str, value: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("team".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([("k".to_string(), value.to_string())])),
            ..Default::default()
        }
    }

    fn resource() -> ApiResource {
        ApiResource::erase::<ConfigMap>(&())
    }

    #[tokio::test]
    async fn test_create_then_duplicate_create_fails() {
        let store = MemoryStore::new();
        let cm = to_dynamic(&config_map("a", "1")).unwrap();
        let created = store.create(&resource(), &cm).await.unwrap();
        assert!(created.metadata.uid.is_some());
        assert_eq!(created.metadata.generation, Some(1));

        let err = store.create(&resource(), &cm).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .get(&resource(), Some("team"), "missing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_replace_with_stale_version_conflicts() {
        let store = MemoryStore::new();
        let created = store
            .create(&resource(), &to_dynamic(&config_map("a", "1")).unwrap())
            .await
            .unwrap();

        let mut first = created.clone();
        first.data["data"]["k"] = "2".into();
        store.replace(&resource(), &first).await.unwrap();

        let mut stale = created;
        stale.data["data"]["k"] = "3".into();
        let err = store.replace(&resource(), &stale).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_identical_replace_is_not_a_mutation() {
        let store = MemoryStore::new();
        let created = store
            .create(&resource(), &to_dynamic(&config_map("a", "1")).unwrap())
            .await
            .unwrap();
        let before = store.mutations();
        let same = store.replace(&resource(), &created).await.unwrap();
        assert_eq!(same.metadata.resource_version, created.metadata.resource_version);
        assert_eq!(store.mutations(), before);
    }

    #[tokio::test]
    async fn test_delete_with_finalizer_waits_for_release() {
        let store = MemoryStore::new();
        let mut cm = config_map("a", "1");
        cm.metadata.finalizers = Some(vec!["example.com/guard".to_string()]);
        store
            .create(&resource(), &to_dynamic(&cm).unwrap())
            .await
            .unwrap();

        store.delete(&resource(), Some("team"), "a").await.unwrap();
        let pending = store.get(&resource(), Some("team"), "a").await.unwrap();
        assert!(pending.metadata.deletion_timestamp.is_some());

        let mut released: ConfigMap = from_dynamic(&pending).unwrap();
        released.metadata.finalizers = Some(vec![]);
        store
            .replace(&resource(), &to_dynamic(&released).unwrap())
            .await
            .unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_patch_status_merges_and_replace_keeps_status() {
        let store = MemoryStore::new();
        let created = store
            .create(&resource(), &to_dynamic(&config_map("a", "1")).unwrap())
            .await
            .unwrap();
        store
            .patch_status(
                &resource(),
                Some("team"),
                "a",
                &serde_json::json!({"phase": "Ready", "extra": "x"}),
            )
            .await
            .unwrap();
        store
            .patch_status(
                &resource(),
                Some("team"),
                "a",
                &serde_json::json!({"extra": null}),
            )
            .await
            .unwrap();

        let mut overwrite = created;
        overwrite.metadata.resource_version = None;
        overwrite.data["status"] = serde_json::json!({"phase": "Hijacked"});
        let stored = store.replace(&resource(), &overwrite).await.unwrap();
        assert_eq!(stored.data["status"], serde_json::json!({"phase": "Ready"}));
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let store = MemoryStore::new();
        store
            .create(&resource(), &to_dynamic(&config_map("a", "1")).unwrap())
            .await
            .unwrap();

        store.fail(Verb::Delete, "ConfigMap", "a");
        let err = store
            .delete(&resource(), Some("team"), "a")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));
        store.clear_faults();
        store.delete(&resource(), Some("team"), "a").await.unwrap();

        store
            .create(&resource(), &to_dynamic(&config_map("b", "1")).unwrap())
            .await
            .unwrap();
        store.conflict_once("ConfigMap", "b");
        let current = store.get(&resource(), Some("team"), "b").await.unwrap();
        assert!(store.replace(&resource(), &current).await.unwrap_err().is_conflict());
        assert!(store.replace(&resource(), &current).await.is_ok());
    }
}
