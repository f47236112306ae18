//! In-memory resource store
//!
//! Records are held as JSON documents together with a store-wide revision
//! counter, mirroring the optimistic concurrency rules of the real API:
//!
//! - `create` assigns a uid and a fresh `resourceVersion`, and rejects ids
//!   that already exist.
//! - `patch` applies an RFC 7386 merge patch; if the patch carries a
//!   `metadata.resourceVersion` that is not the current one, it is rejected
//!   with a conflict.
//! - `update_status` replaces only `status`, after the same revision check.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use pitrix_import_types::{ImportResult, LabelSelector, Resource, ResourceStore};

use crate::error::StoreError;

/// Call counters, for asserting how a store was driven
#[derive(Debug, Default)]
pub struct StoreCounters {
    lists: AtomicUsize,
    gets: AtomicUsize,
    creates: AtomicUsize,
    patches: AtomicUsize,
    status_updates: AtomicUsize,
}

impl StoreCounters {
    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn patches(&self) -> usize {
        self.patches.load(Ordering::SeqCst)
    }

    pub fn status_updates(&self) -> usize {
        self.status_updates.load(Ordering::SeqCst)
    }

    /// Successful and rejected write calls combined
    pub fn writes(&self) -> usize {
        self.creates() + self.patches() + self.status_updates()
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MemoryStore<R> {
    records: Mutex<BTreeMap<String, Value>>,
    revision: AtomicU64,
    counters: StoreCounters,
    _kind: PhantomData<fn() -> R>,
}

impl<R: Resource> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> MemoryStore<R> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            revision: AtomicU64::new(0),
            counters: StoreCounters::default(),
            _kind: PhantomData,
        }
    }

    pub fn counters(&self) -> &StoreCounters {
        &self.counters
    }

    /// Insert a record without counting it as a client write
    pub fn seed(&self, record: R) -> Result<R, StoreError> {
        self.insert(&record)
    }

    /// Current contents, ordered by id
    pub fn records(&self) -> Vec<R> {
        self.lock()
            .values()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_revision(&self) -> String {
        (self.revision.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn decode(value: &Value) -> Result<R, StoreError> {
        Ok(serde_json::from_value(value.clone())?)
    }

    fn insert(&self, record: &R) -> Result<R, StoreError> {
        let mut records = self.lock();
        let name = record.name().to_string();
        if records.contains_key(&name) {
            return Err(StoreError::Conflict {
                target: name,
                message: "already exists".to_string(),
            });
        }

        let mut stored = record.clone();
        let metadata = stored.metadata_mut();
        metadata.uid = Some(Uuid::new_v4().to_string());
        metadata.resource_version = Some(self.next_revision());

        records.insert(name, serde_json::to_value(&stored)?);
        Ok(stored)
    }

    fn apply_patch(&self, name: &str, merge_patch: &[u8]) -> Result<R, StoreError> {
        let patch: Value = serde_json::from_slice(merge_patch)?;
        if !patch.is_object() {
            return Err(StoreError::InvalidPatch(
                "merge patch must be a JSON object".to_string(),
            ));
        }

        let mut records = self.lock();
        let current = records
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        if let Some(expected) = patch
            .pointer("/metadata/resourceVersion")
            .and_then(Value::as_str)
        {
            check_revision(name, current, expected)?;
        }

        let mut updated = current.clone();
        merge(&mut updated, &patch);
        set_metadata(&mut updated, "name", Value::String(name.to_string()));
        set_metadata(
            &mut updated,
            "resourceVersion",
            Value::String(self.next_revision()),
        );

        let record = Self::decode(&updated)?;
        records.insert(name.to_string(), updated);
        Ok(record)
    }

    fn replace_status(&self, record: &R) -> Result<R, StoreError> {
        let name = record.name();
        let mut records = self.lock();
        let current = records
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        if let Some(expected) = record.resource_version() {
            check_revision(name, current, expected)?;
        }

        let submitted = serde_json::to_value(record)?;
        let mut updated = current.clone();
        if let Some(object) = updated.as_object_mut() {
            match submitted.get("status") {
                Some(status) => object.insert("status".to_string(), status.clone()),
                None => object.remove("status"),
            };
        }
        set_metadata(
            &mut updated,
            "resourceVersion",
            Value::String(self.next_revision()),
        );

        let stored = Self::decode(&updated)?;
        records.insert(name.to_string(), updated);
        Ok(stored)
    }
}

#[async_trait]
impl<R: Resource> ResourceStore<R> for MemoryStore<R> {
    async fn list(&self, selector: &LabelSelector) -> ImportResult<Vec<R>> {
        StoreCounters::bump(&self.counters.lists);
        Ok(self
            .records()
            .into_iter()
            .filter(|r| selector.matches(&r.metadata().labels))
            .collect())
    }

    async fn get(&self, name: &str) -> ImportResult<R> {
        StoreCounters::bump(&self.counters.gets);
        let records = self.lock();
        let value = records
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        Ok(Self::decode(value)?)
    }

    async fn create(&self, record: &R) -> ImportResult<R> {
        StoreCounters::bump(&self.counters.creates);
        Ok(self.insert(record)?)
    }

    async fn patch(&self, name: &str, merge_patch: &[u8]) -> ImportResult<R> {
        StoreCounters::bump(&self.counters.patches);
        Ok(self.apply_patch(name, merge_patch)?)
    }

    async fn update_status(&self, record: &R) -> ImportResult<R> {
        StoreCounters::bump(&self.counters.status_updates);
        Ok(self.replace_status(record)?)
    }
}

fn check_revision(name: &str, current: &Value, expected: &str) -> Result<(), StoreError> {
    let actual = current
        .pointer("/metadata/resourceVersion")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if actual != expected {
        return Err(StoreError::Conflict {
            target: name.to_string(),
            message: format!(
                "the object has been modified (have revision {}, got {})",
                actual, expected
            ),
        });
    }
    Ok(())
}

fn set_metadata(document: &mut Value, key: &str, value: Value) {
    if let Some(object) = document.as_object_mut() {
        let metadata = object
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(metadata) = metadata.as_object_mut() {
            metadata.insert(key.to_string(), value);
        }
    }
}

/// RFC 7386 JSON merge patch
fn merge(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                merge(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}
