//! In-process content store

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use pitrix_import_types::{ContentStore, ImportResult};

use crate::error::BlobError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub file_name: String,
    pub body: Bytes,
}

/// Keeps uploaded objects in a map keyed by object key
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    uploads: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following upload fail until switched back
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of upload calls, failed ones included
    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredObject>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn upload(&self, key: &str, file_name: &str, body: Bytes) -> ImportResult<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(BlobError::UploadFailed(format!("{}: store unavailable", key)).into());
        }

        self.lock().insert(
            key.to_string(),
            StoredObject {
                file_name: file_name.to_string(),
                body,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitrix_import_types::ImportError;

    #[tokio::test]
    async fn test_upload_overwrites() {
        let store = MemoryContentStore::new();
        store
            .upload("system-workspace/appv-1", "appv-1", Bytes::from_static(b"one"))
            .await
            .unwrap();
        store
            .upload("system-workspace/appv-1", "appv-1", Bytes::from_static(b"two"))
            .await
            .unwrap();

        let object = store.get("system-workspace/appv-1").unwrap();
        assert_eq!(object.file_name, "appv-1");
        assert_eq!(object.body, Bytes::from_static(b"two"));
        assert_eq!(store.uploads(), 2);
        assert_eq!(store.keys().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_upload_stores_nothing() {
        let store = MemoryContentStore::new();
        store.set_failing(true);

        let err = store
            .upload("ws/appv-1", "appv-1", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Upload(_)));
        assert!(!store.contains("ws/appv-1"));
        assert_eq!(store.uploads(), 1);
    }
}
