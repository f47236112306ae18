//! Store traits
//!
//! The importer talks to two external systems: a declarative resource store
//! with optimistic concurrency, and a content store holding bundle payloads.
//! Both sit behind these traits so the workflow can be driven against real
//! clients or in-memory doubles.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;

use crate::error::ImportResult;
use crate::records::Resource;

/// Exact-match label selector; an empty selector matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    labels: BTreeMap<String, String>,
}

impl LabelSelector {
    /// Selector matching every record
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.labels
            .iter()
            .all(|(k, v)| labels.get(k).map(|actual| actual == v).unwrap_or(false))
    }
}

impl std::fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self
            .labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "{}", rendered.join(","))
    }
}

/// CRUD over one record kind of the resource store
///
/// Writes are compare-and-swap: `patch` and `update_status` are rejected with
/// [`crate::ImportError::Conflict`] when the revision they carry is stale.
#[async_trait]
pub trait ResourceStore<R: Resource>: Send + Sync {
    async fn list(&self, selector: &LabelSelector) -> ImportResult<Vec<R>>;

    /// Fails with [`crate::ImportError::NotFound`] when no record has this id
    async fn get(&self, name: &str) -> ImportResult<R>;

    async fn create(&self, record: &R) -> ImportResult<R>;

    /// Apply a JSON merge patch to the record with this id
    async fn patch(&self, name: &str, merge_patch: &[u8]) -> ImportResult<R>;

    /// Replace the status sub-object of the record
    async fn update_status(&self, record: &R) -> ImportResult<R>;
}

/// Object storage for bundle payloads
///
/// Overwriting an existing key is allowed; callers decide whether to upload.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `body` under object `key`, advertised with `file_name`
    async fn upload(&self, key: &str, file_name: &str, body: Bytes) -> ImportResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_everything_matches_anything() {
        let selector = LabelSelector::everything();
        assert!(selector.is_empty());
        assert!(selector.matches(&labels(&[])));
        assert!(selector.matches(&labels(&[("a", "b")])));
    }

    #[test]
    fn test_exact_match() {
        let selector = LabelSelector::everything().with("builtin", "true");
        assert!(selector.matches(&labels(&[("builtin", "true"), ("other", "x")])));
        assert!(!selector.matches(&labels(&[("builtin", "false")])));
        assert!(!selector.matches(&labels(&[])));
    }

    #[test]
    fn test_display_is_sorted() {
        let selector = LabelSelector::everything()
            .with("zone", "b")
            .with("app", "a");
        assert_eq!(selector.to_string(), "app=a,zone=b");
    }
}
