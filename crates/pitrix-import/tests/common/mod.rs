//! Shared fixtures for the import integration tests
//!
//! - Chart archives written into a temp directory
//! - In-memory stores wired into an `ImportWorkflow`
//! - A store wrapper that rejects writes with conflicts

#![allow(dead_code)]

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pitrix_blob::MemoryContentStore;
use pitrix_chart::ChartLoader;
use pitrix_import::{ImportConfig, ImportRunner, ImportStores, ImportWorkflow, RetryBudget};
use pitrix_import_types::constants::{BUILTIN_LABEL_KEY, SYSTEM_WORKSPACE, WORKSPACE_LABEL_KEY};
use pitrix_import_types::{
    ApplicationRecord, CategoryRecord, ImportError, ImportResult, LabelSelector, ObjectMeta,
    Resource, ResourceStore, VersionRecord,
};
use pitrix_store::MemoryStore;

/// Write `<name>-<version>.tgz` holding `<name>/Chart.yaml`
pub fn write_chart(dir: &Path, name: &str, version: &str, annotations: &[(&str, &str)]) -> PathBuf {
    let mut chart_yaml = format!(
        "apiVersion: v2\nname: {name}\nversion: {version}\nappVersion: \"{version}\"\ndescription: {name} chart\n"
    );
    if !annotations.is_empty() {
        chart_yaml.push_str("annotations:\n");
        for (key, value) in annotations {
            chart_yaml.push_str(&format!("  {}: \"{}\"\n", key, value));
        }
    }

    let path = dir.join(format!("{}-{}.tgz", name, version));
    let file = File::create(&path).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (entry, contents) in [
        (format!("{}/Chart.yaml", name), chart_yaml),
        (format!("{}/values.yaml", name), "replicaCount: 1\n".to_string()),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, entry, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
    path
}

pub fn builtin_app(id: &str, name: &str) -> ApplicationRecord {
    let mut app = ApplicationRecord {
        metadata: ObjectMeta::new(id),
        ..Default::default()
    };
    app.spec.name = name.to_string();
    app.metadata
        .labels
        .insert(BUILTIN_LABEL_KEY.to_string(), "true".to_string());
    app.metadata
        .labels
        .insert(WORKSPACE_LABEL_KEY.to_string(), SYSTEM_WORKSPACE.to_string());
    app
}

/// Store rejecting `patch` and `update_status` with conflicts while its
/// budget of rejections lasts; everything else goes to the inner store
pub struct ConflictingStore<R> {
    inner: Arc<MemoryStore<R>>,
    remaining: AtomicUsize,
    rejected: AtomicUsize,
    unreachable: Option<String>,
}

impl<R: Resource> ConflictingStore<R> {
    pub fn always(inner: Arc<MemoryStore<R>>) -> Self {
        Self::times(inner, usize::MAX)
    }

    pub fn times(inner: Arc<MemoryStore<R>>, conflicts: usize) -> Self {
        Self {
            inner,
            remaining: AtomicUsize::new(conflicts),
            rejected: AtomicUsize::new(0),
            unreachable: None,
        }
    }

    /// Fail every `get` of `name` with a transport error
    pub fn with_unreachable(mut self, name: &str) -> Self {
        self.unreachable = Some(name.to_string());
        self
    }

    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }

    fn reject(&self, name: &str) -> Option<ImportError> {
        let took = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if took {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            Some(ImportError::Conflict(format!(
                "{} has been modified, please apply your changes to the latest version",
                name
            )))
        } else {
            None
        }
    }
}

#[async_trait]
impl<R: Resource> ResourceStore<R> for ConflictingStore<R> {
    async fn list(&self, selector: &LabelSelector) -> ImportResult<Vec<R>> {
        self.inner.list(selector).await
    }

    async fn get(&self, name: &str) -> ImportResult<R> {
        if self.unreachable.as_deref() == Some(name) {
            return Err(ImportError::Transport(format!(
                "GET {}: connection reset by peer",
                name
            )));
        }
        self.inner.get(name).await
    }

    async fn create(&self, record: &R) -> ImportResult<R> {
        self.inner.create(record).await
    }

    async fn patch(&self, name: &str, merge_patch: &[u8]) -> ImportResult<R> {
        match self.reject(name) {
            Some(conflict) => Err(conflict),
            None => self.inner.patch(name, merge_patch).await,
        }
    }

    async fn update_status(&self, record: &R) -> ImportResult<R> {
        match self.reject(record.name()) {
            Some(conflict) => Err(conflict),
            None => self.inner.update_status(record).await,
        }
    }
}

/// In-memory stores plus the handles the workflow sees
pub struct Harness {
    pub categories: Arc<MemoryStore<CategoryRecord>>,
    pub applications: Arc<MemoryStore<ApplicationRecord>>,
    pub versions: Arc<MemoryStore<VersionRecord>>,
    pub content: Arc<MemoryContentStore>,
    pub stores: ImportStores,
}

impl Harness {
    pub fn new() -> Self {
        let categories = Arc::new(MemoryStore::new());
        let applications = Arc::new(MemoryStore::new());
        let versions = Arc::new(MemoryStore::new());
        let content = Arc::new(MemoryContentStore::new());
        let stores = ImportStores {
            categories: categories.clone(),
            applications: applications.clone(),
            versions: versions.clone(),
            content: content.clone(),
        };
        Self {
            categories,
            applications,
            versions,
            content,
            stores,
        }
    }

    pub fn with_conflicting_applications(mut self, store: Arc<ConflictingStore<ApplicationRecord>>) -> Self {
        self.stores.applications = store;
        self
    }

    pub fn with_conflicting_versions(mut self, store: Arc<ConflictingStore<VersionRecord>>) -> Self {
        self.stores.versions = store;
        self
    }

    pub fn workflow(&self, config_yaml: &str) -> ImportWorkflow {
        let config = ImportConfig::from_yaml(config_yaml).unwrap();
        ImportWorkflow::new(self.stores.clone(), Arc::new(ChartLoader::new()), Arc::new(config))
            .with_retry_budget(RetryBudget::default())
    }

    pub fn runner(&self, config_yaml: &str) -> ImportRunner {
        ImportRunner::new(self.workflow(config_yaml))
    }

    /// Total create calls across the three record stores
    pub fn creates(&self) -> usize {
        self.categories.counters().creates()
            + self.applications.counters().creates()
            + self.versions.counters().creates()
    }
}
