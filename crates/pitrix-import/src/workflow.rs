//! Import workflow
//!
//! Reconciles decoded bundles into the resource store:
//!
//! 1. **Category**: found by display name or created once.
//! 2. **Application**: matched among built-in records by resolved or raw
//!    name, renamed when the configured display name changed, created
//!    otherwise. The `-store` mirror follows every rename.
//! 3. **Version**: matched by version string under the application, payload
//!    uploaded before the record publishing its key exists, then activated.
//!
//! Every step can be re-run from any partial state left by an earlier run.

use bytes::Bytes;
use futures::FutureExt;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use pitrix_import_types::constants::{
    API_VERSION, APPLICATION_ID_LABEL_KEY, APPLICATION_ID_PREFIX, BUILTIN_LABEL_KEY,
    CATEGORY_ID_LABEL_KEY, CATEGORY_ID_PREFIX, CREATOR_ANNOTATION_KEY, DEFAULT_CATEGORY_ICON,
    OPERATOR, SYSTEM_WORKSPACE, VERSION_ID_PREFIX, WORKSPACE_LABEL_KEY,
};
use pitrix_import_types::{
    ApplicationRecord, ApplicationSpec, Audit, BundleDecoder, BundleDescriptor, CategoryRecord,
    CategorySpec, ChartMetadata, ContentStore, IdGenerator, ImportResult, LabelSelector,
    ObjectMeta, OwnerReference, Resource, ResourceStore, UuidIdGenerator, VersionRecord,
    VersionSpec, VersionState,
};

use crate::config::ImportConfig;
use crate::retry::{with_retry, RetryBudget};

/// Resource and content store handles used by the workflow
#[derive(Clone)]
pub struct ImportStores {
    pub categories: Arc<dyn ResourceStore<CategoryRecord>>,
    pub applications: Arc<dyn ResourceStore<ApplicationRecord>>,
    pub versions: Arc<dyn ResourceStore<VersionRecord>>,
    pub content: Arc<dyn ContentStore>,
}

pub struct ImportWorkflow {
    stores: ImportStores,
    decoder: Arc<dyn BundleDecoder>,
    config: Arc<ImportConfig>,
    ids: Arc<dyn IdGenerator>,
    retry: RetryBudget,
}

impl ImportWorkflow {
    pub fn new(
        stores: ImportStores,
        decoder: Arc<dyn BundleDecoder>,
        config: Arc<ImportConfig>,
    ) -> Self {
        Self {
            stores,
            decoder,
            config,
            ids: Arc::new(UuidIdGenerator),
            retry: RetryBudget::default(),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_retry_budget(mut self, retry: RetryBudget) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Decode a bundle file
    pub fn decode(&self, path: &Path) -> ImportResult<BundleDescriptor> {
        self.decoder.decode(path)
    }

    /// Find the category with this display name, creating it when absent
    pub async fn create_category(&self, name: &str) -> ImportResult<CategoryRecord> {
        info!("Resolving category {}", name);
        let categories = self
            .stores
            .categories
            .list(&LabelSelector::everything())
            .await?;

        if let Some(existing) = categories.into_iter().find(|c| c.spec.name == name) {
            debug!("Category {} exists as {}", name, existing.name());
            return Ok(existing);
        }

        let icon = self.config.icon(name).unwrap_or(DEFAULT_CATEGORY_ICON);
        let mut metadata = ObjectMeta::new(self.ids.generate(CATEGORY_ID_PREFIX));
        metadata
            .annotations
            .insert(CREATOR_ANNOTATION_KEY.to_string(), OPERATOR.to_string());

        let category = CategoryRecord {
            metadata,
            spec: CategorySpec {
                name: name.to_string(),
                description: icon.to_string(),
            },
        };

        info!(
            "Creating category {} ({}), icon: {}",
            name,
            category.name(),
            icon
        );
        self.stores.categories.create(&category).await
    }

    /// Resolve the application record for a bundle.
    ///
    /// A built-in record already carrying the resolved display name is
    /// returned as is. Failing that, a record still named after the raw
    /// bundle name is renamed. Only when neither exists is a new record
    /// created.
    pub async fn create_app(&self, bundle: &BundleDescriptor) -> ImportResult<ApplicationRecord> {
        info!(
            "Resolving application for chart {} {}",
            bundle.name, bundle.version
        );
        let applications = self
            .stores
            .applications
            .list(&LabelSelector::everything().with(BUILTIN_LABEL_KEY, "true"))
            .await?;

        let resolved_name = self.config.replace_app_name(bundle);

        if let Some(existing) = applications
            .iter()
            .find(|a| a.true_name() == resolved_name)
        {
            info!(
                "Application {} exists as {}",
                resolved_name,
                existing.name()
            );
            self.sync_store_name(existing, &resolved_name).await?;
            return Ok(existing.clone());
        }

        if let Some(previous) = applications
            .into_iter()
            .find(|a| a.true_name() == bundle.name)
        {
            info!(
                "Renaming application {} from {} to {}",
                previous.name(),
                bundle.name,
                resolved_name
            );
            let renamed = self.update_app_name(previous, &resolved_name).await?;
            self.sync_store_name(&renamed, &resolved_name).await?;
            return Ok(renamed);
        }

        let category = match bundle.category() {
            Some(name) => Some(self.create_category(name).await?),
            None => None,
        };

        let mut labels = BTreeMap::from([
            (BUILTIN_LABEL_KEY.to_string(), "true".to_string()),
            (WORKSPACE_LABEL_KEY.to_string(), SYSTEM_WORKSPACE.to_string()),
        ]);
        if let Some(category) = &category {
            labels.insert(
                CATEGORY_ID_LABEL_KEY.to_string(),
                category.name().to_string(),
            );
        }

        let mut annotations = self.config.extra_annotations(bundle);
        annotations.insert(CREATOR_ANNOTATION_KEY.to_string(), OPERATOR.to_string());

        let application = ApplicationRecord {
            metadata: ObjectMeta {
                labels,
                annotations,
                ..ObjectMeta::new(self.ids.generate(APPLICATION_ID_PREFIX))
            },
            spec: ApplicationSpec {
                name: resolved_name,
                description: bundle.description.clone(),
                icon: bundle.icon.clone(),
            },
        };

        info!(
            "Creating application {} ({})",
            application.true_name(),
            application.name()
        );
        self.stores.applications.create(&application).await
    }

    /// Resolve, upload and activate the version record for a bundle file
    pub async fn create_app_ver(
        &self,
        application: &ApplicationRecord,
        path: &Path,
    ) -> ImportResult<VersionRecord> {
        let bundle = self.decoder.decode(path)?;
        info!(
            "Resolving version {} {} of application {}",
            bundle.name,
            bundle.version,
            application.name()
        );

        let versions = self
            .stores
            .versions
            .list(
                &LabelSelector::everything()
                    .with(APPLICATION_ID_LABEL_KEY, application.application_id()),
            )
            .await?;

        let existing = versions
            .into_iter()
            .find(|v| v.chart_version() == bundle.version);

        if let Some(version) = &existing {
            if version.payload_key().is_some() && version.is_active() {
                info!(
                    "Version {} {} already imported as {}",
                    version.true_name(),
                    version.chart_version(),
                    version.name()
                );
                return Ok(version.clone());
            }
            debug!(
                "Completing version {} (state: {}, payload: {})",
                version.name(),
                version.status.state,
                version.payload_key().unwrap_or("none")
            );
        }

        let version_id = match &existing {
            Some(version) => version.name().to_string(),
            None => self.ids.generate(VERSION_ID_PREFIX),
        };

        let needs_upload = existing
            .as_ref()
            .map_or(true, |v| v.payload_key().is_none());
        if needs_upload {
            self.upload_payload(application.workspace(), &version_id, path)
                .await?;
        }

        let version = match existing {
            Some(version) if version.payload_key().is_none() => {
                self.publish_payload_key(version).await?
            }
            Some(version) => version,
            None => {
                let record = new_version_record(application, &bundle, version_id);
                let created = self.stores.versions.create(&record).await?;
                info!("Created version {}", created.name());
                created
            }
        };

        self.update_app_version_status(version).await
    }

    /// Move a version to `active`, appending one audit entry
    pub async fn update_app_version_status(
        &self,
        version: VersionRecord,
    ) -> ImportResult<VersionRecord> {
        info!(
            "Activating version {} {} ({})",
            version.true_name(),
            version.chart_version(),
            version.name()
        );
        let versions = self.stores.versions.clone();
        let fetch_from = versions.clone();

        with_retry(
            "activate application version",
            self.retry.activate,
            version,
            VersionRecord::is_active,
            move |id| {
                let versions = fetch_from.clone();
                async move { versions.get(&id).await }.boxed()
            },
            |v| {
                v.status.state = VersionState::Active;
                v.status
                    .audit
                    .push(Audit::new(VersionState::Active, OPERATOR));
            },
            move |v| {
                let versions = versions.clone();
                async move { versions.update_status(&v).await }.boxed()
            },
        )
        .await
    }

    /// Change the display name of an application record
    pub async fn update_app_name(
        &self,
        application: ApplicationRecord,
        name: &str,
    ) -> ImportResult<ApplicationRecord> {
        let applications = self.stores.applications.clone();
        let fetch_from = applications.clone();
        let wanted = name.to_string();

        with_retry(
            "rename application",
            self.retry.rename,
            application,
            |a| a.true_name() == name,
            move |id| {
                let applications = fetch_from.clone();
                async move { applications.get(&id).await }.boxed()
            },
            |a| a.spec.name = wanted.clone(),
            move |a| {
                let applications = applications.clone();
                async move {
                    let patch = json!({
                        "metadata": { "resourceVersion": a.resource_version() },
                        "spec": { "name": a.spec.name },
                    });
                    applications
                        .patch(a.name(), patch.to_string().as_bytes())
                        .await
                }
                .boxed()
            },
        )
        .await
    }

    /// Mirror a display name onto the application's `-store` record.
    ///
    /// An absent mirror counts as in sync.
    pub async fn sync_store_name(
        &self,
        application: &ApplicationRecord,
        name: &str,
    ) -> ImportResult<()> {
        let store_id = application.store_id();
        match self.stores.applications.get(&store_id).await {
            Ok(mirror) if mirror.true_name() == name => Ok(()),
            Ok(mirror) => {
                info!(
                    "Renaming store application {} from {} to {}",
                    store_id,
                    mirror.true_name(),
                    name
                );
                self.update_app_name(mirror, name).await.map(|_| ())
            }
            Err(e) if e.is_not_found() => {
                debug!("No store application {}", store_id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn upload_payload(&self, workspace: &str, version_id: &str, path: &Path) -> ImportResult<()> {
        let body = tokio::fs::read(path).await?;
        let key = payload_object_key(workspace, version_id);
        info!(
            "Uploading {} ({} bytes) as {}",
            path.display(),
            body.len(),
            key
        );
        self.stores
            .content
            .upload(&key, version_id, Bytes::from(body))
            .await
    }

    /// Set the payload key on a version that was created without one
    async fn publish_payload_key(&self, version: VersionRecord) -> ImportResult<VersionRecord> {
        let versions = self.stores.versions.clone();
        let fetch_from = versions.clone();

        with_retry(
            "publish payload key",
            self.retry.publish,
            version,
            |v| v.payload_key().is_some(),
            move |id| {
                let versions = fetch_from.clone();
                async move { versions.get(&id).await }.boxed()
            },
            |v| v.spec.data_key = v.name().to_string(),
            move |v| {
                let versions = versions.clone();
                async move {
                    let patch = json!({
                        "metadata": { "resourceVersion": v.resource_version() },
                        "spec": { "dataKey": v.spec.data_key },
                    });
                    versions.patch(v.name(), patch.to_string().as_bytes()).await
                }
                .boxed()
            },
        )
        .await
    }
}

/// Object key of a version payload: `{workspace}/{version id}`
pub fn payload_object_key(workspace: &str, version_id: &str) -> String {
    if workspace.is_empty() {
        version_id.to_string()
    } else {
        format!("{}/{}", workspace, version_id)
    }
}

fn new_version_record(
    application: &ApplicationRecord,
    bundle: &BundleDescriptor,
    version_id: String,
) -> VersionRecord {
    let labels = BTreeMap::from([
        (
            APPLICATION_ID_LABEL_KEY.to_string(),
            application.application_id().to_string(),
        ),
        (
            WORKSPACE_LABEL_KEY.to_string(),
            application.workspace().to_string(),
        ),
    ]);
    let annotations = BTreeMap::from([(CREATOR_ANNOTATION_KEY.to_string(), OPERATOR.to_string())]);

    VersionRecord {
        metadata: ObjectMeta {
            labels,
            annotations,
            owner_references: vec![OwnerReference {
                api_version: API_VERSION.to_string(),
                kind: ApplicationRecord::KIND.to_string(),
                name: application.name().to_string(),
                uid: application.metadata.uid.clone().unwrap_or_default(),
            }],
            ..ObjectMeta::new(version_id.clone())
        },
        spec: VersionSpec {
            metadata: Some(ChartMetadata::from(bundle)),
            data_key: version_id,
        },
        status: Default::default(),
    }
}
