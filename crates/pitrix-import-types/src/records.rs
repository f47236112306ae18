//! Records held by the declarative resource store
//!
//! The wire shape follows the store's object model: every record carries an
//! [`ObjectMeta`] (id, revision, labels, annotations, owners) plus a `spec`,
//! and version records additionally a `status` sub-object.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::bundle::{BundleDescriptor, Maintainer};
use crate::constants::{
    APPLICATION_ID_LABEL_KEY, BUILTIN_LABEL_KEY, STORE_SUFFIX, WORKSPACE_LABEL_KEY,
};

/// Declared parent of a record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub uid: String,
}

/// Identity and bookkeeping shared by all records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Record id
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Revision token used for compare-and-swap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

impl ObjectMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// A kind of record the resource store knows about
pub trait Resource: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Wire kind, e.g. `HelmApplication`
    const KIND: &'static str;
    /// Collection name in store paths, e.g. `helmapplications`
    const PLURAL: &'static str;

    fn metadata(&self) -> &ObjectMeta;
    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    fn name(&self) -> &str {
        &self.metadata().name
    }

    fn resource_version(&self) -> Option<&str> {
        self.metadata().resource_version.as_deref()
    }
}

// ============================================================================
// Category
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySpec {
    /// Display name, unique within the store
    pub name: String,
    /// Icon identifier
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub metadata: ObjectMeta,
    pub spec: CategorySpec,
}

impl Resource for CategoryRecord {
    const KIND: &'static str = "HelmCategory";
    const PLURAL: &'static str = "helmcategories";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

// ============================================================================
// Application
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSpec {
    /// Display name
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub metadata: ObjectMeta,
    pub spec: ApplicationSpec,
}

impl ApplicationRecord {
    /// Display name of the application
    pub fn true_name(&self) -> &str {
        &self.spec.name
    }

    pub fn workspace(&self) -> &str {
        self.metadata.label(WORKSPACE_LABEL_KEY).unwrap_or_default()
    }

    pub fn is_builtin(&self) -> bool {
        self.metadata.label(BUILTIN_LABEL_KEY) == Some("true")
    }

    /// Primary application id, with the store suffix stripped
    pub fn application_id(&self) -> &str {
        self.metadata
            .name
            .strip_suffix(STORE_SUFFIX)
            .unwrap_or(&self.metadata.name)
    }

    /// Id of the secondary record mirroring this application in the store
    pub fn store_id(&self) -> String {
        format!("{}{}", self.application_id(), STORE_SUFFIX)
    }
}

impl Resource for ApplicationRecord {
    const KIND: &'static str = "HelmApplication";
    const PLURAL: &'static str = "helmapplications";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

// ============================================================================
// Application version
// ============================================================================

/// Metadata snapshot taken from the bundle when the version was imported
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub icon: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub home: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Maintainer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl From<&BundleDescriptor> for ChartMetadata {
    fn from(bundle: &BundleDescriptor) -> Self {
        Self {
            name: bundle.name.clone(),
            version: bundle.version.clone(),
            app_version: bundle.app_version.clone(),
            icon: bundle.icon.clone(),
            home: bundle.home.clone(),
            sources: bundle.sources.clone(),
            maintainers: bundle.maintainers.clone(),
            keywords: bundle.keywords.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChartMetadata>,
    /// Content store key of the uploaded payload; set once, never changed
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data_key: String,
}

/// Lifecycle state of a version. The importer only moves `Pending` to `Active`.
///
/// States managed by other writers (draft, submitted, suspended, ...) are
/// kept verbatim in `Other` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VersionState {
    #[default]
    Pending,
    Active,
    Other(String),
}

impl VersionState {
    pub fn as_str(&self) -> &str {
        match self {
            VersionState::Pending => "pending",
            VersionState::Active => "active",
            VersionState::Other(state) => state.as_str(),
        }
    }
}

impl From<String> for VersionState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "" | "pending" => VersionState::Pending,
            "active" => VersionState::Active,
            _ => VersionState::Other(s),
        }
    }
}

impl From<VersionState> for String {
    fn from(state: VersionState) -> Self {
        match state {
            VersionState::Other(state) => state,
            state => state.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for VersionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the append-only audit log.
///
/// Fields this crate does not model (`message`, `operatorType`, ...) are
/// carried in `extra` so that rewriting the status leaves history intact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<VersionState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub operator: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Audit {
    pub fn new(state: VersionState, operator: impl Into<String>) -> Self {
        Self {
            state: Some(state),
            time: Some(Utc::now()),
            operator: operator.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionStatus {
    #[serde(default)]
    pub state: VersionState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audit: Vec<Audit>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub metadata: ObjectMeta,
    pub spec: VersionSpec,
    #[serde(default)]
    pub status: VersionStatus,
}

impl VersionRecord {
    /// Version string of the packaged bundle
    pub fn chart_version(&self) -> &str {
        self.spec
            .metadata
            .as_ref()
            .map(|m| m.version.as_str())
            .unwrap_or_default()
    }

    pub fn true_name(&self) -> &str {
        self.spec
            .metadata
            .as_ref()
            .map(|m| m.name.as_str())
            .unwrap_or_default()
    }

    pub fn application_id(&self) -> &str {
        self.metadata
            .label(APPLICATION_ID_LABEL_KEY)
            .unwrap_or_default()
    }

    pub fn payload_key(&self) -> Option<&str> {
        Some(self.spec.data_key.as_str()).filter(|k| !k.is_empty())
    }

    pub fn is_active(&self) -> bool {
        self.status.state == VersionState::Active
    }
}

impl Resource for VersionRecord {
    const KIND: &'static str = "HelmApplicationVersion";
    const PLURAL: &'static str = "helmapplicationversions";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_application_ids() {
        let app = ApplicationRecord {
            metadata: ObjectMeta::new("app-abc"),
            ..Default::default()
        };
        assert_eq!(app.application_id(), "app-abc");
        assert_eq!(app.store_id(), "app-abc-store");

        let store_app = ApplicationRecord {
            metadata: ObjectMeta::new("app-abc-store"),
            ..Default::default()
        };
        assert_eq!(store_app.application_id(), "app-abc");
        assert_eq!(store_app.store_id(), "app-abc-store");
    }

    #[test]
    fn test_workspace_defaults_to_empty() {
        let mut app = ApplicationRecord::default();
        assert_eq!(app.workspace(), "");
        app.metadata
            .labels
            .insert(WORKSPACE_LABEL_KEY.to_string(), "system-workspace".to_string());
        assert_eq!(app.workspace(), "system-workspace");
    }

    #[test]
    fn test_version_record_wire_shape() {
        let value = json!({
            "metadata": {
                "name": "appv-1",
                "resourceVersion": "7",
                "labels": { "application.kubesphere.io/app-id": "app-1" }
            },
            "spec": {
                "metadata": { "name": "redis", "version": "1.0.0", "appVersion": "6.2" },
                "dataKey": "appv-1"
            },
            "status": {
                "state": "active",
                "audit": [{ "state": "active", "time": "2024-01-02T03:04:05Z", "operator": "admin" }]
            }
        });

        let record: VersionRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.resource_version(), Some("7"));
        assert_eq!(record.chart_version(), "1.0.0");
        assert_eq!(record.application_id(), "app-1");
        assert_eq!(record.payload_key(), Some("appv-1"));
        assert!(record.is_active());
        assert_eq!(record.status.audit.len(), 1);
    }

    #[test]
    fn test_unmanaged_state_reads_as_pending() {
        let value = json!({
            "metadata": { "name": "appv-1" },
            "spec": {},
            "status": { "state": "draft" }
        });
        let record: VersionRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.status.state, VersionState::Other("draft".to_string()));
        assert!(!record.is_active());
        assert_eq!(record.payload_key(), None);
    }

    #[test]
    fn test_audit_entry_without_operator_decodes() {
        let value = json!({
            "metadata": { "name": "appv-1" },
            "spec": {},
            "status": { "audit": [{ "state": "draft", "time": "2024-01-02T03:04:05Z" }] }
        });
        let record: VersionRecord = serde_json::from_value(value).unwrap();
        let entry = &record.status.audit[0];
        assert_eq!(entry.operator, "");
        assert_eq!(entry.state, Some(VersionState::Other("draft".to_string())));

        let written = serde_json::to_value(&record.status.audit[0]).unwrap();
        assert_eq!(written, json!({ "state": "draft", "time": "2024-01-02T03:04:05Z" }));
    }

    #[test]
    fn test_status_round_trips_foreign_fields() {
        let status = json!({
            "state": "suspended",
            "audit": [
                {
                    "state": "submitted",
                    "time": "2024-01-02T03:04:05Z",
                    "operator": "alice",
                    "operatorType": "ISV",
                    "message": "please review"
                },
                { "state": "passed", "time": "2024-01-03T03:04:05Z", "operator": "bob" }
            ],
            "approvedBy": "carol"
        });
        let decoded: VersionStatus = serde_json::from_value(status.clone()).unwrap();
        assert_eq!(decoded.state, VersionState::Other("suspended".to_string()));
        assert_eq!(serde_json::to_value(&decoded).unwrap(), status);
    }

    #[test]
    fn test_missing_status_defaults_to_pending() {
        let value = json!({ "metadata": { "name": "appv-1" }, "spec": {} });
        let record: VersionRecord = serde_json::from_value(value).unwrap();
        assert!(!record.is_active());
        assert!(record.status.audit.is_empty());
    }
}
