//! Import configuration overlay
//!
//! Loaded once from `import-config.yaml` before any bundle is processed and
//! read-only for the rest of the run.
//!
//! ```yaml
//! categoryIcon:
//!   database: database
//! appNameReplace:
//!   redis: Redis
//! extraAnnotations:
//!   redis:
//!     app.kubesphere.io/featured: "true"
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use pitrix_import_types::{BundleDescriptor, ImportError, ImportResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportConfig {
    /// Lower-cased category name to icon identifier
    pub category_icon: BTreeMap<String, String>,
    /// Intrinsic bundle name to display name
    pub app_name_replace: BTreeMap<String, String>,
    /// Intrinsic bundle name to annotations added to its application
    pub extra_annotations: BTreeMap<String, BTreeMap<String, String>>,
}

impl ImportConfig {
    pub fn load(path: &Path) -> ImportResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ImportError::InvalidConfiguration(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_yaml(&content).map_err(|e| {
            ImportError::InvalidConfiguration(format!("{}: {}", path.display(), e))
        })?;
        debug!(
            "Loaded import config from {}: {} icons, {} name replacements, {} annotation sets",
            path.display(),
            config.category_icon.len(),
            config.app_name_replace.len(),
            config.extra_annotations.len()
        );
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.category_icon = config
            .category_icon
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        Ok(config)
    }

    /// Icon configured for a category, matched case-insensitively
    pub fn icon(&self, category: &str) -> Option<&str> {
        self.category_icon
            .get(&category.to_lowercase())
            .map(String::as_str)
    }

    /// Display name for a bundle.
    ///
    /// A configured replacement wins, then the display name embedded in the
    /// bundle, then the intrinsic bundle name.
    pub fn replace_app_name(&self, bundle: &BundleDescriptor) -> String {
        if let Some(name) = self.app_name_replace.get(&bundle.name) {
            return name.clone();
        }
        bundle
            .display_name()
            .map(str::to_string)
            .unwrap_or_else(|| bundle.name.clone())
    }

    pub fn extra_annotations(&self, bundle: &BundleDescriptor) -> BTreeMap<String, String> {
        self.extra_annotations
            .get(&bundle.name)
            .cloned()
            .unwrap_or_default()
    }
}
