//! Decoded bundle metadata and the decoder seam
//!
//! A bundle is a packaged, versioned application archive. The importer only
//! ever sees it through a [`BundleDescriptor`]; the archive format itself is
//! the business of a [`BundleDecoder`] implementation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::constants::{CATEGORY_KEY_IN_CHART, DISPLAY_NAME_KEY_IN_CHART};
use crate::error::ImportResult;

/// Maintainer entry as declared by a bundle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintainer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Read-only view of a decoded bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleDescriptor {
    /// Intrinsic bundle name
    pub name: String,
    pub version: String,
    pub app_version: String,
    pub description: String,
    pub icon: String,
    pub home: String,
    pub sources: Vec<String>,
    pub maintainers: Vec<Maintainer>,
    pub keywords: Vec<String>,
    pub annotations: BTreeMap<String, String>,
    /// Size of the archive on disk
    pub size: u64,
}

impl BundleDescriptor {
    /// Trimmed annotation value, `None` when absent or blank
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Category name declared by the bundle
    pub fn category(&self) -> Option<&str> {
        self.annotation(CATEGORY_KEY_IN_CHART)
    }

    /// Display name embedded in the bundle, if any
    pub fn display_name(&self) -> Option<&str> {
        self.annotation(DISPLAY_NAME_KEY_IN_CHART)
    }
}

/// Turns a bundle file into a [`BundleDescriptor`]
///
/// Failures must be reported as [`crate::ImportError::Decode`].
pub trait BundleDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> ImportResult<BundleDescriptor>;
}
