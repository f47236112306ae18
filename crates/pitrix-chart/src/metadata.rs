//! Chart.yaml schema

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

use pitrix_import_types::{BundleDescriptor, Maintainer};

use crate::error::ChartError;

/// Parsed contents of a Chart.yaml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartFile {
    #[serde(default)]
    pub api_version: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub version: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub app_version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub home: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub maintainers: Vec<ChartMaintainer>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartMaintainer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl ChartFile {
    pub fn from_yaml(yaml: &str) -> Result<Self, ChartError> {
        let chart: ChartFile = serde_yaml::from_str(yaml)?;
        if chart.name.trim().is_empty() {
            return Err(ChartError::MissingField("name"));
        }
        if chart.version.trim().is_empty() {
            return Err(ChartError::MissingField("version"));
        }
        Ok(chart)
    }

    pub fn into_descriptor(self, size: u64) -> BundleDescriptor {
        BundleDescriptor {
            name: self.name,
            version: self.version,
            app_version: self.app_version,
            description: self.description,
            icon: self.icon,
            home: self.home,
            sources: self.sources,
            maintainers: self
                .maintainers
                .into_iter()
                .map(|m| Maintainer {
                    name: m.name,
                    email: m.email,
                    url: m.url,
                })
                .collect(),
            keywords: self.keywords,
            annotations: self.annotations,
            size,
        }
    }
}

/// Unquoted versions such as `appVersion: 1.16` parse as numbers in YAML
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_chart() {
        let yaml = r#"
apiVersion: v2
name: redis
version: 1.0.0
appVersion: 6.2.6
description: Open source key-value store
icon: https://example.com/redis.png
home: https://redis.io
sources:
  - https://github.com/redis/redis
maintainers:
  - name: ops
    email: ops@example.com
keywords: [cache, database]
annotations:
  app.kubesphere.io/category: Database
"#;
        let chart = ChartFile::from_yaml(yaml).unwrap();
        assert_eq!(chart.api_version, "v2");
        let bundle = chart.into_descriptor(42);
        assert_eq!(bundle.name, "redis");
        assert_eq!(bundle.version, "1.0.0");
        assert_eq!(bundle.app_version, "6.2.6");
        assert_eq!(bundle.maintainers.len(), 1);
        assert_eq!(bundle.maintainers[0].email.as_deref(), Some("ops@example.com"));
        assert_eq!(bundle.maintainers[0].url, None);
        assert_eq!(bundle.keywords, vec!["cache", "database"]);
        assert_eq!(bundle.category(), Some("Database"));
        assert_eq!(bundle.size, 42);
    }

    #[test]
    fn test_numeric_versions_are_stringified() {
        let chart = ChartFile::from_yaml("name: nginx\nversion: 1.5\nappVersion: 1.16\n").unwrap();
        assert_eq!(chart.version, "1.5");
        assert_eq!(chart.app_version, "1.16");
    }

    #[test]
    fn test_missing_version_is_rejected() {
        let err = ChartFile::from_yaml("name: nginx\n").unwrap_err();
        assert!(matches!(err, ChartError::MissingField("version")));
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let err = ChartFile::from_yaml("version: 1.0.0\n").unwrap_err();
        assert!(matches!(err, ChartError::MissingField("name")));
    }

    #[test]
    fn test_malformed_yaml_is_rejected() {
        let err = ChartFile::from_yaml("name: [unterminated\n").unwrap_err();
        assert!(matches!(err, ChartError::InvalidMetadata(_)));
    }
}
