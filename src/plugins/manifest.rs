use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::PluginError;
use super::descriptor::{PluginDescriptor, PluginName};
use crate::engine::coerce_version;

pub(super) const PLUGIN_MANIFEST_FILE: &str = "plugin.json";

/// `hostVersion` value accepted by any host.
pub const ANY_HOST_VERSION: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigPath {
    Key(String),
    Path(Vec<String>),
}

impl ConfigPath {
    fn into_segments(self) -> Vec<String> {
        match self {
            Self::Key(key) => vec![key],
            Self::Path(path) => path,
        }
    }
}

/// Raw `plugin.json` contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub version: String,
    /// Host version the plugin was built for; defaults to `version`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_plugins: Vec<PluginName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional_plugins: Vec<PluginName>,
    /// Engine component name to semver range.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub required_engine_plugins: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_bundles: Vec<PluginName>,
    #[serde(default)]
    pub server: bool,
    #[serde(default)]
    pub ui: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<ConfigPath>,
}

impl PluginManifest {
    pub async fn load(root_dir: &Path) -> Result<Self, PluginError> {
        let manifest_path = root_dir.join(PLUGIN_MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(PluginError::ManifestNotFound {
                path: manifest_path,
            });
        }
        let content = tokio::fs::read_to_string(&manifest_path).await?;
        Self::parse(&manifest_path, &content)
    }

    pub fn parse(manifest_path: &Path, content: &str) -> Result<Self, PluginError> {
        serde_json::from_str(content).map_err(|e| PluginError::InvalidManifest {
            path: manifest_path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Checks the manifest against the running host and converts it.
    pub fn into_descriptor(
        self,
        root_dir: PathBuf,
        host_version: &str,
    ) -> Result<PluginDescriptor, PluginError> {
        let invalid = |reason: String| PluginError::InvalidManifest {
            path: root_dir.join(PLUGIN_MANIFEST_FILE),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("plugin manifest must contain an \"id\" property".into()));
        }
        if self.version.trim().is_empty() {
            return Err(invalid(format!(
                "plugin manifest for \"{}\" must contain a \"version\" property",
                self.id
            )));
        }
        if !self.server && !self.ui {
            return Err(invalid(format!(
                "both \"server\" and \"ui\" are missing or false in plugin manifest for \"{}\", but at least one of these must be set to true",
                self.id
            )));
        }

        let expected = self.host_version.as_deref().unwrap_or(&self.version);
        if !is_host_version_compatible(expected, host_version) {
            return Err(invalid(format!(
                "plugin \"{}\" is only compatible with host version \"{}\", but used host version is \"{}\"",
                self.id, expected, host_version
            )));
        }

        let mut builder = PluginDescriptor::builder(self.id)
            .version(self.version)
            .path(root_dir)
            .required(self.required_plugins)
            .optional(self.optional_plugins)
            .required_bundles(self.required_bundles)
            .server(self.server)
            .ui(self.ui);
        if let Some(config_path) = self.config_path {
            builder = builder.config_path(config_path.into_segments());
        }
        for (component, range) in self.required_engine_plugins {
            builder = builder.engine_component(component, range);
        }
        Ok(builder.build())
    }
}

/// Compares versions after coercion to `major.minor.patch`, ignoring any
/// pre-release or build suffix.
pub fn is_host_version_compatible(expected: &str, actual: &str) -> bool {
    if expected.trim() == ANY_HOST_VERSION {
        return true;
    }
    match (coerce_version(expected), coerce_version(actual)) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_manifest(dir: &Path, body: &str) {
        std::fs::write(dir.join(PLUGIN_MANIFEST_FILE), body).unwrap();
    }

    #[tokio::test]
    async fn test_manifest_load() {
        let dir = tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"{
                "id": "alerting",
                "version": "2.9.0",
                "requiredPlugins": ["data", "data"],
                "optionalPlugins": ["home"],
                "requiredEnginePlugins": {"engine-alerting": "^2.9.0"},
                "server": true,
                "ui": true,
                "configPath": ["alerting", "dashboards"]
            }"#,
        );

        let manifest = PluginManifest::load(dir.path()).await.unwrap();
        assert_eq!(manifest.id, "alerting");
        assert!(manifest.host_version.is_none());

        let descriptor = manifest
            .into_descriptor(dir.path().to_path_buf(), "2.9.0")
            .unwrap();
        assert_eq!(descriptor.id(), "alerting");
        assert_eq!(descriptor.required_plugins(), ["data"]);
        assert_eq!(descriptor.optional_plugins(), ["home"]);
        assert_eq!(
            descriptor.required_engine_components().get("engine-alerting").map(String::as_str),
            Some("^2.9.0")
        );
        assert_eq!(descriptor.config_path(), ["alerting", "dashboards"]);
        assert!(descriptor.server_enabled() && descriptor.ui_enabled());
        assert_eq!(descriptor.path(), dir.path());
    }

    #[tokio::test]
    async fn test_manifest_not_found() {
        let dir = tempdir().unwrap();
        let err = PluginManifest::load(dir.path()).await.unwrap_err();
        assert!(matches!(err, PluginError::ManifestNotFound { .. }));
    }

    #[tokio::test]
    async fn test_manifest_invalid_json() {
        let dir = tempdir().unwrap();
        write_manifest(dir.path(), "not json");
        let err = PluginManifest::load(dir.path()).await.unwrap_err();
        assert!(matches!(err, PluginError::InvalidManifest { .. }));
    }

    #[test]
    fn test_string_config_path_and_defaults() {
        let manifest = PluginManifest::parse(
            Path::new("plugin.json"),
            r#"{"id":"home","version":"1.0.0","server":true,"configPath":"home_page"}"#,
        )
        .unwrap();
        let descriptor = manifest
            .into_descriptor(PathBuf::from("/plugins/home"), "1.0.0")
            .unwrap();
        assert_eq!(descriptor.config_path(), ["home_page"]);
        assert!(!descriptor.ui_enabled());

        let manifest = PluginManifest::parse(
            Path::new("plugin.json"),
            r#"{"id":"data","version":"1.0.0","ui":true}"#,
        )
        .unwrap();
        let descriptor = manifest
            .into_descriptor(PathBuf::from("/plugins/data"), "1.0.0")
            .unwrap();
        assert_eq!(descriptor.config_path(), ["data"]);
        assert!(!descriptor.server_enabled());
    }

    #[test]
    fn test_missing_id_or_version() {
        let manifest = PluginManifest {
            version: "1.0.0".into(),
            server: true,
            ..Default::default()
        };
        let err = manifest.into_descriptor(PathBuf::from("/p"), "1.0.0").unwrap_err();
        assert!(err.to_string().contains("\"id\""));

        let manifest = PluginManifest {
            id: "versionless".into(),
            server: true,
            ..Default::default()
        };
        let err = manifest.into_descriptor(PathBuf::from("/p"), "1.0.0").unwrap_err();
        assert!(err.to_string().contains("\"version\""));
    }

    #[test]
    fn test_neither_server_nor_ui() {
        let manifest = PluginManifest {
            id: "inert".into(),
            version: "1.0.0".into(),
            ..Default::default()
        };
        let err = manifest.into_descriptor(PathBuf::from("/p"), "1.0.0").unwrap_err();
        assert!(err.to_string().contains("at least one"));
    }

    #[test]
    fn test_host_version_mismatch() {
        let manifest = PluginManifest {
            id: "old".into(),
            version: "1.0.0".into(),
            host_version: Some("7.10.2".into()),
            server: true,
            ..Default::default()
        };
        let err = manifest.into_descriptor(PathBuf::from("/p"), "2.9.0").unwrap_err();
        assert!(err.to_string().contains("only compatible with host version \"7.10.2\""));
    }

    #[test]
    fn test_host_version_compatibility() {
        assert!(is_host_version_compatible("*", "2.9.0"));
        assert!(is_host_version_compatible("2.9.0", "2.9.0-SNAPSHOT"));
        assert!(is_host_version_compatible("v2.9", "2.9.0"));
        assert!(!is_host_version_compatible("2.9.0", "2.10.0"));
        assert!(!is_host_version_compatible("unknown", "2.9.0"));
    }
}
