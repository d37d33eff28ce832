use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::PluginError;
use super::descriptor::PluginDescriptor;
use super::manifest::{PLUGIN_MANIFEST_FILE, PluginManifest};

/// Finds plugin roots on disk and turns their manifests into descriptors.
pub struct PluginDiscovery {
    host_version: String,
}

impl PluginDiscovery {
    pub fn new(host_version: impl Into<String>) -> Self {
        Self {
            host_version: host_version.into(),
        }
    }

    /// Scans `dirs` in order. A directory holding a manifest is a plugin root;
    /// any other directory has its immediate children scanned instead.
    /// Results are sorted by path within each scanned parent.
    pub async fn discover(&self, dirs: &[PathBuf]) -> Result<Vec<PluginDescriptor>, PluginError> {
        let mut descriptors = Vec::new();

        for dir in dirs {
            if !dir.exists() {
                continue;
            }

            if Self::is_plugin_root(dir) {
                descriptors.push(self.load(dir.clone()).await?);
            } else {
                self.scan_children(dir, &mut descriptors).await?;
            }
        }

        Self::reject_duplicates(&descriptors)?;
        tracing::debug!(count = descriptors.len(), "Discovered plugins");
        Ok(descriptors)
    }

    fn is_plugin_root(dir: &Path) -> bool {
        dir.join(PLUGIN_MANIFEST_FILE).is_file()
    }

    async fn load(&self, root: PathBuf) -> Result<PluginDescriptor, PluginError> {
        let manifest = PluginManifest::load(&root).await?;
        manifest.into_descriptor(root, &self.host_version)
    }

    async fn scan_children(
        &self,
        parent: &Path,
        descriptors: &mut Vec<PluginDescriptor>,
    ) -> Result<(), PluginError> {
        let mut entries = tokio::fs::read_dir(parent).await?;
        let mut roots = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_dir() && Self::is_plugin_root(&path) {
                roots.push(path);
            }
        }

        roots.sort();
        for root in roots {
            descriptors.push(self.load(root).await?);
        }

        Ok(())
    }

    fn reject_duplicates(descriptors: &[PluginDescriptor]) -> Result<(), PluginError> {
        let mut seen: HashMap<&str, &Path> = HashMap::new();
        for descriptor in descriptors {
            if let Some(first) = seen.insert(descriptor.id(), descriptor.path()) {
                return Err(PluginError::DuplicateManifest {
                    plugin: descriptor.id().to_string(),
                    first: first.to_path_buf(),
                    second: descriptor.path().to_path_buf(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_plugin(parent: &Path, dir_name: &str, id: &str) -> PathBuf {
        let plugin_dir = parent.join(dir_name);
        std::fs::create_dir_all(&plugin_dir).unwrap();
        std::fs::write(
            plugin_dir.join(PLUGIN_MANIFEST_FILE),
            format!(r#"{{"id":"{}","version":"1.0.0","server":true}}"#, id),
        )
        .unwrap();
        plugin_dir
    }

    fn discovery() -> PluginDiscovery {
        PluginDiscovery::new("1.0.0")
    }

    #[tokio::test]
    async fn test_discover_direct_plugin_root() {
        let dir = tempdir().unwrap();
        let plugin_dir = create_plugin(dir.path(), "my-plugin", "myPlugin");

        let descriptors = discovery().discover(&[plugin_dir]).await.unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].id(), "myPlugin");
    }

    #[tokio::test]
    async fn test_discover_parent_directory() {
        let dir = tempdir().unwrap();
        create_plugin(dir.path(), "plugin-b", "b");
        create_plugin(dir.path(), "plugin-a", "a");

        let descriptors = discovery()
            .discover(&[dir.path().to_path_buf()])
            .await
            .unwrap();
        let ids: Vec<&str> = descriptors.iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_discover_nonexistent_dir() {
        let descriptors = discovery()
            .discover(&[PathBuf::from("/nonexistent/path")])
            .await
            .unwrap();
        assert!(descriptors.is_empty());
    }

    #[tokio::test]
    async fn test_discover_skips_non_plugin_dirs() {
        let dir = tempdir().unwrap();
        create_plugin(dir.path(), "real-plugin", "real");
        std::fs::create_dir(dir.path().join("not-a-plugin")).unwrap();

        let descriptors = discovery()
            .discover(&[dir.path().to_path_buf()])
            .await
            .unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].id(), "real");
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let dir1 = tempdir().unwrap();
        let dir2 = tempdir().unwrap();
        create_plugin(dir1.path(), "one", "same");
        create_plugin(dir2.path(), "two", "same");

        let err = discovery()
            .discover(&[dir1.path().to_path_buf(), dir2.path().to_path_buf()])
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::DuplicateManifest { ref plugin, .. } if plugin == "same"));
    }

    #[tokio::test]
    async fn test_incompatible_host_version_fails() {
        let dir = tempdir().unwrap();
        let plugin_dir = create_plugin(dir.path(), "p", "p");

        let err = PluginDiscovery::new("2.0.0")
            .discover(&[plugin_dir])
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::InvalidManifest { .. }));
    }
}
