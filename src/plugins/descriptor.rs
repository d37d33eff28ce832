//! Immutable plugin metadata.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Declared identifier of a plugin.
pub type PluginName = String;

/// Metadata for one plugin, fixed once the plugin is registered.
///
/// Dependency lists are ordered sets: declaration order is kept and
/// duplicates are dropped on construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    id: PluginName,
    version: String,
    path: PathBuf,
    config_path: Vec<String>,
    required_plugins: Vec<PluginName>,
    optional_plugins: Vec<PluginName>,
    required_engine_components: BTreeMap<String, String>,
    server: bool,
    ui: bool,
    required_bundles: Vec<PluginName>,
}

impl PluginDescriptor {
    /// Starts a descriptor for `id` with server side enabled and no dependencies.
    pub fn builder(id: impl Into<PluginName>) -> PluginDescriptorBuilder {
        PluginDescriptorBuilder::new(id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Key path of this plugin's section in the host configuration.
    pub fn config_path(&self) -> &[String] {
        &self.config_path
    }

    pub fn required_plugins(&self) -> &[PluginName] {
        &self.required_plugins
    }

    pub fn optional_plugins(&self) -> &[PluginName] {
        &self.optional_plugins
    }

    /// Engine component name to semver range.
    pub fn required_engine_components(&self) -> &BTreeMap<String, String> {
        &self.required_engine_components
    }

    pub fn server_enabled(&self) -> bool {
        self.server
    }

    pub fn ui_enabled(&self) -> bool {
        self.ui
    }

    pub fn required_bundles(&self) -> &[PluginName] {
        &self.required_bundles
    }

    /// Required dependencies followed by optional ones, without duplicates.
    pub fn all_dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = Vec::with_capacity(
            self.required_plugins.len() + self.optional_plugins.len(),
        );
        for dep in self.required_plugins.iter().chain(&self.optional_plugins) {
            if !deps.contains(&dep.as_str()) {
                deps.push(dep);
            }
        }
        deps
    }

    pub fn is_required(&self, dep: &str) -> bool {
        self.required_plugins.iter().any(|d| d == dep)
    }
}

#[derive(Debug, Clone)]
pub struct PluginDescriptorBuilder {
    inner: PluginDescriptor,
}

impl PluginDescriptorBuilder {
    fn new(id: impl Into<PluginName>) -> Self {
        let id = id.into();
        Self {
            inner: PluginDescriptor {
                config_path: vec![id.clone()],
                id,
                version: "0.0.0".into(),
                path: PathBuf::new(),
                required_plugins: Vec::new(),
                optional_plugins: Vec::new(),
                required_engine_components: BTreeMap::new(),
                server: true,
                ui: false,
                required_bundles: Vec::new(),
            },
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.inner.version = version.into();
        self
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner.path = path.into();
        self
    }

    pub fn config_path<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.config_path = path.into_iter().map(Into::into).collect();
        self
    }

    pub fn required<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PluginName>,
    {
        extend_unique(&mut self.inner.required_plugins, ids);
        self
    }

    pub fn optional<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PluginName>,
    {
        extend_unique(&mut self.inner.optional_plugins, ids);
        self
    }

    pub fn engine_component(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
        self.inner
            .required_engine_components
            .insert(name.into(), range.into());
        self
    }

    pub fn server(mut self, enabled: bool) -> Self {
        self.inner.server = enabled;
        self
    }

    pub fn ui(mut self, enabled: bool) -> Self {
        self.inner.ui = enabled;
        self
    }

    pub fn required_bundles<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PluginName>,
    {
        extend_unique(&mut self.inner.required_bundles, ids);
        self
    }

    pub fn build(self) -> PluginDescriptor {
        self.inner
    }
}

fn extend_unique<I, S>(target: &mut Vec<PluginName>, ids: I)
where
    I: IntoIterator<Item = S>,
    S: Into<PluginName>,
{
    for id in ids {
        let id = id.into();
        if !target.contains(&id) {
            target.push(id);
        }
    }
}
