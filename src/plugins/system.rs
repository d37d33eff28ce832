//! Orchestrator driving every registered plugin through its lifecycle.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use super::PluginError;
use super::contracts::{Contract, ContractMap, PluginMap};
use super::descriptor::PluginName;
use super::discovery::PluginDiscovery;
use super::graph::{DependencyGraph, GraphNode, PluginDependencies};
use super::initializer::InitializerRegistry;
use super::wrapper::PluginWrapper;
use crate::config::{EngineCompatibilityPolicy, PluginsConfig};
use crate::engine::{
    CheckStatus, ComponentCheck, EngineInventory, VersionRange, check_compatibility,
    unknown_compatibility,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SystemState {
    Created,
    PluginsAdded,
    SetupInProgress,
    SetupComplete,
    StartInProgress,
    StartComplete,
    StopInProgress,
    Stopped,
}

impl SystemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::PluginsAdded => "accepting plugins",
            Self::SetupInProgress => "setting up",
            Self::SetupComplete => "set up",
            Self::StartInProgress => "starting",
            Self::StartComplete => "started",
            Self::StopInProgress => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for SystemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host collaborators for the setup phase.
#[derive(Clone, Debug, Default)]
pub struct SetupDeps {
    pub core: Contract,
}

/// Host collaborators for the start phase.
#[derive(Clone)]
pub struct StartDeps {
    pub core: Contract,
    pub engine: Arc<dyn EngineInventory>,
}

impl StartDeps {
    pub fn new(core: Contract, engine: Arc<dyn EngineInventory>) -> Self {
        Self { core, engine }
    }
}

/// Engine requirement that was not met while starting under the advisory policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompatibilityWarning {
    pub plugin: PluginName,
    pub component: String,
    pub range: String,
    pub detail: String,
}

impl std::fmt::Display for CompatibilityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Plugin \"{}\" requires engine component \"{}\" ({}) which is {}",
            self.plugin, self.component, self.range, self.detail
        )
    }
}

/// What the UI layer needs to know about a ui-enabled plugin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiPlugin {
    pub id: PluginName,
    pub version: String,
    /// Only dependencies that are ui-enabled themselves.
    pub required_plugins: Vec<PluginName>,
    pub optional_plugins: Vec<PluginName>,
    pub required_bundles: Vec<PluginName>,
    pub config_path: Vec<String>,
}

/// Owns the registered plugins and runs their setup, start and stop hooks
/// in dependency order.
///
/// Hooks run one at a time; a plugin sees the contracts of the dependencies
/// that finished the same phase before it.
pub struct PluginsSystem {
    config: PluginsConfig,
    plugins: Vec<PluginWrapper>,
    index: HashMap<PluginName, usize>,
    state: SystemState,
    /// Plugins whose setup completed, in the order it ran.
    satup: Vec<usize>,
    warnings: Vec<CompatibilityWarning>,
}

impl PluginsSystem {
    pub fn new(config: PluginsConfig) -> Self {
        Self {
            config,
            plugins: Vec::new(),
            index: HashMap::new(),
            state: SystemState::Created,
            satup: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Validates `config`, discovers manifests under `dirs` and registers
    /// each plugin with its initializer.
    pub async fn load_from_dirs(
        config: PluginsConfig,
        dirs: &[PathBuf],
        host_version: &str,
        initializers: &InitializerRegistry,
    ) -> crate::Result<Self> {
        config.validate()?;
        let descriptors = PluginDiscovery::new(host_version).discover(dirs).await?;
        let mut system = Self::new(config);
        for descriptor in descriptors {
            system.add_plugin(initializers.wrap(descriptor)?)?;
        }
        Ok(system)
    }

    pub fn add_plugin(&mut self, mut plugin: PluginWrapper) -> Result<(), PluginError> {
        self.ensure_state("add plugins", &[SystemState::Created, SystemState::PluginsAdded])?;
        if self.index.contains_key(plugin.name()) {
            return Err(PluginError::DuplicatePlugin {
                plugin: plugin.name().to_string(),
            });
        }
        plugin.set_config(self.config.plugin_config(plugin.name()));
        tracing::debug!(plugin = plugin.name(), opaque_id = %plugin.opaque_id(), "Plugin added");
        self.index.insert(plugin.name().to_string(), self.plugins.len());
        self.plugins.push(plugin);
        self.state = SystemState::PluginsAdded;
        Ok(())
    }

    pub fn state(&self) -> SystemState {
        self.state
    }

    pub fn config(&self) -> &PluginsConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn contains(&self, plugin: &str) -> bool {
        self.index.contains_key(plugin)
    }

    pub fn get(&self, plugin: &str) -> Option<&PluginWrapper> {
        self.index.get(plugin).map(|&i| &self.plugins[i])
    }

    /// Registered plugins in registration order.
    pub fn plugins(&self) -> impl Iterator<Item = &PluginWrapper> {
        self.plugins.iter()
    }

    /// Ids of plugins whose setup completed, in setup order.
    pub fn set_up_plugins(&self) -> Vec<&str> {
        self.satup.iter().map(|&i| self.plugins[i].name()).collect()
    }

    pub fn compatibility_warnings(&self) -> &[CompatibilityWarning] {
        &self.warnings
    }

    /// Present dependencies of every registered plugin, in registration order.
    pub fn plugin_dependencies(&self) -> PluginDependencies {
        DependencyGraph::new(self.plugins.iter().map(GraphNode::from)).dependencies()
    }

    pub async fn setup_plugins(&mut self, deps: SetupDeps) -> Result<ContractMap, PluginError> {
        self.ensure_state("set up plugins", &[SystemState::Created, SystemState::PluginsAdded])?;
        self.state = SystemState::SetupInProgress;

        let server: Vec<usize> = (0..self.plugins.len())
            .filter(|&i| self.plugins[i].includes_server_plugin())
            .collect();
        let order = self.resolve(&server)?;

        let mut contracts = ContractMap::new();
        if !order.is_empty() {
            tracing::info!(
                "Setting up [{}] plugins: [{}]",
                order.len(),
                self.join_names(&order)
            );
        }

        for i in order {
            self.warn_invalid_ranges(i);
            let plugin_deps = self.dependency_contracts(i, &contracts);
            let name = self.plugins[i].name().to_string();
            tracing::debug!("Setting up plugin \"{}\"", name);

            let contract = self.plugins[i]
                .setup(deps.core.clone(), plugin_deps, &self.config)
                .await?;
            self.satup.push(i);
            contracts.insert(name, contract);
        }

        self.state = SystemState::SetupComplete;
        Ok(contracts)
    }

    pub async fn start_plugins(&mut self, deps: StartDeps) -> Result<ContractMap, PluginError> {
        self.ensure_state("start plugins", &[SystemState::SetupComplete])?;
        self.state = SystemState::StartInProgress;

        let mut set_up = self.satup.clone();
        set_up.sort_unstable();
        let order = self.resolve(&set_up)?;

        let mut contracts = ContractMap::new();
        if !order.is_empty() {
            tracing::info!(
                "Starting [{}] plugins: [{}]",
                order.len(),
                self.join_names(&order)
            );
        }

        for i in order {
            let engine_checks = self.check_engine(i, deps.engine.as_ref()).await?;
            let plugin_deps = self.dependency_contracts(i, &contracts);
            let name = self.plugins[i].name().to_string();
            tracing::debug!("Starting plugin \"{}\"", name);

            let contract = self.plugins[i]
                .start(deps.core.clone(), engine_checks, plugin_deps, &self.config)
                .await?;
            contracts.insert(name, contract);
        }

        self.state = SystemState::StartComplete;
        Ok(contracts)
    }

    /// Stops every set-up plugin in reverse setup order.
    ///
    /// Failures are logged and do not prevent the remaining plugins from
    /// stopping. Calling this again after it completed does nothing.
    pub async fn stop_plugins(&mut self) {
        if self.state == SystemState::Stopped {
            return;
        }
        self.state = SystemState::StopInProgress;
        tracing::info!("Stopping all plugins.");

        while let Some(i) = self.satup.pop() {
            let plugin = &mut self.plugins[i];
            tracing::debug!("Stopping plugin \"{}\"", plugin.name());
            if let Err(e) = plugin.stop(&self.config).await {
                tracing::warn!(plugin = plugin.name(), error = %e, "Failed to stop plugin");
            }
        }

        self.state = SystemState::Stopped;
    }

    /// Ui-enabled plugins in dependency order, with their dependency lists
    /// narrowed to other ui-enabled plugins.
    ///
    /// Ordering is resolved over every registered plugin, so any unresolved
    /// dependency fails the call.
    pub fn ui_plugins(&self) -> Result<PluginMap<UiPlugin>, PluginError> {
        let all: Vec<usize> = (0..self.plugins.len()).collect();
        let order = self.resolve(&all)?;

        let ui_enabled = |id: &PluginName| self.get(id).is_some_and(PluginWrapper::includes_ui_plugin);
        let narrow = |ids: &[PluginName]| -> Vec<PluginName> {
            ids.iter().filter(|id| ui_enabled(*id)).cloned().collect()
        };

        Ok(order
            .into_iter()
            .map(|i| &self.plugins[i])
            .filter(|p| p.includes_ui_plugin())
            .map(|p| {
                let descriptor = p.descriptor();
                (
                    descriptor.id().to_string(),
                    UiPlugin {
                        id: descriptor.id().to_string(),
                        version: descriptor.version().to_string(),
                        required_plugins: narrow(descriptor.required_plugins()),
                        optional_plugins: narrow(descriptor.optional_plugins()),
                        required_bundles: descriptor.required_bundles().to_vec(),
                        config_path: descriptor.config_path().to_vec(),
                    },
                )
            })
            .collect())
    }

    /// Resolves `subset` (indices into `plugins`, ascending) into dependency order.
    fn resolve(&self, subset: &[usize]) -> Result<Vec<usize>, PluginError> {
        let graph = DependencyGraph::new(subset.iter().map(|&i| GraphNode::from(&self.plugins[i])));
        Ok(graph
            .topological_order()?
            .into_iter()
            .map(|k| subset[k])
            .collect())
    }

    fn dependency_contracts(&self, i: usize, produced: &ContractMap) -> ContractMap {
        self.plugins[i]
            .descriptor()
            .all_dependencies()
            .into_iter()
            .filter_map(|dep| produced.get(dep).map(|c| (dep.to_string(), c.clone())))
            .collect()
    }

    fn warn_invalid_ranges(&self, i: usize) {
        let plugin = &self.plugins[i];
        for (component, range) in plugin.descriptor().required_engine_components() {
            if let Err(e) = VersionRange::parse(range) {
                tracing::warn!(
                    plugin = plugin.name(),
                    component = component.as_str(),
                    error = %e,
                    "Ignoring invalid engine component range"
                );
            }
        }
    }

    async fn check_engine(
        &mut self,
        i: usize,
        engine: &dyn EngineInventory,
    ) -> Result<Vec<ComponentCheck>, PluginError> {
        let plugin = self.plugins[i].name().to_string();
        let required = self.plugins[i].descriptor().required_engine_components().clone();
        if required.is_empty() {
            return Ok(Vec::new());
        }
        let strict = self.config.engine_compatibility == EngineCompatibilityPolicy::Strict;

        let installed = match engine.installed_components().await {
            Ok(installed) => installed,
            Err(e) if strict => {
                return Err(PluginError::EngineUnavailable {
                    plugin,
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                tracing::warn!(plugin = %plugin, error = %e, "Failed to query engine components");
                let checks = unknown_compatibility(&required, &e.to_string());
                for check in &checks {
                    self.warnings.push(CompatibilityWarning {
                        plugin: plugin.clone(),
                        component: check.component.clone(),
                        range: check.range.clone(),
                        detail: check.describe(),
                    });
                }
                return Ok(checks);
            }
        };

        let checks = check_compatibility(&required, &installed);
        for check in checks.iter() {
            if let CheckStatus::Satisfied { missing_nodes, .. } = &check.status {
                if !missing_nodes.is_empty() {
                    tracing::debug!(
                        plugin = %plugin,
                        component = %check.component,
                        nodes = ?missing_nodes,
                        "Engine component missing on some nodes"
                    );
                }
                continue;
            }
            if strict {
                return Err(PluginError::EngineIncompatible {
                    plugin,
                    component: check.component.clone(),
                    range: check.range.clone(),
                    found: check.describe(),
                });
            }
            let warning = CompatibilityWarning {
                plugin: plugin.clone(),
                component: check.component.clone(),
                range: check.range.clone(),
                detail: check.describe(),
            };
            tracing::warn!("{}", warning);
            self.warnings.push(warning);
        }
        Ok(checks)
    }

    fn join_names(&self, order: &[usize]) -> String {
        order
            .iter()
            .map(|&i| self.plugins[i].name())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn ensure_state(
        &self,
        operation: &'static str,
        allowed: &[SystemState],
    ) -> Result<(), PluginError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(PluginError::InvalidState {
                operation,
                state: self.state.to_string(),
            })
        }
    }
}

impl std::fmt::Debug for PluginsSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginsSystem")
            .field("state", &self.state)
            .field("plugins", &self.plugins)
            .finish()
    }
}
