//! Plugin registration, dependency resolution and lifecycle orchestration.
//!
//! A plugin is a directory with a `plugin.json` manifest plus an initializer
//! registered under the same id. The [`PluginsSystem`] owns every registered
//! plugin and drives them through `setup`, `start` and `stop` in dependency
//! order.
//!
//! # Directory Structure
//!
//! ```text
//! plugins/
//! ├── data/
//! │   └── plugin.json
//! └── alerting/
//!     └── plugin.json
//! ```
//!
//! # Manifest
//!
//! ```json
//! {
//!   "id": "alerting",
//!   "version": "2.9.0",
//!   "requiredPlugins": ["data"],
//!   "optionalPlugins": ["home"],
//!   "requiredEnginePlugins": { "engine-alerting": "^2.9.0" },
//!   "server": true,
//!   "ui": true
//! }
//! ```

mod contracts;
mod descriptor;
mod discovery;
mod error;
mod graph;
mod initializer;
mod manifest;
mod system;
mod traits;
mod wrapper;

pub use contracts::{Contract, ContractMap, OrderedMap, PluginMap};
pub use descriptor::{PluginDescriptor, PluginDescriptorBuilder, PluginName};
pub use discovery::PluginDiscovery;
pub use error::PluginError;
pub use graph::{DependencyGraph, GraphNode, PluginDependencies};
pub use initializer::{InitializerRegistry, PluginInitializer};
pub use manifest::{ANY_HOST_VERSION, ConfigPath, PluginManifest, is_host_version_compatible};
pub use system::{
    CompatibilityWarning, PluginsSystem, SetupDeps, StartDeps, SystemState, UiPlugin,
};
pub use traits::{
    BoxError, HookResult, LifecyclePhase, Plugin, PluginInitializerContext, PluginSetupContext,
    PluginStartContext,
};
pub use wrapper::{OpaqueId, PluginState, PluginWrapper};
