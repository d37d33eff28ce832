use std::path::PathBuf;
use std::time::Duration;

use super::descriptor::PluginName;
use super::traits::LifecyclePhase;

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error(
        "Topological ordering of plugins did not complete, these plugins have cyclic or missing dependencies: {}",
        format_names(plugins)
    )]
    UnresolvedDependencies {
        plugins: Vec<PluginName>,
        diagnostics: Vec<String>,
    },

    #[error(
        "{} lifecycle of \"{plugin}\" plugin wasn't completed in {}sec. Consider disabling the plugin and re-start.",
        phase.title(),
        duration.as_secs()
    )]
    Timeout {
        plugin: PluginName,
        phase: LifecyclePhase,
        duration: Duration,
    },

    #[error("{} lifecycle of \"{plugin}\" plugin failed: {reason}", phase.title())]
    HookFailed {
        plugin: PluginName,
        phase: LifecyclePhase,
        reason: String,
    },

    #[error("{} lifecycle of \"{plugin}\" plugin panicked", phase.title())]
    HookPanicked {
        plugin: PluginName,
        phase: LifecyclePhase,
    },

    #[error("Failed to instantiate plugin \"{plugin}\": {reason}")]
    Instantiation { plugin: PluginName, reason: String },

    #[error("Plugin \"{plugin}\" does not have a registered initializer")]
    MissingInitializer { plugin: PluginName },

    #[error("Plugin with id \"{plugin}\" is already registered")]
    DuplicatePlugin { plugin: PluginName },

    #[error("Plugin \"{plugin}\" {reason}")]
    InvalidLifecycle { plugin: PluginName, reason: String },

    #[error("Cannot {operation} while plugins system is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error(
        "Plugin \"{plugin}\" requires engine component \"{component}\" ({range}) which is {found}"
    )]
    EngineIncompatible {
        plugin: PluginName,
        component: String,
        range: String,
        found: String,
    },

    #[error("Failed to query engine components for plugin \"{plugin}\": {reason}")]
    EngineUnavailable { plugin: PluginName, reason: String },

    #[error("Plugin manifest not found: {path}")]
    ManifestNotFound { path: PathBuf },

    #[error("Invalid plugin manifest at {path}: {reason}")]
    InvalidManifest { path: PathBuf, reason: String },

    #[error("Duplicate plugin id '{plugin}': first at {first}, second at {second}")]
    DuplicateManifest {
        plugin: PluginName,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PluginError {
    /// Id of the plugin the error is attributed to, when there is exactly one.
    pub fn plugin(&self) -> Option<&str> {
        match self {
            Self::Timeout { plugin, .. }
            | Self::HookFailed { plugin, .. }
            | Self::HookPanicked { plugin, .. }
            | Self::Instantiation { plugin, .. }
            | Self::MissingInitializer { plugin }
            | Self::DuplicatePlugin { plugin }
            | Self::InvalidLifecycle { plugin, .. }
            | Self::EngineIncompatible { plugin, .. }
            | Self::EngineUnavailable { plugin, .. }
            | Self::DuplicateManifest { plugin, .. } => Some(plugin),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

fn format_names(names: &[PluginName]) -> String {
    let quoted: Vec<String> = names.iter().map(|n| format!("{:?}", n)).collect();
    format!("[{}]", quoted.join(","))
}
