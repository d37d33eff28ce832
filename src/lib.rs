//! # plugin-system
//!
//! Plugin kernel for a host process: registers plugins, resolves their
//! dependency graph into a deterministic order, runs each plugin's lifecycle
//! hooks under a time budget, and checks declared engine component
//! requirements against a live inventory.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use plugin_system::prelude::*;
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl Plugin for Greeter {
//!     async fn setup(&self, _ctx: PluginSetupContext, _deps: ContractMap) -> HookResult<Contract> {
//!         Ok(Contract::new(String::from("hello")))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), plugin_system::Error> {
//!     let mut system = PluginsSystem::new(PluginsConfig::default());
//!     system.add_plugin(PluginWrapper::from_plugin(
//!         PluginDescriptor::builder("greeter").build(),
//!         Greeter,
//!     ))?;
//!
//!     let setup = system.setup_plugins(SetupDeps::default()).await?;
//!     println!("{:?}", setup.contract::<String>("greeter"));
//!
//!     system
//!         .start_plugins(StartDeps::new(Contract::empty(), Arc::new(StaticInventory::empty())))
//!         .await?;
//!     system.stop_plugins().await;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod engine;
pub mod observability;
pub mod plugins;
pub mod prelude;

pub use config::{
    ConfigError, EngineCompatibilityPolicy, PluginsConfig, TimeoutPolicy,
    DEFAULT_LIFECYCLE_TIMEOUT_SECS,
};
pub use engine::{
    CheckStatus, ComponentCheck, EngineComponent, EngineError, EngineInventory, StaticInventory,
    VersionRange, check_compatibility,
};
pub use plugins::{
    CompatibilityWarning, Contract, ContractMap, InitializerRegistry, LifecyclePhase, OpaqueId,
    Plugin, PluginDescriptor, PluginDiscovery, PluginError, PluginManifest, PluginState,
    PluginWrapper, PluginsSystem, SetupDeps, StartDeps, SystemState, UiPlugin,
};

/// Error type for plugin-system operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Registration, resolution or lifecycle failure.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// Engine inventory could not be read.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// File system operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Required environment variable missing or invalid.
    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Cyclic or missing plugin dependencies
    Resolution,
    /// A hook failed, panicked or timed out, or a phase was misused
    Lifecycle,
    /// Manifest, discovery or instantiation failures
    Registration,
    /// Invalid configuration values or sources
    Configuration,
    /// Engine component requirements or inventory queries
    Engine,
    /// File system errors
    Io,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Plugin(err) => match err {
                PluginError::UnresolvedDependencies { .. } => ErrorCategory::Resolution,

                PluginError::Timeout { .. }
                | PluginError::HookFailed { .. }
                | PluginError::HookPanicked { .. }
                | PluginError::InvalidLifecycle { .. }
                | PluginError::InvalidState { .. } => ErrorCategory::Lifecycle,

                PluginError::Instantiation { .. }
                | PluginError::MissingInitializer { .. }
                | PluginError::DuplicatePlugin { .. }
                | PluginError::ManifestNotFound { .. }
                | PluginError::InvalidManifest { .. }
                | PluginError::DuplicateManifest { .. } => ErrorCategory::Registration,

                PluginError::EngineIncompatible { .. } | PluginError::EngineUnavailable { .. } => {
                    ErrorCategory::Engine
                }

                PluginError::Io(_) => ErrorCategory::Io,
            },
            Error::Engine(_) => ErrorCategory::Engine,
            Error::Config(_) | Error::Json(_) | Error::Env(_) => ErrorCategory::Configuration,
            Error::Io(_) => ErrorCategory::Io,
        }
    }

    /// Id of the plugin the error is attributed to, if any.
    pub fn plugin(&self) -> Option<&str> {
        match self {
            Error::Plugin(err) => err.plugin(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Plugin(err) if err.is_timeout())
    }

    pub fn is_resolution_error(&self) -> bool {
        self.category() == ErrorCategory::Resolution
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidValue { key, message } => {
                Error::Config(format!("Invalid value for {}: {}", key, message))
            }
            ConfigError::Serialization(e) => Error::Json(e),
            ConfigError::Io(e) => Error::Io(e),
            ConfigError::Env(e) => Error::Env(e),
            ConfigError::ValidationErrors(errors) => Error::Config(errors.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_display_is_transparent() {
        let err: Error = PluginError::DuplicatePlugin {
            plugin: "home".into(),
        }
        .into();
        assert_eq!(err.to_string(), r#"Plugin with id "home" is already registered"#);
        assert_eq!(err.plugin(), Some("home"));
    }

    #[test]
    fn test_error_category() {
        let unresolved: Error = PluginError::UnresolvedDependencies {
            plugins: vec!["a".into()],
            diagnostics: Vec::new(),
        }
        .into();
        assert!(unresolved.is_resolution_error());

        let timeout: Error = PluginError::Timeout {
            plugin: "slow".into(),
            phase: LifecyclePhase::Start,
            duration: Duration::from_secs(30),
        }
        .into();
        assert_eq!(timeout.category(), ErrorCategory::Lifecycle);
        assert!(timeout.is_timeout());

        let instantiation: Error = PluginError::Instantiation {
            plugin: "broken".into(),
            reason: "boom".into(),
        }
        .into();
        assert_eq!(instantiation.category(), ErrorCategory::Registration);

        let engine: Error = EngineError::Query("down".into()).into();
        assert_eq!(engine.category(), ErrorCategory::Engine);
    }

    #[test]
    fn test_config_error_conversion() {
        let config_err = ConfigError::InvalidValue {
            key: "setupTimeoutSecs".to_string(),
            message: "must be greater than zero".to_string(),
        };
        let err: Error = config_err.into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.is_configuration_error());
    }
}
