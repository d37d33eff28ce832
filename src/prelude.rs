//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```rust
//! use plugin_system::prelude::*;
//! ```

pub use crate::Error;
pub use crate::Result;

// Configuration
pub use crate::config::{EngineCompatibilityPolicy, PluginsConfig, TimeoutPolicy};

// Engine
pub use crate::engine::{ComponentCheck, EngineComponent, EngineInventory, StaticInventory};

// Plugins
pub use crate::plugins::{
    Contract, ContractMap, HookResult, InitializerRegistry, Plugin, PluginDescriptor,
    PluginInitializerContext, PluginSetupContext, PluginStartContext, PluginWrapper,
    PluginsSystem, SetupDeps, StartDeps,
};
