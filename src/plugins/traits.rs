//! Plugin trait and the contexts handed to lifecycle hooks.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::contracts::{Contract, ContractMap};
use super::descriptor::{PluginDescriptor, PluginName};
use super::wrapper::OpaqueId;
use crate::engine::ComponentCheck;

/// Error type plugin code may return from any hook.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type HookResult<T> = std::result::Result<T, BoxError>;

/// Lifecycle step a hook belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    Setup,
    Start,
    Stop,
}

impl LifecyclePhase {
    /// Capitalized name used in operator-facing messages.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Setup => "Setup",
            Self::Start => "Start",
            Self::Stop => "Stop",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Passed to a plugin's initializer when its instance is created.
#[derive(Clone, Debug)]
pub struct PluginInitializerContext {
    pub opaque_id: OpaqueId,
    pub descriptor: Arc<PluginDescriptor>,
    /// This plugin's section of the host configuration, `Null` when absent.
    pub config: Value,
}

/// Passed to [`Plugin::setup`].
#[derive(Clone, Debug)]
pub struct PluginSetupContext {
    pub plugin: PluginName,
    pub opaque_id: OpaqueId,
    /// Host-provided core setup APIs.
    pub core: Contract,
    /// Cancelled when the plugin is stopped, or when a hook times out under
    /// the `cancel` timeout policy.
    pub cancellation: CancellationToken,
}

/// Passed to [`Plugin::start`].
#[derive(Clone, Debug)]
pub struct PluginStartContext {
    pub plugin: PluginName,
    pub opaque_id: OpaqueId,
    /// Host-provided core start APIs.
    pub core: Contract,
    /// Result of checking this plugin's required engine components against
    /// the live engine inventory.
    pub engine_checks: Vec<ComponentCheck>,
    pub cancellation: CancellationToken,
}

impl PluginStartContext {
    pub fn engine_compatible(&self) -> bool {
        self.engine_checks.iter().all(ComponentCheck::is_satisfied)
    }
}

/// A unit of functionality driven through setup, start and stop.
///
/// `deps` holds the contracts of the dependencies this plugin declared and
/// that are present in the current phase, keyed by plugin id. Hooks run on
/// their own task and must not assume they are cancelled when the host gives
/// up on them.
///
/// ```rust,ignore
/// struct Search;
///
/// #[async_trait]
/// impl Plugin for Search {
///     async fn setup(&self, _ctx: PluginSetupContext, _deps: ContractMap) -> HookResult<Contract> {
///         Ok(Contract::new(SearchSetup::default()))
///     }
/// }
/// ```
#[async_trait]
pub trait Plugin: Send + Sync {
    async fn setup(&self, ctx: PluginSetupContext, deps: ContractMap) -> HookResult<Contract>;

    async fn start(&self, _ctx: PluginStartContext, _deps: ContractMap) -> HookResult<Contract> {
        Ok(Contract::empty())
    }

    async fn stop(&self) -> HookResult<()> {
        Ok(())
    }
}
