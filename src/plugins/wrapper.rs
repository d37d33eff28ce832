//! Runtime holder for one plugin instance.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::PluginError;
use super::contracts::{Contract, ContractMap};
use super::descriptor::{PluginDescriptor, PluginName};
use super::initializer::PluginInitializer;
use super::traits::{
    HookResult, LifecyclePhase, Plugin, PluginInitializerContext, PluginSetupContext,
    PluginStartContext,
};
use crate::config::{PluginsConfig, TimeoutPolicy};
use crate::engine::ComponentCheck;
use crate::observability::LifecycleSpan;

/// Identity token for a registered plugin, distinct from its declared id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OpaqueId(Uuid);

impl OpaqueId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OpaqueId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OpaqueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PluginState {
    Created,
    SetupCalled,
    SetupComplete,
    StartCalled,
    StartComplete,
    Stopped,
}

impl PluginState {
    /// True once `setup` has been entered and until the plugin is stopped.
    pub fn is_set_up(&self) -> bool {
        !matches!(self, Self::Created | Self::Stopped)
    }
}

/// Owns one plugin's descriptor, identity, instance and lifecycle state.
///
/// The instance is created from the initializer on first use and never
/// recreated. Each hook runs on its own task bounded by the configured
/// timeout for its phase.
pub struct PluginWrapper {
    descriptor: Arc<PluginDescriptor>,
    opaque_id: OpaqueId,
    initializer: Arc<dyn PluginInitializer>,
    config: Value,
    instance: Option<Arc<dyn Plugin>>,
    state: PluginState,
    cancellation: CancellationToken,
}

impl PluginWrapper {
    pub fn new(descriptor: PluginDescriptor, initializer: Arc<dyn PluginInitializer>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            opaque_id: OpaqueId::new(),
            initializer,
            config: Value::Null,
            instance: None,
            state: PluginState::Created,
            cancellation: CancellationToken::new(),
        }
    }

    /// Wraps an already constructed plugin; instantiation cannot fail.
    pub fn from_plugin<P: Plugin + 'static>(descriptor: PluginDescriptor, plugin: P) -> Self {
        let plugin: Arc<dyn Plugin> = Arc::new(plugin);
        let initializer = move |_ctx: PluginInitializerContext| -> HookResult<Arc<dyn Plugin>> {
            Ok(Arc::clone(&plugin))
        };
        Self::new(descriptor, Arc::new(initializer))
    }

    pub fn name(&self) -> &str {
        self.descriptor.id()
    }

    pub fn opaque_id(&self) -> OpaqueId {
        self.opaque_id
    }

    pub fn descriptor(&self) -> &Arc<PluginDescriptor> {
        &self.descriptor
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    pub fn includes_server_plugin(&self) -> bool {
        self.descriptor.server_enabled()
    }

    pub fn includes_ui_plugin(&self) -> bool {
        self.descriptor.ui_enabled()
    }

    pub fn required_plugins(&self) -> &[PluginName] {
        self.descriptor.required_plugins()
    }

    pub fn optional_plugins(&self) -> &[PluginName] {
        self.descriptor.optional_plugins()
    }

    pub fn is_instantiated(&self) -> bool {
        self.instance.is_some()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub(crate) fn set_config(&mut self, config: Value) {
        self.config = config;
    }

    /// Returns the plugin instance, creating it on first call.
    pub fn instance(&mut self) -> Result<Arc<dyn Plugin>, PluginError> {
        if let Some(instance) = &self.instance {
            return Ok(Arc::clone(instance));
        }
        let ctx = PluginInitializerContext {
            opaque_id: self.opaque_id,
            descriptor: Arc::clone(&self.descriptor),
            config: self.config.clone(),
        };
        let instance = self
            .initializer
            .initialize(ctx)
            .map_err(|e| PluginError::Instantiation {
                plugin: self.name().to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!(plugin = self.name(), "Plugin instantiated");
        self.instance = Some(Arc::clone(&instance));
        Ok(instance)
    }

    pub async fn setup(
        &mut self,
        core: Contract,
        deps: ContractMap,
        config: &PluginsConfig,
    ) -> Result<Contract, PluginError> {
        if self.state != PluginState::Created {
            return Err(self.invalid("has already been set up"));
        }
        let instance = self.instance()?;
        self.state = PluginState::SetupCalled;

        let ctx = PluginSetupContext {
            plugin: self.name().to_string(),
            opaque_id: self.opaque_id,
            core,
            cancellation: self.cancellation.clone(),
        };
        let contract = self
            .run_hook(
                LifecyclePhase::Setup,
                config.setup_timeout(),
                config.timeout_policy,
                async move { instance.setup(ctx, deps).await },
            )
            .await?;

        self.state = PluginState::SetupComplete;
        Ok(contract)
    }

    pub async fn start(
        &mut self,
        core: Contract,
        engine_checks: Vec<ComponentCheck>,
        deps: ContractMap,
        config: &PluginsConfig,
    ) -> Result<Contract, PluginError> {
        match self.state {
            PluginState::SetupComplete => {}
            PluginState::StartCalled | PluginState::StartComplete => {
                return Err(self.invalid("has already been started"));
            }
            _ => return Err(self.invalid("can't be started since it isn't set up")),
        }
        let instance = self.instance()?;
        self.state = PluginState::StartCalled;

        let ctx = PluginStartContext {
            plugin: self.name().to_string(),
            opaque_id: self.opaque_id,
            core,
            engine_checks,
            cancellation: self.cancellation.clone(),
        };
        let contract = self
            .run_hook(
                LifecyclePhase::Start,
                config.start_timeout(),
                config.timeout_policy,
                async move { instance.start(ctx, deps).await },
            )
            .await?;

        self.state = PluginState::StartComplete;
        Ok(contract)
    }

    /// Stops the plugin. Stopping an already stopped plugin is a no-op.
    ///
    /// The plugin counts as stopped afterwards even when its hook fails or
    /// times out, and its cancellation token is triggered either way.
    pub async fn stop(&mut self, config: &PluginsConfig) -> Result<(), PluginError> {
        match self.state {
            PluginState::Stopped => return Ok(()),
            PluginState::Created => {
                return Err(self.invalid("can't be stopped since it isn't set up"));
            }
            _ => {}
        }
        let instance = self.instance()?;
        self.state = PluginState::Stopped;

        let result = self
            .run_hook(
                LifecyclePhase::Stop,
                config.stop_timeout(),
                config.timeout_policy,
                async move { instance.stop().await },
            )
            .await;
        self.cancellation.cancel();
        result
    }

    async fn run_hook<T, F>(
        &self,
        phase: LifecyclePhase,
        limit: Duration,
        policy: TimeoutPolicy,
        hook: F,
    ) -> Result<T, PluginError>
    where
        T: Send + 'static,
        F: Future<Output = HookResult<T>> + Send + 'static,
    {
        let span = LifecycleSpan::new(phase, self.name(), self.opaque_id);
        let handle = tokio::spawn(hook.instrument(span.span().clone()));
        let abort = handle.abort_handle();

        match tokio::time::timeout(limit, handle).await {
            Ok(Ok(Ok(value))) => {
                span.finish("ok");
                Ok(value)
            }
            Ok(Ok(Err(e))) => {
                span.finish("error");
                Err(PluginError::HookFailed {
                    plugin: self.name().to_string(),
                    phase,
                    reason: e.to_string(),
                })
            }
            Ok(Err(join_err)) => {
                span.finish("panicked");
                if join_err.is_panic() {
                    Err(PluginError::HookPanicked {
                        plugin: self.name().to_string(),
                        phase,
                    })
                } else {
                    Err(PluginError::HookFailed {
                        plugin: self.name().to_string(),
                        phase,
                        reason: join_err.to_string(),
                    })
                }
            }
            Err(_) => {
                span.finish("timeout");
                if policy == TimeoutPolicy::Cancel {
                    abort.abort();
                    self.cancellation.cancel();
                }
                Err(PluginError::Timeout {
                    plugin: self.name().to_string(),
                    phase,
                    duration: limit,
                })
            }
        }
    }

    fn invalid(&self, reason: &str) -> PluginError {
        PluginError::InvalidLifecycle {
            plugin: self.name().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Debug for PluginWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginWrapper")
            .field("name", &self.name())
            .field("opaque_id", &self.opaque_id)
            .field("state", &self.state)
            .field("instantiated", &self.instance.is_some())
            .finish()
    }
}
