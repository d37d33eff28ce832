//! Entry points that construct plugin instances.

use std::collections::HashMap;
use std::sync::Arc;

use super::PluginError;
use super::descriptor::{PluginDescriptor, PluginName};
use super::traits::{HookResult, Plugin, PluginInitializerContext};
use super::wrapper::PluginWrapper;

/// Builds the runtime instance of one plugin.
///
/// Implemented for any `Fn(PluginInitializerContext) -> HookResult<Arc<dyn Plugin>>`.
pub trait PluginInitializer: Send + Sync {
    fn initialize(&self, ctx: PluginInitializerContext) -> HookResult<Arc<dyn Plugin>>;
}

impl<F> PluginInitializer for F
where
    F: Fn(PluginInitializerContext) -> HookResult<Arc<dyn Plugin>> + Send + Sync,
{
    fn initialize(&self, ctx: PluginInitializerContext) -> HookResult<Arc<dyn Plugin>> {
        self(ctx)
    }
}

/// Initializers keyed by plugin id, used to turn discovered descriptors
/// into wrappers.
#[derive(Clone, Default)]
pub struct InitializerRegistry {
    initializers: HashMap<PluginName, Arc<dyn PluginInitializer>>,
}

impl InitializerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<I>(&mut self, plugin: impl Into<PluginName>, initializer: I) -> &mut Self
    where
        I: PluginInitializer + 'static,
    {
        self.initializers
            .insert(plugin.into(), Arc::new(initializer));
        self
    }

    pub fn contains(&self, plugin: &str) -> bool {
        self.initializers.contains_key(plugin)
    }

    pub fn len(&self) -> usize {
        self.initializers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.initializers.is_empty()
    }

    /// Pairs `descriptor` with its initializer.
    pub fn wrap(&self, descriptor: PluginDescriptor) -> Result<PluginWrapper, PluginError> {
        let initializer = self
            .initializers
            .get(descriptor.id())
            .cloned()
            .ok_or_else(|| PluginError::MissingInitializer {
                plugin: descriptor.id().to_string(),
            })?;
        Ok(PluginWrapper::new(descriptor, initializer))
    }

    /// Wraps every descriptor, failing on the first one without an initializer.
    pub fn wrap_all(
        &self,
        descriptors: impl IntoIterator<Item = PluginDescriptor>,
    ) -> Result<Vec<PluginWrapper>, PluginError> {
        descriptors.into_iter().map(|d| self.wrap(d)).collect()
    }
}

impl std::fmt::Debug for InitializerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.initializers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("InitializerRegistry")
            .field("plugins", &names)
            .finish()
    }
}
