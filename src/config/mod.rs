//! Configuration for the plugins system.
//!
//! ```rust,no_run
//! use plugin_system::config::PluginsConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PluginsConfig::load("config/plugins.json")
//!     .await?
//!     .with_env_overrides()?;
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Default budget for a single lifecycle hook.
pub const DEFAULT_LIFECYCLE_TIMEOUT_SECS: u64 = 30;

pub const ENV_PREFIX: &str = "PLUGINS_";

/// Errors that can occur in configuration operations
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// The key with invalid value
        key: String,
        /// Error message
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),

    /// Multiple validation errors
    #[error("{0}")]
    ValidationErrors(ValidationErrors),
}

#[derive(Debug)]
pub struct ValidationErrors(pub Vec<ConfigError>);

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation failed: ")?;
        let msgs: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", msgs.join("; "))
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// What happens to a hook that exceeded its time budget.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// The phase fails but the hook keeps running in the background.
    #[default]
    Abandon,
    /// The phase fails, the hook task is aborted and the plugin's
    /// cancellation token is triggered.
    Cancel,
}

impl FromStr for TimeoutPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abandon" => Ok(Self::Abandon),
            "cancel" => Ok(Self::Cancel),
            other => Err(ConfigError::InvalidValue {
                key: "timeoutPolicy".into(),
                message: format!("expected 'abandon' or 'cancel', got '{}'", other),
            }),
        }
    }
}

/// How engine component mismatches are treated during start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineCompatibilityPolicy {
    /// Log and record a warning; the plugin still starts.
    #[default]
    Advisory,
    /// Abort the start phase on the first mismatch.
    Strict,
}

impl FromStr for EngineCompatibilityPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advisory" => Ok(Self::Advisory),
            "strict" => Ok(Self::Strict),
            other => Err(ConfigError::InvalidValue {
                key: "engineCompatibility".into(),
                message: format!("expected 'advisory' or 'strict', got '{}'", other),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginsConfig {
    pub setup_timeout_secs: u64,
    pub start_timeout_secs: u64,
    pub stop_timeout_secs: u64,
    pub timeout_policy: TimeoutPolicy,
    pub engine_compatibility: EngineCompatibilityPolicy,
    /// Per-plugin configuration sections keyed by plugin id.
    pub plugins: HashMap<String, Value>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            setup_timeout_secs: DEFAULT_LIFECYCLE_TIMEOUT_SECS,
            start_timeout_secs: DEFAULT_LIFECYCLE_TIMEOUT_SECS,
            stop_timeout_secs: DEFAULT_LIFECYCLE_TIMEOUT_SECS,
            timeout_policy: TimeoutPolicy::default(),
            engine_compatibility: EngineCompatibilityPolicy::default(),
            plugins: HashMap::new(),
        }
    }
}

impl PluginsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a JSON config file. A missing file yields the defaults.
    pub async fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Applies `PLUGINS_*` environment variables on top of this config.
    pub fn with_env_overrides(self) -> ConfigResult<Self> {
        self.with_overrides(|key| match std::env::var(key) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(ConfigError::Env(e)),
        })
    }

    fn with_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> ConfigResult<Option<String>>,
    {
        let secs = |name: &str| -> ConfigResult<Option<u64>> {
            let key = format!("{}{}", ENV_PREFIX, name);
            match lookup(&key)? {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map(Some)
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                        key,
                        message: e.to_string(),
                    }),
                None => Ok(None),
            }
        };

        if let Some(v) = secs("SETUP_TIMEOUT_SECS")? {
            self.setup_timeout_secs = v;
        }
        if let Some(v) = secs("START_TIMEOUT_SECS")? {
            self.start_timeout_secs = v;
        }
        if let Some(v) = secs("STOP_TIMEOUT_SECS")? {
            self.stop_timeout_secs = v;
        }
        if let Some(raw) = lookup(&format!("{}TIMEOUT_POLICY", ENV_PREFIX))? {
            self.timeout_policy = raw.parse()?;
        }
        if let Some(raw) = lookup(&format!("{}ENGINE_COMPATIBILITY", ENV_PREFIX))? {
            self.engine_compatibility = raw.parse()?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();
        for (key, value) in [
            ("setupTimeoutSecs", self.setup_timeout_secs),
            ("startTimeoutSecs", self.start_timeout_secs),
            ("stopTimeoutSecs", self.stop_timeout_secs),
        ] {
            if value == 0 {
                errors.push(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "must be greater than zero".into(),
                });
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationErrors(ValidationErrors(errors)))
        }
    }

    pub fn setup_timeout(&self) -> Duration {
        Duration::from_secs(self.setup_timeout_secs)
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    /// Configuration section for `plugin`, `Null` when none is set.
    pub fn plugin_config(&self, plugin: &str) -> Value {
        self.plugins.get(plugin).cloned().unwrap_or(Value::Null)
    }

    pub fn timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout_policy = policy;
        self
    }

    pub fn engine_compatibility(mut self, policy: EngineCompatibilityPolicy) -> Self {
        self.engine_compatibility = policy;
        self
    }

    pub fn plugin(mut self, id: impl Into<String>, config: Value) -> Self {
        self.plugins.insert(id.into(), config);
        self
    }
}
