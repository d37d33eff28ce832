//! External engine inventory and component compatibility checks.
//!
//! Plugins may declare engine components they need together with an
//! npm-style semver range. During the start phase the live inventory is
//! queried and every declaration is checked with [`check_compatibility`].
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use plugin_system::engine::{EngineComponent, check_compatibility};
//!
//! let installed = vec![EngineComponent::new("node-1", "opensearch-alerting", "2.1.0.0")];
//! let required = BTreeMap::from([("opensearch-alerting".to_string(), "^2.0.0".to_string())]);
//!
//! let checks = check_compatibility(&required, &installed);
//! assert!(checks[0].is_satisfied());
//! ```

mod compat;
mod inventory;
mod range;

pub use compat::{CheckStatus, ComponentCheck, check_compatibility, unknown_compatibility};
pub use inventory::{EngineComponent, EngineInventory, StaticInventory};
pub use range::{VersionRange, coerce_version};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine inventory query failed: {0}")]
    Query(String),

    #[error("Invalid version range '{range}': {reason}")]
    InvalidRange { range: String, reason: String },

    #[error("Invalid engine inventory payload: {0}")]
    Payload(#[from] serde_json::Error),
}
