use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::EngineError;

/// One installed component on one engine node.
///
/// Deserializes from the engine's `_cat/plugins?format=json` rows, where the
/// node name is reported as `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineComponent {
    #[serde(rename = "name")]
    pub node: String,
    pub component: String,
    pub version: String,
}

impl EngineComponent {
    pub fn new(
        node: impl Into<String>,
        component: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            node: node.into(),
            component: component.into(),
            version: version.into(),
        }
    }
}

/// Live view of the components installed on the external engine.
#[async_trait]
pub trait EngineInventory: Send + Sync {
    async fn installed_components(&self) -> Result<Vec<EngineComponent>, EngineError>;
}

/// Fixed inventory, for hosts that fetch it out of band and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    components: Vec<EngineComponent>,
}

impl StaticInventory {
    pub fn new(components: Vec<EngineComponent>) -> Self {
        Self { components }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a `_cat/plugins?format=json` response body.
    pub fn from_json(body: &str) -> Result<Self, EngineError> {
        Ok(Self::new(serde_json::from_str(body)?))
    }

    pub fn components(&self) -> &[EngineComponent] {
        &self.components
    }
}

#[async_trait]
impl EngineInventory for StaticInventory {
    async fn installed_components(&self) -> Result<Vec<EngineComponent>, EngineError> {
        Ok(self.components.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cat_plugins_json() {
        let inventory = StaticInventory::from_json(
            r#"[
                {"name": "node-1", "component": "test-plugin-1", "version": "1.9.9"},
                {"name": "node-2", "component": "test-plugin-1", "version": "1.9.9"}
            ]"#,
        )
        .unwrap();

        assert_eq!(inventory.components().len(), 2);
        assert_eq!(inventory.components()[0].node, "node-1");
        assert_eq!(inventory.components()[1].component, "test-plugin-1");
    }

    #[test]
    fn test_invalid_payload() {
        let err = StaticInventory::from_json("{}").unwrap_err();
        assert!(matches!(err, EngineError::Payload(_)));
    }

    #[tokio::test]
    async fn test_static_inventory_query() {
        let inventory = StaticInventory::new(vec![EngineComponent::new("n", "c", "1.0.0")]);
        let components = inventory.installed_components().await.unwrap();
        assert_eq!(components, vec![EngineComponent::new("n", "c", "1.0.0")]);
    }
}
