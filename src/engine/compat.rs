use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::inventory::EngineComponent;
use super::range::VersionRange;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckStatus {
    /// A matching component was found. `missing_nodes` lists engine nodes
    /// that report no matching copy.
    Satisfied {
        version: String,
        missing_nodes: Vec<String>,
    },
    Missing,
    Incompatible {
        found: Vec<String>,
    },
    InvalidRange {
        reason: String,
    },
    /// The installed components could not be queried.
    Unknown {
        reason: String,
    },
}

/// Outcome for one declared engine component requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentCheck {
    pub component: String,
    pub range: String,
    #[serde(flatten)]
    pub status: CheckStatus,
}

impl ComponentCheck {
    pub fn is_satisfied(&self) -> bool {
        matches!(self.status, CheckStatus::Satisfied { .. })
    }

    /// Human-readable state of the component, completing
    /// "component X is ...".
    pub fn describe(&self) -> String {
        match &self.status {
            CheckStatus::Satisfied { version, .. } => format!("installed at {}", version),
            CheckStatus::Missing => "not installed".to_string(),
            CheckStatus::Incompatible { found } => {
                format!("installed at incompatible version(s) {}", found.join(", "))
            }
            CheckStatus::InvalidRange { reason } => {
                format!("declared with an invalid range: {}", reason)
            }
            CheckStatus::Unknown { reason } => format!("unverifiable: {}", reason),
        }
    }
}

/// Marks every requirement as unverifiable, e.g. when the engine could not
/// be reached.
pub fn unknown_compatibility(
    required: &BTreeMap<String, String>,
    reason: &str,
) -> Vec<ComponentCheck> {
    required
        .iter()
        .map(|(component, range)| ComponentCheck {
            component: component.clone(),
            range: range.clone(),
            status: CheckStatus::Unknown {
                reason: reason.to_string(),
            },
        })
        .collect()
}

/// Checks each `component -> range` requirement against the installed
/// components. Results follow the requirement map's key order.
pub fn check_compatibility(
    required: &BTreeMap<String, String>,
    installed: &[EngineComponent],
) -> Vec<ComponentCheck> {
    let nodes: BTreeSet<&str> = installed.iter().map(|c| c.node.as_str()).collect();

    required
        .iter()
        .map(|(component, raw_range)| {
            let status = match VersionRange::parse(raw_range) {
                Ok(range) => check_one(component, &range, installed, &nodes),
                Err(e) => CheckStatus::InvalidRange {
                    reason: e.to_string(),
                },
            };
            ComponentCheck {
                component: component.clone(),
                range: raw_range.clone(),
                status,
            }
        })
        .collect()
}

fn check_one(
    component: &str,
    range: &VersionRange,
    installed: &[EngineComponent],
    nodes: &BTreeSet<&str>,
) -> CheckStatus {
    let candidates: Vec<&EngineComponent> = installed
        .iter()
        .filter(|c| c.component == component)
        .collect();

    if candidates.is_empty() {
        return CheckStatus::Missing;
    }

    let matching: Vec<&EngineComponent> = candidates
        .iter()
        .copied()
        .filter(|c| range.matches_str(&c.version))
        .collect();

    match matching.first() {
        Some(first) => {
            let covered: BTreeSet<&str> = matching.iter().map(|c| c.node.as_str()).collect();
            CheckStatus::Satisfied {
                version: first.version.clone(),
                missing_nodes: nodes
                    .difference(&covered)
                    .map(|n| n.to_string())
                    .collect(),
            }
        }
        None => {
            let mut found: Vec<String> = candidates.iter().map(|c| c.version.clone()).collect();
            found.sort();
            found.dedup();
            CheckStatus::Incompatible { found }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_satisfied() {
        let installed = vec![EngineComponent::new("node-1", "test-plugin-1", "1.9.9")];
        let checks = check_compatibility(&required(&[("test-plugin-1", "^1.1.1")]), &installed);

        assert_eq!(checks.len(), 1);
        assert_eq!(
            checks[0].status,
            CheckStatus::Satisfied {
                version: "1.9.9".into(),
                missing_nodes: vec![],
            }
        );
    }

    #[test]
    fn test_missing_component() {
        let installed = vec![EngineComponent::new("node-1", "test-plugin", "2.1.0")];
        let checks =
            check_compatibility(&required(&[("missing-engine-dep", "^2.0.0")]), &installed);
        assert_eq!(checks[0].status, CheckStatus::Missing);
        assert_eq!(checks[0].describe(), "not installed");
    }

    #[test]
    fn test_incompatible_version() {
        let installed = vec![
            EngineComponent::new("node-1", "test-plugin", "1.0.0"),
            EngineComponent::new("node-2", "test-plugin", "1.0.0"),
        ];
        let checks = check_compatibility(&required(&[("test-plugin", "^2.0.0")]), &installed);
        assert_eq!(
            checks[0].status,
            CheckStatus::Incompatible {
                found: vec!["1.0.0".into()]
            }
        );
        assert!(!checks[0].is_satisfied());
    }

    #[test]
    fn test_partially_installed_cluster() {
        let installed = vec![
            EngineComponent::new("node-1", "test-plugin", "2.1.0.0"),
            EngineComponent::new("node-2", "other", "1.0.0"),
        ];
        let checks = check_compatibility(&required(&[("test-plugin", "^2.0.0")]), &installed);
        match &checks[0].status {
            CheckStatus::Satisfied { missing_nodes, .. } => {
                assert_eq!(missing_nodes, &vec!["node-2".to_string()]);
            }
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_range_is_reported() {
        let checks = check_compatibility(&required(&[("c", "bogus range")]), &[]);
        assert!(matches!(checks[0].status, CheckStatus::InvalidRange { .. }));
    }

    #[test]
    fn test_unknown_marks_every_requirement_unsatisfied() {
        let checks = unknown_compatibility(&required(&[("a", "^1.0.0"), ("b", "~2.0.0")]), "down");
        assert_eq!(checks.len(), 2);
        assert!(checks.iter().all(|c| !c.is_satisfied()));
        assert_eq!(checks[1].describe(), "unverifiable: down");
    }

    #[test]
    fn test_no_requirements() {
        let installed = vec![EngineComponent::new("node-1", "c", "1.0.0")];
        assert!(check_compatibility(&BTreeMap::new(), &installed).is_empty());
    }
}
