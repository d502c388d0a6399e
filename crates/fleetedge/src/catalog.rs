//! The set of actions the portal knows about.

use std::collections::BTreeSet;

use fleetedge_abac::Policy;
use fleetedge_rbac::ModuleRegistry;
use fleetedge_types::ActionName;
use serde::{Deserialize, Serialize};

/// Known actions.
///
/// Kept apart from the policies: an action can be known without any policy
/// covering it, in which case requests for it fall through to the default
/// deny instead of being rejected as unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionCatalog(BTreeSet<ActionName>);

impl ActionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every action a registered RBAC permission refers to.
    pub fn from_registry(registry: &ModuleRegistry) -> Self {
        let actions = registry
            .modules()
            .filter_map(|m| registry.permissions_of_module(&m.id).ok())
            .flatten()
            .map(|p| p.action.clone())
            .collect();
        Self(actions)
    }

    /// Every action named by `policies`.
    pub fn from_policies(policies: &[Policy]) -> Self {
        Self(policies.iter().flat_map(|p| p.actions.iter().cloned()).collect())
    }

    pub fn with(mut self, action: ActionName) -> Self {
        self.0.insert(action);
        self
    }

    pub fn insert(&mut self, action: ActionName) -> bool {
        self.0.insert(action)
    }

    pub fn extend(&mut self, other: &ActionCatalog) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn contains(&self, action: &ActionName) -> bool {
        self.0.contains(action)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionName> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_catalog_covers_fleet_policies() {
        let registry = ModuleRegistry::fleet_portal().unwrap();
        let catalog = ActionCatalog::from_registry(&registry);
        for action in ActionCatalog::from_policies(&Policy::fleet_policies()).iter() {
            assert!(catalog.contains(action), "{action} missing from portal catalog");
        }
    }

    #[test]
    fn test_extend() {
        let mut catalog = ActionCatalog::new().with(ActionName::from_static("a:b"));
        catalog.extend(&ActionCatalog::new().with(ActionName::from_static("c:d")));
        assert_eq!(catalog.len(), 2);
    }
}
