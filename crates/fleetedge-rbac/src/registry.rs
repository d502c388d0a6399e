//! Module, permission and role registry.
//!
//! The registry is an arena keyed by id. A permission names its module, a
//! role names its permissions; nothing holds a reference to anything else.
//! Reverse lookups (permissions of a module, roles granting a permission) are
//! answered by scanning, which keeps a single source of truth.

use std::collections::{BTreeMap, BTreeSet};

use fleetedge_types::{ActionName, ModuleId, PermissionId, RoleId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RbacError, Result};

/// A portal area, such as vehicles or cargo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
}

/// Permission to perform one action inside one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub module: ModuleId,
    pub action: ActionName,
    #[serde(default)]
    pub description: String,
}

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub permissions: BTreeSet<PermissionId>,
}

impl Role {
    pub fn new(id: impl Into<RoleId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            permissions: BTreeSet::new(),
        }
    }

    pub fn with_permission(mut self, permission: impl Into<PermissionId>) -> Self {
        self.permissions.insert(permission.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRegistry {
    modules: BTreeMap<ModuleId, Module>,
    permissions: BTreeMap<PermissionId, Permission>,
    roles: BTreeMap<RoleId, Role>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_module(&mut self, id: impl Into<ModuleId>, name: impl Into<String>) -> Result<()> {
        let id = id.into();
        if self.modules.contains_key(&id) {
            return Err(RbacError::AlreadyRegistered {
                kind: "module",
                id: id.to_string(),
            });
        }
        debug!(module = %id, "Module registered");
        self.modules.insert(
            id.clone(),
            Module {
                id,
                name: name.into(),
            },
        );
        Ok(())
    }

    /// Registers a permission. Its module must already exist.
    pub fn register_permission(&mut self, permission: Permission) -> Result<()> {
        if !self.modules.contains_key(&permission.module) {
            return Err(RbacError::UnknownModule(permission.module));
        }
        if self.permissions.contains_key(&permission.id) {
            return Err(RbacError::AlreadyRegistered {
                kind: "permission",
                id: permission.id.to_string(),
            });
        }
        debug!(permission = %permission.id, module = %permission.module, "Permission registered");
        self.permissions.insert(permission.id.clone(), permission);
        Ok(())
    }

    /// Registers a role. Every permission it names must already exist.
    pub fn register_role(&mut self, role: Role) -> Result<()> {
        if self.roles.contains_key(&role.id) {
            return Err(RbacError::AlreadyRegistered {
                kind: "role",
                id: role.id.to_string(),
            });
        }
        if let Some(missing) = role
            .permissions
            .iter()
            .find(|p| !self.permissions.contains_key(*p))
        {
            return Err(RbacError::UnknownPermission(missing.clone()));
        }
        info!(role = %role.id, permissions = role.permissions.len(), "Role registered");
        self.roles.insert(role.id.clone(), role);
        Ok(())
    }

    /// Adds a permission to an existing role. Returns false if already granted.
    pub fn grant(&mut self, role: &RoleId, permission: &PermissionId) -> Result<bool> {
        if !self.permissions.contains_key(permission) {
            return Err(RbacError::UnknownPermission(permission.clone()));
        }
        let entry = self
            .roles
            .get_mut(role)
            .ok_or_else(|| RbacError::UnknownRole(role.clone()))?;
        let added = entry.permissions.insert(permission.clone());
        if added {
            info!(role = %role, permission = %permission, "Permission granted to role");
        }
        Ok(added)
    }

    /// Removes a permission from a role. Returns false if it was not granted.
    pub fn revoke(&mut self, role: &RoleId, permission: &PermissionId) -> Result<bool> {
        let entry = self
            .roles
            .get_mut(role)
            .ok_or_else(|| RbacError::UnknownRole(role.clone()))?;
        let removed = entry.permissions.remove(permission);
        if removed {
            info!(role = %role, permission = %permission, "Permission revoked from role");
        }
        Ok(removed)
    }

    /// Removes a permission no role grants anymore.
    pub fn remove_permission(&mut self, id: &PermissionId) -> Result<Permission> {
        if let Some(role) = self.roles_with_permission(id).first() {
            return Err(RbacError::PermissionInUse {
                permission: id.clone(),
                role: role.id.clone(),
            });
        }
        self.permissions
            .remove(id)
            .ok_or_else(|| RbacError::UnknownPermission(id.clone()))
    }

    pub fn module(&self, id: &ModuleId) -> Option<&Module> {
        self.modules.get(id)
    }

    pub fn permission(&self, id: &PermissionId) -> Option<&Permission> {
        self.permissions.get(id)
    }

    pub fn role(&self, id: &RoleId) -> Option<&Role> {
        self.roles.get(id)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    pub fn permissions_of_module(&self, module: &ModuleId) -> Result<Vec<&Permission>> {
        if !self.modules.contains_key(module) {
            return Err(RbacError::UnknownModule(module.clone()));
        }
        Ok(self
            .permissions
            .values()
            .filter(|p| &p.module == module)
            .collect())
    }

    pub fn roles_with_permission(&self, permission: &PermissionId) -> Vec<&Role> {
        self.roles
            .values()
            .filter(|r| r.permissions.contains(permission))
            .collect()
    }

    /// Modules a role touches through its permissions.
    pub fn modules_of_role(&self, role: &RoleId) -> Result<BTreeSet<&ModuleId>> {
        let role = self
            .roles
            .get(role)
            .ok_or_else(|| RbacError::UnknownRole(role.clone()))?;
        Ok(role
            .permissions
            .iter()
            .filter_map(|p| self.permissions.get(p))
            .map(|p| &p.module)
            .collect())
    }

    /// Resolves permission ids to the actions they allow.
    pub fn actions_of<'a>(
        &'a self,
        permissions: impl IntoIterator<Item = &'a PermissionId>,
    ) -> BTreeSet<&'a ActionName> {
        permissions
            .into_iter()
            .filter_map(|p| self.permissions.get(p))
            .map(|p| &p.action)
            .collect()
    }

    /// The FleetEdge portal's modules, permissions and roles.
    pub fn fleet_portal() -> Result<Self> {
        let mut registry = Self::new();

        registry.register_module("mod-vehicles", "Vehicles")?;
        registry.register_module("mod-maintenance", "Maintenance")?;
        registry.register_module("mod-cargo", "Cargo")?;

        for (id, module, action) in [
            ("perm-telemetry-read", "mod-vehicles", "vehicle:read:telemetry"),
            ("perm-location-read", "mod-vehicles", "vehicle:read:location"),
            ("perm-route-update", "mod-vehicles", "vehicle:update:route"),
            ("perm-load-balance", "mod-vehicles", "vehicle:update:load_balance"),
            ("perm-log-write", "mod-maintenance", "maintenance:write:log"),
            ("perm-manifest-update", "mod-cargo", "cargo:update:manifest"),
            ("perm-manifest-delete", "mod-cargo", "cargo:delete:manifest"),
        ] {
            registry.register_permission(Permission {
                id: id.into(),
                module: module.into(),
                action: ActionName::from_static(action),
                description: String::new(),
            })?;
        }

        registry.register_role(
            Role::new("role-fleet-manager", "Fleet Manager")
                .with_permission("perm-telemetry-read")
                .with_permission("perm-route-update")
                .with_permission("perm-load-balance")
                .with_permission("perm-manifest-update")
                .with_permission("perm-manifest-delete"),
        )?;
        registry.register_role(
            Role::new("role-dispatcher", "Dispatcher")
                .with_permission("perm-telemetry-read")
                .with_permission("perm-location-read")
                .with_permission("perm-route-update"),
        )?;
        registry.register_role(
            Role::new("role-mechanic", "Mechanic")
                .with_permission("perm-telemetry-read")
                .with_permission("perm-log-write"),
        )?;

        Ok(registry)
    }
}
