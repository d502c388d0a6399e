//! Per-user role assignments and the edit overlay.
//!
//! A user's effective permissions are the union of their roles' permissions
//! and any extra grants, minus explicit revocations. Revocation always wins.

use std::collections::BTreeSet;

use fleetedge_types::{ActionName, ActorId, PermissionId, RoleId};
use serde::{Deserialize, Serialize};

use crate::error::{RbacError, Result};
use crate::registry::ModuleRegistry;

/// Roles and per-user overrides held by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub user: ActorId,
    #[serde(default)]
    pub roles: BTreeSet<RoleId>,
    /// Permissions granted directly, outside any role.
    #[serde(default)]
    pub extra: BTreeSet<PermissionId>,
    /// Permissions withheld even if a role grants them.
    #[serde(default)]
    pub revoked: BTreeSet<PermissionId>,
}

impl RoleAssignment {
    pub fn new(user: impl Into<ActorId>) -> Self {
        Self {
            user: user.into(),
            roles: BTreeSet::new(),
            extra: BTreeSet::new(),
            revoked: BTreeSet::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<RoleId>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn with_extra(mut self, permission: impl Into<PermissionId>) -> Self {
        let permission = permission.into();
        self.revoked.remove(&permission);
        self.extra.insert(permission);
        self
    }

    pub fn with_revoked(mut self, permission: impl Into<PermissionId>) -> Self {
        let permission = permission.into();
        self.extra.remove(&permission);
        self.revoked.insert(permission);
        self
    }
}

impl ModuleRegistry {
    /// Checks that every id an assignment names is registered.
    pub fn validate_assignment(&self, assignment: &RoleAssignment) -> Result<()> {
        if let Some(role) = assignment.roles.iter().find(|r| self.role(r).is_none()) {
            return Err(RbacError::UnknownRole(role.clone()));
        }
        if let Some(permission) = assignment
            .extra
            .iter()
            .chain(&assignment.revoked)
            .find(|p| self.permission(p).is_none())
        {
            return Err(RbacError::UnknownPermission(permission.clone()));
        }
        Ok(())
    }

    /// The permissions a user ends up holding.
    pub fn effective_permissions(&self, assignment: &RoleAssignment) -> Result<BTreeSet<PermissionId>> {
        self.validate_assignment(assignment)?;

        let from_roles = assignment
            .roles
            .iter()
            .filter_map(|r| self.role(r))
            .flat_map(|r| r.permissions.iter());

        Ok(from_roles
            .chain(&assignment.extra)
            .filter(|p| !assignment.revoked.contains(*p))
            .cloned()
            .collect())
    }

    /// The actions a user may perform through RBAC.
    pub fn effective_actions(&self, assignment: &RoleAssignment) -> Result<BTreeSet<ActionName>> {
        let permissions = self.effective_permissions(assignment)?;
        Ok(self.actions_of(&permissions).into_iter().cloned().collect())
    }
}

/// What an edit to a user's assignment changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentDiff {
    pub roles_added: BTreeSet<RoleId>,
    pub roles_removed: BTreeSet<RoleId>,
    pub extra_added: BTreeSet<PermissionId>,
    pub extra_removed: BTreeSet<PermissionId>,
    pub revoked_added: BTreeSet<PermissionId>,
    pub revoked_removed: BTreeSet<PermissionId>,
}

impl AssignmentDiff {
    pub fn between(before: &RoleAssignment, after: &RoleAssignment) -> Self {
        fn added<T: Ord + Clone>(from: &BTreeSet<T>, to: &BTreeSet<T>) -> BTreeSet<T> {
            to.difference(from).cloned().collect()
        }

        Self {
            roles_added: added(&before.roles, &after.roles),
            roles_removed: added(&after.roles, &before.roles),
            extra_added: added(&before.extra, &after.extra),
            extra_removed: added(&after.extra, &before.extra),
            revoked_added: added(&before.revoked, &after.revoked),
            revoked_removed: added(&after.revoked, &before.revoked),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roles_added.is_empty()
            && self.roles_removed.is_empty()
            && self.extra_added.is_empty()
            && self.extra_removed.is_empty()
            && self.revoked_added.is_empty()
            && self.revoked_removed.is_empty()
    }
}

/// Net change in effective permissions caused by an edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionChanges {
    pub gained: BTreeSet<PermissionId>,
    pub lost: BTreeSet<PermissionId>,
}

impl ModuleRegistry {
    pub fn permission_changes(
        &self,
        before: &RoleAssignment,
        after: &RoleAssignment,
    ) -> Result<PermissionChanges> {
        let old = self.effective_permissions(before)?;
        let new = self.effective_permissions(after)?;
        Ok(PermissionChanges {
            gained: new.difference(&old).cloned().collect(),
            lost: old.difference(&new).cloned().collect(),
        })
    }
}
