use fleetedge_types::{ModuleId, PermissionId, RoleId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RbacError {
    #[error("Unknown module: {0}")]
    UnknownModule(ModuleId),

    #[error("Unknown permission: {0}")]
    UnknownPermission(PermissionId),

    #[error("Unknown role: {0}")]
    UnknownRole(RoleId),

    #[error("{kind} '{id}' is already registered")]
    AlreadyRegistered { kind: &'static str, id: String },

    #[error("Permission {permission} is still granted by role {role}")]
    PermissionInUse {
        permission: PermissionId,
        role: RoleId,
    },
}

pub type Result<T> = std::result::Result<T, RbacError>;
