//! # fleetedge-rbac: Role-Based Access Control
//!
//! The portal's module → permission → role graph, stored as an id-keyed
//! arena, plus per-user role assignments.
//!
//! ```text
//! Module ◀── Permission ◀── Role ◀── RoleAssignment
//!  (id)    (module id,     (permission   (role ids, extra,
//!           action)         ids)          revoked)
//! ```
//!
//! RBAC answers "which portal actions may this user see"; the ABAC evaluator
//! in `fleetedge-abac` answers "may this actor act on this resource now".
//!
//! ## Example
//!
//! ```
//! use fleetedge_rbac::{ModuleRegistry, RoleAssignment};
//! use fleetedge_types::ActionName;
//!
//! let registry = ModuleRegistry::fleet_portal().unwrap();
//! let ana = RoleAssignment::new("usr-ana")
//!     .with_role("role-dispatcher")
//!     .with_revoked("perm-route-update");
//!
//! let actions = registry.effective_actions(&ana).unwrap();
//! assert!(actions.contains(&ActionName::from_static("vehicle:read:telemetry")));
//! assert!(!actions.contains(&ActionName::from_static("vehicle:update:route")));
//! ```

pub mod assignment;
pub mod error;
pub mod registry;

pub use assignment::{AssignmentDiff, PermissionChanges, RoleAssignment};
pub use error::{RbacError, Result};
pub use registry::{Module, ModuleRegistry, Permission, Role};
