//! # FleetEdge
//!
//! Access control for the FleetEdge fleet-management portal.
//!
//! FleetEdge decides whether an actor (a dispatcher, a routing service, an
//! insurance partner) may perform an action on a fleet resource. Static
//! decisions come from attribute-based policies; fleet incidents can open
//! time-boxed just-in-time grants on top of them.
//!
//! - **Explainable** - every decision carries one trace step per policy
//! - **Deny overrides allow** - a matched deny can never be lifted, not even
//!   by a JIT grant
//! - **Consistent reads** - evaluations read a snapshot of the resource and
//!   of the policy set, so concurrent updates never land mid-decision
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Authorizer                           │
//! │  ┌───────────┐   ┌──────────────┐   ┌─────────────────────┐ │
//! │  │ Directory │ → │  ABAC eval   │ → │  JIT grant upgrade  │ │
//! │  │(snapshot) │   │(policy set)  │   │ (non-explicit deny) │ │
//! │  └───────────┘   └──────────────┘   └─────────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use fleetedge::{AuthorizeRequest, Authorizer, FleetEdgeConfig, fixtures};
//! use fleetedge::ActionName;
//!
//! let authorizer = Authorizer::from_config(&FleetEdgeConfig::default(), fixtures::fleet_demo()?)?;
//!
//! let request = AuthorizeRequest::new(
//!     "svc-routing",
//!     ActionName::from_static("vehicle:update:load_balance"),
//!     "veh-tipper-8",
//! );
//! let response = authorizer.authorize(&request)?;
//! assert!(response.is_granted());
//! # Ok::<(), fleetedge::AuthorizeError>(())
//! ```
//!
//! # Modules
//!
//! - **Entry point**: [`Authorizer`], [`ExpirySweeper`]
//! - **Wire shapes**: [`AuthorizeRequest`], [`AuthorizeResponse`], [`JitGrantRequest`]
//! - **Demo fleet**: [`fixtures`]

mod api;
mod authorizer;
mod catalog;
mod directory;
mod error;
pub mod fixtures;
mod sweeper;

pub use api::{AuthorizeRequest, AuthorizeResponse, GrantDecisionRequest, JitGrantRequest};
pub use authorizer::Authorizer;
pub use catalog::ActionCatalog;
pub use directory::Directory;
pub use error::{AuthorizeError, Result};
pub use sweeper::ExpirySweeper;

// Re-export core types
pub use fleetedge_types::{
    ActionName, ActorId, AttributeBag, AttributeKind, AttributeValue, EventId, GrantId, PolicyId,
    ResourceId,
};

// Re-export policy layer
pub use fleetedge_abac::{
    Actor, ActorKind, AttributeSchema, Condition, Decision, DecisionCause, Effect, Operator,
    Outcome, Policy, PolicyChange, PolicyDiff, PolicyError, PolicySet, PolicyStore, Resource,
    ResourceKind, StoredPolicy, TraceStatus, TraceStep,
};

// Re-export JIT layer
pub use fleetedge_jit::{
    AuditAction, AuditEntry, AuditQuery, EventKind, FleetEvent, GrantDecision, GrantStatus,
    JitError, JitGrant,
};

// Re-export RBAC layer
pub use fleetedge_rbac::{ModuleRegistry, RbacError, RoleAssignment};

// Re-export configuration
pub use fleetedge_config::{ConfigLoader, FleetEdgeConfig, JitConfig};
