//! # fleetedge-abac: Attribute-Based Access Control
//!
//! Decides whether an actor may perform an action on a fleet resource, and
//! explains the decision policy by policy.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Access Request                              │
//! │  (Actor + Action + Resource Snapshot + Ctx)  │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Evaluator                                   │
//! │  ├─ Visit policies in declaration order      │
//! │  ├─ Match action, then AND all conditions    │
//! │  └─ Deny overrides allow; default deny       │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Decision                                    │
//! │  - Outcome (Granted/Denied)                  │
//! │  - One trace step per policy                 │
//! │  - Reason from the deciding policy           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Examples
//!
//! ```
//! use fleetedge_abac::attributes::{Actor, ActorKind, RequestContext, Resource, ResourceKind};
//! use fleetedge_abac::evaluator::{self, Outcome};
//! use fleetedge_abac::policy::Policy;
//! use fleetedge_types::ActionName;
//! use chrono::Utc;
//!
//! let routing = Actor::new("svc-routing", ActorKind::ServicePrincipal, "Routing Service");
//! let tipper = Resource::new("veh-tipper-5", ResourceKind::Vehicle)
//!     .with_attribute("status", "In_Maintenance");
//! let now = Utc::now();
//!
//! let decision = evaluator::evaluate(
//!     &[Policy::tipper_access()],
//!     &routing,
//!     &ActionName::from_static("vehicle:update:load_balance"),
//!     &tipper.snapshot(now),
//!     &RequestContext::at(now),
//! );
//!
//! assert_eq!(decision.outcome, Outcome::Denied);
//! assert!(decision.trace[0].is_critical);
//! ```

pub mod attributes;
pub mod diff;
pub mod error;
pub mod evaluator;
pub mod policy;
pub mod store;


pub use attributes::{Actor, ActorKind, AttributeSnapshot, RequestContext, Resource, ResourceKind};
pub use diff::{PolicyChange, PolicyDiff};
pub use error::PolicyError;
pub use evaluator::{Decision, DecisionCause, Outcome, TraceStatus, TraceStep, evaluate};
pub use policy::{AttributeSchema, Condition, Effect, Operator, Policy};
pub use store::{PolicySet, PolicyStore, StoredPolicy};
