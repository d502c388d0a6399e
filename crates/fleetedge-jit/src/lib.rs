//! # fleetedge-jit: Just-in-Time Access
//!
//! Fleet incidents (a breakdown, a route deviation) sometimes require access
//! the static policies do not give. A JIT grant is a time-boxed permission
//! set requested against a [`FleetEvent`], approved or denied by a
//! supervisor, and expiring on its own.
//!
//! Expiry is checked lazily at read time: a grant whose window has closed is
//! never returned as active, whether or not [`JitManager::sweep`] has run.
//!
//! ## Example
//!
//! ```
//! use chrono::{Duration, Utc};
//! use fleetedge_jit::{EventKind, FleetEvent, GrantDecision, JitManager};
//! use fleetedge_types::{ActionName, ActorId, ResourceId};
//!
//! let now = Utc::now();
//! let mut manager = JitManager::new();
//! let event = FleetEvent::new("evt-42", EventKind::Breakdown, "usr-dispatch", now);
//! let reroute = ActionName::from_static("vehicle:update:route");
//!
//! let id = manager.request_at(event, [reroute.clone()], 2, now).unwrap();
//! manager.decide_at(id, GrantDecision::Approved, "usr-supervisor", now).unwrap();
//!
//! let actor = ActorId::from("usr-dispatch");
//! let van = ResourceId::from("veh-ev-van-12");
//! assert!(manager.covering_grant(&actor, &reroute, &van, now + Duration::hours(1)).is_some());
//! assert!(manager.covering_grant(&actor, &reroute, &van, now + Duration::hours(3)).is_none());
//! ```

pub mod audit;
pub mod error;
pub mod grant;
pub mod manager;

pub use audit::{AuditAction, AuditEntry, AuditQuery, JitAuditLog};
pub use error::{JitError, Result};
pub use grant::{EventKind, FleetEvent, GrantDecision, GrantStatus, JitGrant};
pub use manager::{DEFAULT_MAX_DURATION_HOURS, JitManager};
