//! Fleet events and the JIT grant state machine.
//!
//! ```text
//!            approve            time passes
//! Pending ───────────▶ Approved ───────────▶ Expired
//!    │
//!    └──────────────▶ Denied
//!          deny
//! ```
//!
//! `Denied` and `Expired` are terminal. A grant is never renewed; a new
//! incident needs a new request.

use std::collections::BTreeSet;
use std::fmt::{self, Display};

use chrono::{DateTime, Duration, Utc};
use fleetedge_types::{ActionName, ActorId, EventId, GrantId, ResourceId};
use serde::{Deserialize, Serialize};

// ============================================================================
// Fleet events
// ============================================================================

/// What happened on the road that justifies elevated access.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Breakdown,
    RouteDeviation,
    Accident,
    Other(String),
}

impl Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Breakdown => f.write_str("breakdown"),
            Self::RouteDeviation => f.write_str("route_deviation"),
            Self::Accident => f.write_str("accident"),
            Self::Other(kind) => f.write_str(kind),
        }
    }
}

/// An operational incident that triggers a JIT request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetEvent {
    pub id: EventId,
    pub kind: EventKind,
    /// The actor that needs elevated access to handle the event.
    pub actor: ActorId,
    pub resource: Option<ResourceId>,
    #[serde(default)]
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

impl FleetEvent {
    pub fn new(
        id: impl Into<EventId>,
        kind: EventKind,
        actor: impl Into<ActorId>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            actor: actor.into(),
            resource: None,
            description: String::new(),
            occurred_at,
        }
    }

    pub fn with_resource(mut self, resource: impl Into<ResourceId>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

// ============================================================================
// Grant state
// ============================================================================

/// Lifecycle state of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    Pending,
    Approved,
    Denied,
    Expired,
}

impl GrantStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Denied | Self::Expired)
    }
}

impl Display for GrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Expired => "expired",
        })
    }
}

/// An approver's verdict on a pending grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantDecision {
    Approved,
    Denied,
}

impl Display for GrantDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Approved => "approved",
            Self::Denied => "denied",
        })
    }
}

// ============================================================================
// Grant
// ============================================================================

/// A time-boxed permission set issued in response to a fleet event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JitGrant {
    pub id: GrantId,
    pub actor: ActorId,
    pub event: FleetEvent,
    pub permissions: BTreeSet<ActionName>,
    pub duration_hours: u32,
    pub requested_at: DateTime<Utc>,
    /// Set when the grant is approved.
    pub created_at: Option<DateTime<Utc>>,
    /// `created_at + duration_hours`, set when the grant is approved.
    pub expires_at: Option<DateTime<Utc>>,
    pub status: GrantStatus,
    pub decided_by: Option<String>,
}

impl JitGrant {
    pub(crate) fn pending(
        event: FleetEvent,
        permissions: BTreeSet<ActionName>,
        duration_hours: u32,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: GrantId::generate(),
            actor: event.actor.clone(),
            event,
            permissions,
            duration_hours,
            requested_at,
            created_at: None,
            expires_at: None,
            status: GrantStatus::Pending,
            decided_by: None,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::hours(i64::from(self.duration_hours))
    }

    /// The status as observed at `now`.
    ///
    /// An approved grant whose window has closed reads as `Expired` even if no
    /// sweep has run yet.
    pub fn status_at(&self, now: DateTime<Utc>) -> GrantStatus {
        match (self.status, self.expires_at) {
            (GrantStatus::Approved, Some(expires_at)) if now >= expires_at => GrantStatus::Expired,
            (status, _) => status,
        }
    }

    /// Returns true if the grant is approved and inside its window at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status_at(now) == GrantStatus::Approved
    }

    /// Returns true if the grant is active at `now` and includes `action`.
    pub fn covers(&self, action: &ActionName, now: DateTime<Utc>) -> bool {
        self.is_active_at(now) && self.permissions.contains(action)
    }

    /// Returns true if the grant applies to `resource`.
    ///
    /// A grant raised for an event on a specific resource covers only that
    /// resource; an event without a resource covers all of them.
    pub fn covers_resource(&self, resource: &ResourceId) -> bool {
        self.event.resource.as_ref().is_none_or(|r| r == resource)
    }

    /// Time left before expiry, if the grant is active.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        if !self.is_active_at(now) {
            return None;
        }
        self.expires_at.map(|expires_at| expires_at - now)
    }

    pub(crate) fn approve(&mut self, decided_by: &str, now: DateTime<Utc>) {
        self.status = GrantStatus::Approved;
        self.created_at = Some(now);
        self.expires_at = Some(now + self.duration());
        self.decided_by = Some(decided_by.to_string());
    }

    pub(crate) fn deny(&mut self, decided_by: &str) {
        self.status = GrantStatus::Denied;
        self.decided_by = Some(decided_by.to_string());
    }

    pub(crate) fn expire(&mut self) {
        self.status = GrantStatus::Expired;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 8, 0, 0).unwrap()
    }

    fn breakdown_grant(hours: u32) -> JitGrant {
        let event = FleetEvent::new("evt-1", EventKind::Breakdown, "usr-dispatch", t0())
            .with_resource("veh-tipper-5")
            .with_description("Hydraulic failure on A40");
        JitGrant::pending(
            event,
            BTreeSet::from([ActionName::from_static("vehicle:update:route")]),
            hours,
            t0(),
        )
    }

    #[test]
    fn test_pending_grant_is_not_active() {
        let grant = breakdown_grant(2);
        assert_eq!(grant.status_at(t0()), GrantStatus::Pending);
        assert!(!grant.is_active_at(t0()));
        assert!(grant.expires_at.is_none());
    }

    #[test]
    fn test_approval_opens_window() {
        let mut grant = breakdown_grant(2);
        let approved_at = t0() + Duration::minutes(10);
        grant.approve("usr-supervisor", approved_at);

        assert_eq!(grant.created_at, Some(approved_at));
        assert_eq!(grant.expires_at, Some(approved_at + Duration::hours(2)));
        assert!(grant.is_active_at(approved_at));
        assert_eq!(
            grant.remaining_at(approved_at + Duration::hours(1)),
            Some(Duration::hours(1))
        );
    }

    #[test]
    fn test_window_end_is_exclusive() {
        let mut grant = breakdown_grant(2);
        grant.approve("usr-supervisor", t0());

        let end = t0() + Duration::hours(2);
        assert!(grant.is_active_at(end - Duration::seconds(1)));
        assert!(!grant.is_active_at(end));
        assert_eq!(grant.status_at(end), GrantStatus::Expired);
        // Lazy expiry does not touch the stored status.
        assert_eq!(grant.status, GrantStatus::Approved);
    }

    #[test]
    fn test_covers_checks_permission_set() {
        let mut grant = breakdown_grant(2);
        grant.approve("usr-supervisor", t0());
        assert!(grant.covers(&ActionName::from_static("vehicle:update:route"), t0()));
        assert!(!grant.covers(&ActionName::from_static("vehicle:delete:record"), t0()));
    }

    #[test]
    fn test_resource_scope() {
        let grant = breakdown_grant(2);
        assert!(grant.covers_resource(&ResourceId::from("veh-tipper-5")));
        assert!(!grant.covers_resource(&ResourceId::from("veh-ev-van-12")));

        let mut unscoped = breakdown_grant(2);
        unscoped.event.resource = None;
        assert!(unscoped.covers_resource(&ResourceId::from("veh-ev-van-12")));
    }

    #[test]
    fn test_event_kind_display() {
        assert_eq!(EventKind::RouteDeviation.to_string(), "route_deviation");
        assert_eq!(EventKind::Other("flood".into()).to_string(), "flood");
    }
}
