//! Grant bookkeeping: request, decide, expire.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use fleetedge_types::{ActionName, ActorId, GrantId, ResourceId};
use tracing::{debug, info, warn};

use crate::audit::{AuditAction, JitAuditLog};
use crate::error::{JitError, Result};
use crate::grant::{FleetEvent, GrantDecision, GrantStatus, JitGrant};

/// Default upper bound on a grant's duration.
pub const DEFAULT_MAX_DURATION_HOURS: u32 = 24;

/// Recorded as `recorded_by` for expiries materialised by [`JitManager::sweep`].
pub const SWEEPER: &str = "system:expiry-sweeper";

/// Owns every JIT grant and the audit log describing them.
#[derive(Debug)]
pub struct JitManager {
    grants: HashMap<GrantId, JitGrant>,
    /// Grants per actor, in request order.
    actor_index: HashMap<ActorId, Vec<GrantId>>,
    audit: JitAuditLog,
    max_duration_hours: u32,
}

impl Default for JitManager {
    fn default() -> Self {
        Self::new()
    }
}

impl JitManager {
    pub fn new() -> Self {
        Self::with_max_duration(DEFAULT_MAX_DURATION_HOURS)
    }

    pub fn with_max_duration(max_duration_hours: u32) -> Self {
        Self {
            grants: HashMap::new(),
            actor_index: HashMap::new(),
            audit: JitAuditLog::new(),
            max_duration_hours,
        }
    }

    pub fn max_duration_hours(&self) -> u32 {
        self.max_duration_hours
    }

    /// Opens a pending grant for the event's actor.
    pub fn request(
        &mut self,
        event: FleetEvent,
        permissions: impl IntoIterator<Item = ActionName>,
        duration_hours: u32,
    ) -> Result<GrantId> {
        self.request_at(event, permissions, duration_hours, Utc::now())
    }

    /// Opens a pending grant with an explicit request time.
    pub fn request_at(
        &mut self,
        event: FleetEvent,
        permissions: impl IntoIterator<Item = ActionName>,
        duration_hours: u32,
        now: DateTime<Utc>,
    ) -> Result<GrantId> {
        let permissions: BTreeSet<ActionName> = permissions.into_iter().collect();

        if event.actor.is_empty() {
            return Err(JitError::InvalidRequest(
                "event must name the actor needing access".to_string(),
            ));
        }
        if permissions.is_empty() {
            return Err(JitError::InvalidRequest(
                "at least one permission is required".to_string(),
            ));
        }
        if duration_hours == 0 || duration_hours > self.max_duration_hours {
            return Err(JitError::InvalidRequest(format!(
                "duration must be between 1 and {} hours, got {duration_hours}",
                self.max_duration_hours
            )));
        }

        let grant = JitGrant::pending(event, permissions, duration_hours, now);
        let id = grant.id;

        self.audit.append(
            id,
            grant.actor.clone(),
            grant.event.id.clone(),
            AuditAction::Requested,
            grant.actor.as_str(),
            now,
        );
        info!(
            grant = %id,
            actor = %grant.actor,
            event = %grant.event.id,
            kind = %grant.event.kind,
            permissions = grant.permissions.len(),
            duration_hours,
            "JIT grant requested"
        );

        self.actor_index
            .entry(grant.actor.clone())
            .or_default()
            .push(id);
        self.grants.insert(id, grant);
        Ok(id)
    }

    /// Approves or denies a pending grant.
    pub fn decide(
        &mut self,
        grant_id: GrantId,
        decision: GrantDecision,
        decided_by: &str,
    ) -> Result<&JitGrant> {
        self.decide_at(grant_id, decision, decided_by, Utc::now())
    }

    /// Approves or denies a pending grant at an explicit time.
    ///
    /// Approval starts the grant's window at `now`.
    pub fn decide_at(
        &mut self,
        grant_id: GrantId,
        decision: GrantDecision,
        decided_by: &str,
        now: DateTime<Utc>,
    ) -> Result<&JitGrant> {
        let grant = self
            .grants
            .get_mut(&grant_id)
            .ok_or(JitError::GrantNotFound(grant_id))?;

        match grant.status_at(now) {
            GrantStatus::Pending => {}
            GrantStatus::Expired => {
                warn!(grant = %grant_id, "Decision on expired JIT grant rejected");
                return Err(JitError::GrantExpired(grant_id));
            }
            status => {
                warn!(grant = %grant_id, %status, "JIT grant already decided");
                return Err(JitError::GrantAlreadyDecided {
                    id: grant_id,
                    status,
                });
            }
        }

        let action = match decision {
            GrantDecision::Approved => {
                grant.approve(decided_by, now);
                AuditAction::Approved
            }
            GrantDecision::Denied => {
                grant.deny(decided_by);
                AuditAction::Denied
            }
        };

        self.audit.append(
            grant_id,
            grant.actor.clone(),
            grant.event.id.clone(),
            action,
            decided_by,
            now,
        );
        info!(
            grant = %grant_id,
            actor = %grant.actor,
            %decision,
            decided_by,
            expires_at = ?grant.expires_at,
            "JIT grant decided"
        );

        Ok(grant)
    }

    /// Transitions every approved grant whose window has closed to `Expired`.
    ///
    /// Returns the ids that were expired by this call.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<GrantId> {
        let mut expired: Vec<GrantId> = self
            .grants
            .values()
            .filter(|g| g.status == GrantStatus::Approved && g.status_at(now) == GrantStatus::Expired)
            .map(|g| g.id)
            .collect();
        // Stable audit order regardless of map iteration.
        expired.sort_by_key(|id| self.grants.get(id).and_then(|g| g.expires_at));

        for id in &expired {
            if let Some(grant) = self.grants.get_mut(id) {
                grant.expire();
                let at = grant.expires_at.unwrap_or(now);
                self.audit.append(
                    *id,
                    grant.actor.clone(),
                    grant.event.id.clone(),
                    AuditAction::Expired,
                    SWEEPER,
                    at,
                );
                info!(grant = %id, actor = %grant.actor, "JIT grant expired");
            }
        }

        if !expired.is_empty() {
            debug!(count = expired.len(), "Expiry sweep complete");
        }
        expired
    }

    pub fn get(&self, grant_id: GrantId) -> Option<&JitGrant> {
        self.grants.get(&grant_id)
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// All grants ever requested for `actor`, in request order.
    pub fn grants_for(&self, actor: &ActorId) -> Vec<&JitGrant> {
        self.actor_index
            .get(actor)
            .into_iter()
            .flatten()
            .filter_map(|id| self.grants.get(id))
            .collect()
    }

    /// Grants usable by `actor` at `now`. Expired grants are never returned,
    /// swept or not.
    pub fn active_grants_for(&self, actor: &ActorId, now: DateTime<Utc>) -> Vec<&JitGrant> {
        self.grants_for(actor)
            .into_iter()
            .filter(|g| g.is_active_at(now))
            .collect()
    }

    /// The first active grant letting `actor` perform `action` on `resource`
    /// at `now`.
    pub fn covering_grant(
        &self,
        actor: &ActorId,
        action: &ActionName,
        resource: &ResourceId,
        now: DateTime<Utc>,
    ) -> Option<&JitGrant> {
        self.grants_for(actor)
            .into_iter()
            .find(|g| g.covers(action, now) && g.covers_resource(resource))
    }

    pub fn audit(&self) -> &JitAuditLog {
        &self.audit
    }
}
