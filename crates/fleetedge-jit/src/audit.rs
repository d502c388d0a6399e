//! Append-only audit trail of JIT grant activity.
//!
//! Every request, decision and expiry is recorded as an immutable
//! [`AuditEntry`]. The log offers no mutation or deletion API; entries can
//! only be appended, queried and exported.

use chrono::{DateTime, Utc};
use fleetedge_types::{ActorId, EventId, GrantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// What happened to a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Requested,
    Approved,
    Denied,
    Expired,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Expired => "expired",
        }
    }
}

/// One immutable record in the JIT audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub grant_id: GrantId,
    /// The actor holding (or requesting) the grant.
    pub actor: ActorId,
    pub event: EventId,
    pub decision: AuditAction,
    /// Who caused the entry: the requester, the approver, or the sweeper.
    pub recorded_by: String,
    pub at: DateTime<Utc>,
}

/// Filter for audit queries. Empty filters match everything.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub grant_id: Option<GrantId>,
    pub actor: Option<ActorId>,
    pub decision: Option<AuditAction>,
    pub time_from: Option<DateTime<Utc>>,
    pub time_to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grant(mut self, grant_id: GrantId) -> Self {
        self.grant_id = Some(grant_id);
        self
    }

    pub fn with_actor(mut self, actor: impl Into<ActorId>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_decision(mut self, decision: AuditAction) -> Self {
        self.decision = Some(decision);
        self
    }

    /// Inclusive on both ends.
    pub fn with_time_range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.time_from = Some(from);
        self.time_to = Some(to);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, entry: &AuditEntry) -> bool {
        if self.grant_id.is_some_and(|id| id != entry.grant_id) {
            return false;
        }
        if self.actor.as_ref().is_some_and(|a| a != &entry.actor) {
            return false;
        }
        if self.decision.is_some_and(|d| d != entry.decision) {
            return false;
        }
        if self.time_from.is_some_and(|from| entry.at < from) {
            return false;
        }
        if self.time_to.is_some_and(|to| entry.at > to) {
            return false;
        }
        true
    }
}

/// Append-only JIT audit log, in recording order.
#[derive(Debug, Default)]
pub struct JitAuditLog {
    entries: Vec<AuditEntry>,
}

impl JitAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry and returns its id.
    pub(crate) fn append(
        &mut self,
        grant_id: GrantId,
        actor: ActorId,
        event: EventId,
        decision: AuditAction,
        recorded_by: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.entries.push(AuditEntry {
            id,
            grant_id,
            actor,
            event,
            decision,
            recorded_by: recorded_by.into(),
            at,
        });
        id
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries matching `filter`, oldest first.
    pub fn query(&self, filter: &AuditQuery) -> Vec<&AuditEntry> {
        let matching = self.entries.iter().filter(|e| filter.matches(e));
        match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }

    /// The full history of one grant.
    pub fn for_grant(&self, grant_id: GrantId) -> Vec<&AuditEntry> {
        self.query(&AuditQuery::new().with_grant(grant_id))
    }

    /// Exports matching entries as a pretty-printed JSON array.
    pub fn export_json(&self, filter: &AuditQuery) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.query(filter))?)
    }
}
