//! Request and response bodies.
//!
//! Shaped after the portal's HTTP endpoints:
//! - `POST /authorize` → [`AuthorizeRequest`] / [`AuthorizeResponse`]
//! - `POST /jit-grants` → [`JitGrantRequest`]
//! - `POST /jit-grants/{id}/decision` → [`GrantDecisionRequest`]

use chrono::{DateTime, Utc};
use fleetedge_abac::{Decision, Outcome, TraceStep};
use fleetedge_jit::{FleetEvent, GrantDecision};
use fleetedge_types::{ActionName, ActorId, AttributeBag, GrantId, PolicyId, ResourceId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizeRequest {
    pub actor: ActorId,
    pub action: ActionName,
    pub resource: ResourceId,
    /// Extra attributes readable as `context.<name>`.
    #[serde(default)]
    pub context: AttributeBag,
    /// Evaluation time; the current time when absent.
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

impl AuthorizeRequest {
    pub fn new(
        actor: impl Into<ActorId>,
        action: ActionName,
        resource: impl Into<ResourceId>,
    ) -> Self {
        Self {
            actor: actor.into(),
            action,
            resource: resource.into(),
            context: AttributeBag::new(),
            at: None,
        }
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = Some(at);
        self
    }

    pub fn with_context(mut self, context: AttributeBag) -> Self {
        self.context = context;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    pub decision: Outcome,
    pub trace: Vec<TraceStep>,
    pub reason: String,
    pub deciding_policy: Option<PolicyId>,
    /// The JIT grant that turned a denial into a grant, if any.
    pub jit_grant: Option<GrantId>,
    pub evaluated_at: DateTime<Utc>,
}

impl AuthorizeResponse {
    pub fn is_granted(&self) -> bool {
        self.decision == Outcome::Granted
    }
}

impl From<Decision> for AuthorizeResponse {
    fn from(decision: Decision) -> Self {
        Self {
            decision: decision.outcome,
            trace: decision.trace,
            reason: decision.reason,
            deciding_policy: decision.deciding_policy,
            jit_grant: None,
            evaluated_at: decision.evaluated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JitGrantRequest {
    pub event: FleetEvent,
    pub permissions: Vec<ActionName>,
    /// Falls back to the configured default duration.
    #[serde(default)]
    pub duration_hours: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantDecisionRequest {
    pub status: GrantDecision,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_request_from_json() {
        let request: AuthorizeRequest = serde_json::from_str(
            r#"{
                "actor": "svc-routing",
                "action": "vehicle:update:load_balance",
                "resource": "veh-tipper-5",
                "context": {"shift": "night", "priority": 2}
            }"#,
        )
        .unwrap();
        assert_eq!(request.actor, ActorId::from("svc-routing"));
        assert_eq!(request.context.len(), 2);
        assert!(request.at.is_none());
    }

    #[test]
    fn test_malformed_action_is_rejected() {
        let result: Result<AuthorizeRequest, _> = serde_json::from_str(
            r#"{"actor": "a", "action": "vehicle::read", "resource": "r"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_grant_decision_body() {
        let body: GrantDecisionRequest = serde_json::from_str(r#"{"status": "approved"}"#).unwrap();
        assert_eq!(body.status, GrantDecision::Approved);
        assert!(serde_json::from_str::<GrantDecisionRequest>(r#"{"status": "maybe"}"#).is_err());
    }
}
