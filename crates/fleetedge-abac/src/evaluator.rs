//! ABAC policy evaluation engine.
//!
//! Evaluates every policy, in declaration order, against one request and
//! records a [`TraceStep`] per policy. Matched deny policies override matched
//! allow policies; when nothing matches, access is denied.
//!
//! Evaluation is a pure function of its inputs: it reads no clock, performs no
//! I/O, and never fails. Missing attributes and runtime type mismatches make a
//! condition fail and are explained in the step's reason.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use fleetedge_types::{ActionName, AttributeValue, PolicyId};
use serde::{Deserialize, Serialize};

use crate::attributes::{Actor, AttributeSnapshot, RequestContext, resolve};
use crate::policy::{Condition, Effect, Operator, Policy};

/// Reason given for a policy whose action list does not cover the request.
pub const NOT_COVERED_REASON: &str = "action not covered by this policy";

/// Reason given when no policy covers the requested action.
pub const NO_APPLICABLE_POLICY_REASON: &str = "no applicable policy";

// ============================================================================
// Decision
// ============================================================================

/// Outcome of one policy within a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    Granted,
    Denied,
    NotApplicable,
}

/// The evaluation record for a single policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    pub policy_id: PolicyId,
    pub policy_name: String,
    pub status: TraceStatus,
    /// Human-readable explanation of the status.
    pub reason: String,
    /// Set on the step that decided a denial.
    #[serde(default)]
    pub is_critical: bool,
}

/// Final access outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Granted,
    Denied,
}

/// What decided the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionCause {
    /// An allow policy matched and no deny did.
    MatchedAllow,
    /// A deny policy matched. Never lifted by a JIT grant.
    MatchedDeny,
    /// An applicable allow policy had a failing condition.
    FailedAllow,
    /// No policy covered the action.
    NoApplicablePolicy,
}

/// The result of evaluating an access request against a policy set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub outcome: Outcome,
    pub cause: DecisionCause,
    /// One step per policy, in declaration order.
    pub trace: Vec<TraceStep>,
    /// Explanation drawn from the deciding policy.
    pub reason: String,
    /// The policy that decided the outcome, or `None` for the implicit deny.
    pub deciding_policy: Option<PolicyId>,
    /// The context time the request was evaluated at.
    pub evaluated_at: DateTime<Utc>,
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        self.outcome == Outcome::Granted
    }

    /// Returns true if a matched deny policy decided the outcome.
    pub fn is_explicit_deny(&self) -> bool {
        self.cause == DecisionCause::MatchedDeny
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Evaluates a request against `policies`.
///
/// For each policy, in order:
/// - action not listed: `not_applicable`
/// - all conditions hold: `granted` (allow) or critical `denied` (deny)
/// - a condition fails: `denied` (allow) or `not_applicable` (deny)
///
/// The final outcome is deny if any deny policy matched, else granted if any
/// allow policy matched, else denied. A denial caused by a failed allow policy
/// marks that policy's step critical.
///
/// # Postcondition
///
/// `decision.trace.len() == policies.len()`.
pub fn evaluate(
    policies: &[Policy],
    actor: &Actor,
    action: &ActionName,
    resource: &AttributeSnapshot,
    context: &RequestContext,
) -> Decision {
    let mut trace = Vec::with_capacity(policies.len());
    let mut first_deny: Option<usize> = None;
    let mut first_allow: Option<usize> = None;
    let mut first_failed_allow: Option<usize> = None;

    for (index, policy) in policies.iter().enumerate() {
        let step = if !policy.applies_to(action) {
            step_for(policy, TraceStatus::NotApplicable, NOT_COVERED_REASON.to_string())
        } else {
            match first_failure(policy, actor, resource, context) {
                None => match policy.effect {
                    Effect::Allow => {
                        first_allow.get_or_insert(index);
                        step_for(policy, TraceStatus::Granted, satisfied_reason(policy))
                    }
                    Effect::Deny => {
                        first_deny.get_or_insert(index);
                        let mut step = step_for(
                            policy,
                            TraceStatus::Denied,
                            format!("deny matched: {}", satisfied_reason(policy)),
                        );
                        step.is_critical = true;
                        step
                    }
                },
                Some(failure) => match policy.effect {
                    Effect::Allow => {
                        first_failed_allow.get_or_insert(index);
                        step_for(policy, TraceStatus::Denied, failure)
                    }
                    Effect::Deny => step_for(
                        policy,
                        TraceStatus::NotApplicable,
                        format!("deny not triggered: {failure}"),
                    ),
                },
            }
        };
        trace.push(step);
    }

    let (outcome, cause, deciding) = if let Some(i) = first_deny {
        (Outcome::Denied, DecisionCause::MatchedDeny, Some(i))
    } else if let Some(i) = first_allow {
        (Outcome::Granted, DecisionCause::MatchedAllow, Some(i))
    } else if let Some(i) = first_failed_allow {
        trace[i].is_critical = true;
        (Outcome::Denied, DecisionCause::FailedAllow, Some(i))
    } else {
        (Outcome::Denied, DecisionCause::NoApplicablePolicy, None)
    };

    let (reason, deciding_policy) = match deciding {
        Some(i) => (
            format!("{}: {}", trace[i].policy_name, trace[i].reason),
            Some(trace[i].policy_id.clone()),
        ),
        None => (NO_APPLICABLE_POLICY_REASON.to_string(), None),
    };

    Decision {
        outcome,
        cause,
        trace,
        reason,
        deciding_policy,
        evaluated_at: context.at,
    }
}

// ============================================================================
// Condition Evaluation
// ============================================================================

fn step_for(policy: &Policy, status: TraceStatus, reason: String) -> TraceStep {
    TraceStep {
        policy_id: policy.id.clone(),
        policy_name: policy.name.clone(),
        status,
        reason,
        is_critical: false,
    }
}

fn satisfied_reason(policy: &Policy) -> String {
    match policy.conditions.len() {
        0 => "action covered; policy has no conditions".to_string(),
        1 => "1 condition satisfied".to_string(),
        n => format!("all {n} conditions satisfied"),
    }
}

/// Returns the reason the first failing condition failed, or `None` if all hold.
fn first_failure(
    policy: &Policy,
    actor: &Actor,
    resource: &AttributeSnapshot,
    context: &RequestContext,
) -> Option<String> {
    policy
        .conditions
        .iter()
        .find_map(|condition| check_condition(condition, actor, resource, context).err())
}

/// Evaluates one condition. `Err` carries the trace reason.
fn check_condition(
    condition: &Condition,
    actor: &Actor,
    resource: &AttributeSnapshot,
    context: &RequestContext,
) -> Result<(), String> {
    let Some(actual) = resolve(&condition.attribute, actor, resource, context) else {
        return Err(format!(
            "condition '{condition}' not met: attribute '{}' is missing",
            condition.attribute
        ));
    };
    let actual = actual.as_ref();

    let mismatch = || {
        format!(
            "condition '{condition}' not met: type mismatch, '{}' is {}",
            condition.attribute,
            actual.kind()
        )
    };

    let holds = match condition.operator {
        Operator::Equals => values_equal(actual, &condition.value).ok_or_else(mismatch)?,
        Operator::NotEquals => !values_equal(actual, &condition.value).ok_or_else(mismatch)?,
        Operator::GreaterThan => {
            compare_numbers(actual, &condition.value).ok_or_else(mismatch)? == Ordering::Greater
        }
        Operator::LessThan => {
            compare_numbers(actual, &condition.value).ok_or_else(mismatch)? == Ordering::Less
        }
        Operator::In => {
            let AttributeValue::List(candidates) = &condition.value else {
                return Err(mismatch());
            };
            let mut comparable = false;
            let mut found = false;
            for candidate in candidates {
                if let Some(equal) = values_equal(actual, candidate) {
                    comparable = true;
                    if equal {
                        found = true;
                        break;
                    }
                }
            }
            if !comparable {
                return Err(mismatch());
            }
            found
        }
    };

    if holds {
        Ok(())
    } else {
        Err(format!("condition '{condition}' not met (actual: {actual})"))
    }
}

/// Equality between two scalar values, or `None` if they are not comparable.
///
/// Two integers compare exactly; an integer and a float compare as floats.
/// Other kinds must match exactly.
#[allow(clippy::float_cmp)]
fn values_equal(actual: &AttributeValue, expected: &AttributeValue) -> Option<bool> {
    if !actual.is_scalar() || !expected.is_scalar() {
        return None;
    }
    if !actual.kind().is_comparable_with(expected.kind()) {
        return None;
    }
    if let (AttributeValue::Integer(a), AttributeValue::Integer(b)) = (actual, expected) {
        return Some(a == b);
    }
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => Some(a == b),
        _ => Some(actual == expected),
    }
}

/// Numeric ordering, or `None` if either side is not a number (or is NaN).
fn compare_numbers(actual: &AttributeValue, expected: &AttributeValue) -> Option<Ordering> {
    if let (AttributeValue::Integer(a), AttributeValue::Integer(b)) = (actual, expected) {
        return Some(a.cmp(b));
    }
    let a = actual.as_f64()?;
    let b = expected.as_f64()?;
    a.partial_cmp(&b)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{ActorKind, Resource, ResourceKind};
    use chrono::TimeZone;
    use fleetedge_types::AttributeBag;
    use test_case::test_case;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, 9, 30, 0).unwrap()
    }

    fn insurance_partner() -> Actor {
        Actor::new(
            "svc-allianz",
            ActorKind::ServicePrincipal,
            "Allianz Insurance Partner",
        )
    }

    fn routing_service() -> Actor {
        Actor::new("svc-routing", ActorKind::ServicePrincipal, "Routing Service")
    }

    fn ev_cargo_van() -> AttributeSnapshot {
        Resource::new("veh-ev-cargo-12", ResourceKind::Vehicle)
            .with_attribute("insurancePolicyId", "ALLIANZ-9983-B")
            .with_attribute("onActiveRoute", true)
            .with_attribute("status", "Available")
            .with_attribute("mileage", 48_210_i64)
            .with_attribute("odometerId", 9_007_199_254_740_993_i64)
            .snapshot(now())
    }

    fn tipper_truck() -> AttributeSnapshot {
        Resource::new("veh-tipper-5", ResourceKind::Vehicle)
            .with_attribute("status", "In_Maintenance")
            .with_attribute("mileage", 260_400_i64)
            .snapshot(now())
    }

    fn action(raw: &'static str) -> ActionName {
        ActionName::from_static(raw)
    }

    fn ctx() -> RequestContext {
        RequestContext::at(now())
    }

    #[test]
    fn test_insurance_partner_reads_telemetry() {
        let policies = Policy::fleet_policies();
        let decision = evaluate(
            &policies,
            &insurance_partner(),
            &action("vehicle:read:telemetry"),
            &ev_cargo_van(),
            &ctx(),
        );

        assert_eq!(decision.outcome, Outcome::Granted);
        assert_eq!(
            decision.deciding_policy.as_ref().map(PolicyId::as_str),
            Some("pol-insurance-telemetry")
        );
        assert_eq!(decision.trace.len(), policies.len());
        assert_eq!(decision.trace[0].status, TraceStatus::Granted);
        assert_eq!(decision.trace[0].reason, "all 2 conditions satisfied");
        for step in &decision.trace[1..] {
            assert_eq!(step.status, TraceStatus::NotApplicable, "{}", step.policy_name);
            assert_eq!(step.reason, NOT_COVERED_REASON);
            assert!(!step.is_critical);
        }
        assert!(decision.reason.starts_with("Insurance Partner Telemetry Access"));
    }

    #[test]
    fn test_tipper_in_maintenance_denied_critical() {
        let policies = Policy::fleet_policies();
        let decision = evaluate(
            &policies,
            &routing_service(),
            &action("vehicle:update:load_balance"),
            &tipper_truck(),
            &ctx(),
        );

        assert_eq!(decision.outcome, Outcome::Denied);
        assert_eq!(
            decision.deciding_policy.as_ref().map(PolicyId::as_str),
            Some("pol-tipper-access")
        );

        let step = &decision.trace[1];
        assert_eq!(step.policy_name, "Tipper Access Policy");
        assert_eq!(step.status, TraceStatus::Denied);
        assert!(step.is_critical);
        assert!(step.reason.contains("status equals Available"));
        assert!(step.reason.contains("In_Maintenance"));
        assert_eq!(decision.cause, DecisionCause::FailedAllow);
        assert!(!decision.is_explicit_deny());
    }

    #[test]
    fn test_deny_overrides_allow() {
        // The route dispatch allow matches, but the mileage hold deny also matches.
        let policies = Policy::fleet_policies();
        let decision = evaluate(
            &policies,
            &routing_service(),
            &action("vehicle:update:route"),
            &tipper_truck(),
            &ctx(),
        );

        assert_eq!(decision.outcome, Outcome::Denied);
        assert_eq!(
            decision.deciding_policy.as_ref().map(PolicyId::as_str),
            Some("pol-high-mileage-hold")
        );
        assert_eq!(decision.cause, DecisionCause::MatchedDeny);
        assert!(decision.is_explicit_deny());

        let dispatch = decision
            .trace
            .iter()
            .find(|s| s.policy_id.as_str() == "pol-route-dispatch")
            .unwrap();
        assert_eq!(dispatch.status, TraceStatus::Granted);
        assert!(!dispatch.is_critical);
    }

    #[test]
    fn test_deny_not_triggered_is_not_applicable() {
        let policies = Policy::fleet_policies();
        let decision = evaluate(
            &policies,
            &routing_service(),
            &action("vehicle:update:route"),
            &ev_cargo_van(),
            &ctx(),
        );

        assert_eq!(decision.outcome, Outcome::Granted);
        let hold = decision
            .trace
            .iter()
            .find(|s| s.policy_id.as_str() == "pol-high-mileage-hold")
            .unwrap();
        assert_eq!(hold.status, TraceStatus::NotApplicable);
        assert!(hold.reason.starts_with("deny not triggered"));
    }

    #[test]
    fn test_default_deny_without_applicable_policy() {
        let policies = Policy::fleet_policies();
        let decision = evaluate(
            &policies,
            &routing_service(),
            &action("vehicle:delete:record"),
            &ev_cargo_van(),
            &ctx(),
        );

        assert_eq!(decision.outcome, Outcome::Denied);
        assert_eq!(decision.reason, NO_APPLICABLE_POLICY_REASON);
        assert_eq!(decision.cause, DecisionCause::NoApplicablePolicy);
        assert!(decision.deciding_policy.is_none());
        assert!(decision.trace.iter().all(|s| !s.is_critical));
    }

    #[test]
    fn test_empty_policy_set_denies() {
        let decision = evaluate(
            &[],
            &routing_service(),
            &action("vehicle:read:telemetry"),
            &ev_cargo_van(),
            &ctx(),
        );
        assert_eq!(decision.outcome, Outcome::Denied);
        assert!(decision.trace.is_empty());
    }

    #[test]
    fn test_missing_attribute_fails_condition() {
        let policy = Policy::new("pol-loc", "Depot Only", Effect::Allow)
            .with_action(action("vehicle:read:telemetry"))
            .with_condition(Condition::equals("location", "Depot North"));

        let decision = evaluate(
            &[policy],
            &insurance_partner(),
            &action("vehicle:read:telemetry"),
            &ev_cargo_van(),
            &ctx(),
        );

        assert_eq!(decision.outcome, Outcome::Denied);
        assert!(decision.trace[0].reason.contains("attribute 'location' is missing"));
        assert!(decision.trace[0].is_critical);
    }

    #[test]
    fn test_runtime_type_mismatch_fails_condition() {
        let policy = Policy::new("pol-m", "Mileage", Effect::Allow)
            .with_action(action("vehicle:read:telemetry"))
            .with_condition(Condition::greater_than("status", 10_i64));

        let decision = evaluate(
            &[policy],
            &insurance_partner(),
            &action("vehicle:read:telemetry"),
            &ev_cargo_van(),
            &ctx(),
        );

        assert_eq!(decision.outcome, Outcome::Denied);
        assert!(decision.trace[0].reason.contains("type mismatch"));
    }

    #[test]
    fn test_context_attributes_participate() {
        let policy = Policy::new("pol-region", "Northern Region", Effect::Allow)
            .with_action(action("vehicle:read:telemetry"))
            .with_condition(Condition::equals("context.region", "north"));

        let granted = evaluate(
            std::slice::from_ref(&policy),
            &insurance_partner(),
            &action("vehicle:read:telemetry"),
            &ev_cargo_van(),
            &ctx().with_attribute("region", "north"),
        );
        assert!(granted.is_granted());

        let denied = evaluate(
            &[policy],
            &insurance_partner(),
            &action("vehicle:read:telemetry"),
            &ev_cargo_van(),
            &ctx().with_attribute("region", "south"),
        );
        assert!(!denied.is_granted());
    }

    #[test_case(Condition::equals("mileage", 48_210_i64), true ; "equals integer")]
    #[test_case(Condition::equals("mileage", 48_210.0), true ; "equals integer as float")]
    #[test_case(Condition::not_equals("status", "In_Maintenance"), true ; "not equals text")]
    #[test_case(Condition::not_equals("status", "Available"), false ; "not equals same text")]
    #[test_case(Condition::greater_than("mileage", 40_000_i64), true ; "greater than")]
    #[test_case(Condition::greater_than("mileage", 48_210_i64), false ; "greater than is strict")]
    #[test_case(Condition::less_than("mileage", 50_000.5), true ; "less than float")]
    #[test_case(Condition::is_in("status", vec!["Available", "Reserved"]), true ; "in list")]
    #[test_case(Condition::is_in("status", vec!["Reserved"]), false ; "not in list")]
    #[test_case(Condition::equals("onActiveRoute", false), false ; "equals bool")]
    #[test_case(Condition::equals("odometerId", 9_007_199_254_740_992_i64), false ; "equals large integers exactly")]
    #[test_case(Condition::greater_than("odometerId", 9_007_199_254_740_992_i64), true ; "orders large integers exactly")]
    #[test_case(Condition::not_equals("onActiveRoute", "true"), false ; "bool vs text is mismatch")]
    fn test_operator_semantics(condition: Condition, expected: bool) {
        let policy = Policy::new("pol-op", "Operator", Effect::Allow)
            .with_action(action("vehicle:read:telemetry"))
            .with_condition(condition);

        let decision = evaluate(
            &[policy],
            &insurance_partner(),
            &action("vehicle:read:telemetry"),
            &ev_cargo_van(),
            &ctx(),
        );
        assert_eq!(decision.is_granted(), expected, "{}", decision.reason);
    }

    #[test]
    fn test_policy_without_conditions_matches() {
        let policy = Policy::new("pol-open", "Open Read", Effect::Allow)
            .with_action(action("vehicle:read:telemetry"));
        let decision = evaluate(
            &[policy],
            &routing_service(),
            &action("vehicle:read:telemetry"),
            &ev_cargo_van(),
            &ctx(),
        );
        assert!(decision.is_granted());
        assert_eq!(decision.trace[0].reason, "action covered; policy has no conditions");
    }

    #[test]
    fn test_first_matching_allow_supplies_reason() {
        let first = Policy::new("pol-a", "First", Effect::Allow)
            .with_action(action("vehicle:read:telemetry"));
        let second = Policy::new("pol-b", "Second", Effect::Allow)
            .with_action(action("vehicle:read:telemetry"));

        let decision = evaluate(
            &[first, second],
            &routing_service(),
            &action("vehicle:read:telemetry"),
            &ev_cargo_van(),
            &ctx(),
        );
        assert_eq!(
            decision.deciding_policy.as_ref().map(PolicyId::as_str),
            Some("pol-a")
        );
    }

    #[test]
    fn test_evaluated_at_comes_from_context() {
        let decision = evaluate(
            &Policy::fleet_policies(),
            &routing_service(),
            &action("vehicle:read:telemetry"),
            &ev_cargo_van(),
            &ctx(),
        );
        assert_eq!(decision.evaluated_at, now());
    }

    #[test]
    fn test_snapshot_not_live_resource() {
        let mut tipper = Resource::new("veh-tipper-5", ResourceKind::Vehicle)
            .with_attribute("status", "Available");
        let snapshot = tipper.snapshot(now());
        tipper.apply_telemetry(&AttributeBag::new().with("status", "In_Maintenance"));

        let decision = evaluate(
            &[Policy::tipper_access()],
            &routing_service(),
            &action("vehicle:update:load_balance"),
            &snapshot,
            &ctx(),
        );
        assert!(decision.is_granted());
    }
}
