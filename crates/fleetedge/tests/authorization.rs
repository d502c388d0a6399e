//! End-to-end authorization tests over the demo fleet.

use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Duration, TimeZone, Utc};
use fleetedge::fixtures::{fleet_demo, fleet_scenarios};
use fleetedge::{
    ActionName, AttributeBag, AuditAction, AuditQuery, AuthorizeError, AuthorizeRequest,
    Authorizer, EventKind, FleetEdgeConfig, FleetEvent, GrantDecision, GrantDecisionRequest,
    GrantStatus, JitError, JitGrantRequest, Outcome, PolicyId, ResourceId, TraceStatus,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 6, 30, 0).unwrap()
}

fn authorizer() -> Authorizer {
    Authorizer::from_config(&FleetEdgeConfig::default(), fleet_demo().unwrap()).unwrap()
}

fn approved_grant(
    authorizer: &Authorizer,
    actor: &str,
    action: &'static str,
    resource: Option<&str>,
    hours: u32,
) -> fleetedge::GrantId {
    let mut event = FleetEvent::new("evt-route-dev-3", EventKind::RouteDeviation, actor, t0());
    if let Some(resource) = resource {
        event = event.with_resource(resource);
    }
    let id = authorizer
        .request_grant_at(
            &JitGrantRequest {
                event,
                permissions: vec![ActionName::from_static(action)],
                duration_hours: Some(hours),
            },
            t0(),
        )
        .unwrap();
    authorizer
        .decide_grant_at(
            id,
            &GrantDecisionRequest {
                status: GrantDecision::Approved,
            },
            "usr-supervisor",
            t0(),
        )
        .unwrap();
    id
}

// ============================================================================
// Static decisions
// ============================================================================

#[test]
fn every_demo_scenario_decides_as_expected() {
    let authorizer = authorizer();
    for scenario in fleet_scenarios(t0()) {
        let response = authorizer.authorize(&scenario.request).unwrap();
        assert_eq!(response.decision, scenario.expected, "{}", scenario.name);
        assert_eq!(response.evaluated_at, t0(), "{}", scenario.name);
    }
}

#[test]
fn routing_service_cannot_sign_maintenance_log() {
    let response = authorizer()
        .authorize(
            &AuthorizeRequest::new(
                "svc-routing",
                ActionName::from_static("maintenance:write:log"),
                "mlog-tipper-5",
            )
            .at(t0()),
        )
        .unwrap();

    assert_eq!(response.decision, Outcome::Denied);
    let step = response
        .trace
        .iter()
        .find(|s| s.policy_id.as_str() == "pol-maintenance-write")
        .unwrap();
    assert_eq!(step.status, TraceStatus::Denied);
    assert!(step.is_critical);
    assert!(response.reason.contains("actor.kind"));
}

#[test]
fn hazardous_manifest_is_locked_even_for_dispatch() {
    let response = authorizer()
        .authorize(
            &AuthorizeRequest::new(
                "usr-dispatch",
                ActionName::from_static("cargo:update:manifest"),
                "cm-4471",
            )
            .at(t0()),
        )
        .unwrap();

    assert_eq!(response.decision, Outcome::Denied);
    assert_eq!(
        response.deciding_policy,
        Some(PolicyId::from("pol-hazmat-lockdown"))
    );
    // The allow policy matched too; deny still wins.
    let edit = response
        .trace
        .iter()
        .find(|s| s.policy_id.as_str() == "pol-cargo-manifest-edit")
        .unwrap();
    assert_eq!(edit.status, TraceStatus::Granted);
    assert_eq!(response.trace.iter().filter(|s| s.is_critical).count(), 1);
}

#[test]
fn unknown_identifiers_are_rejected() {
    let authorizer = authorizer();
    let action = ActionName::from_static("vehicle:read:telemetry");

    assert!(matches!(
        authorizer.authorize(&AuthorizeRequest::new("svc-nobody", action.clone(), "veh-tipper-8")),
        Err(AuthorizeError::UnknownActor(_))
    ));
    assert!(matches!(
        authorizer.authorize(&AuthorizeRequest::new("svc-allianz", action, "veh-nowhere")),
        Err(AuthorizeError::UnknownResource(_))
    ));
    assert!(matches!(
        authorizer.authorize(&AuthorizeRequest::new(
            "svc-allianz",
            ActionName::from_static("vehicle:sell:fleet"),
            "veh-tipper-8"
        )),
        Err(AuthorizeError::UnknownAction(_))
    ));
}

// ============================================================================
// Just-in-time grants
// ============================================================================

#[test]
fn grant_is_active_only_inside_its_window() {
    let authorizer = authorizer();
    let id = approved_grant(
        &authorizer,
        "usr-dispatch",
        "vehicle:update:route",
        Some("veh-ev-van-12"),
        2,
    );
    let request = AuthorizeRequest::new(
        "usr-dispatch",
        ActionName::from_static("vehicle:update:route"),
        "veh-ev-van-12",
    );

    let inside = authorizer
        .authorize(&request.clone().at(t0() + Duration::hours(1)))
        .unwrap();
    assert_eq!(inside.decision, Outcome::Granted);
    assert_eq!(inside.jit_grant, Some(id));
    assert!(inside.reason.contains("JIT grant"));

    let at_boundary = authorizer
        .authorize(&request.clone().at(t0() + Duration::hours(2)))
        .unwrap();
    assert_eq!(at_boundary.decision, Outcome::Denied);

    let after = authorizer
        .authorize(&request.at(t0() + Duration::hours(3)))
        .unwrap();
    assert_eq!(after.decision, Outcome::Denied);
    assert!(after.jit_grant.is_none());

    // Lazily expired; the stored status changes only once swept.
    assert_eq!(
        authorizer.grant(id).unwrap().map(|g| g.status),
        Some(GrantStatus::Approved)
    );
    authorizer.sweep_expired(t0() + Duration::hours(3)).unwrap();
    assert_eq!(
        authorizer.grant(id).unwrap().map(|g| g.status),
        Some(GrantStatus::Expired)
    );
}

#[test]
fn explicit_deny_is_never_lifted_by_a_grant() {
    let authorizer = authorizer();
    approved_grant(&authorizer, "usr-dispatch", "cargo:update:manifest", None, 4);

    let response = authorizer
        .authorize(
            &AuthorizeRequest::new(
                "usr-dispatch",
                ActionName::from_static("cargo:update:manifest"),
                "cm-4471",
            )
            .at(t0() + Duration::minutes(30)),
        )
        .unwrap();
    assert_eq!(response.decision, Outcome::Denied);
    assert!(response.jit_grant.is_none());
}

#[test]
fn default_deny_can_be_lifted_by_a_grant() {
    let authorizer = authorizer();
    let id = approved_grant(&authorizer, "svc-routing", "vehicle:read:location", None, 1);

    let response = authorizer
        .authorize(
            &AuthorizeRequest::new(
                "svc-routing",
                ActionName::from_static("vehicle:read:location"),
                "veh-tipper-8",
            )
            .at(t0() + Duration::minutes(10)),
        )
        .unwrap();
    assert_eq!(response.decision, Outcome::Granted);
    assert_eq!(response.jit_grant, Some(id));
    assert!(response.deciding_policy.is_none());
}

#[test]
fn denied_grant_cannot_be_approved_later() {
    let authorizer = authorizer();
    let id = authorizer
        .request_grant_at(
            &JitGrantRequest {
                event: FleetEvent::new("evt-1", EventKind::Accident, "usr-dispatch", t0()),
                permissions: vec![ActionName::from_static("vehicle:update:route")],
                duration_hours: None,
            },
            t0(),
        )
        .unwrap();
    let deny = GrantDecisionRequest {
        status: GrantDecision::Denied,
    };
    let approve = GrantDecisionRequest {
        status: GrantDecision::Approved,
    };

    let denied = authorizer
        .decide_grant_at(id, &deny, "usr-supervisor", t0())
        .unwrap();
    assert_eq!(denied.status, GrantStatus::Denied);
    assert!(denied.expires_at.is_none());

    assert!(matches!(
        authorizer.decide_grant_at(id, &approve, "usr-supervisor", t0()),
        Err(AuthorizeError::Jit(JitError::GrantAlreadyDecided { .. }))
    ));

    let actions: Vec<_> = authorizer
        .audit_log(&AuditQuery::new().with_grant(id))
        .unwrap()
        .into_iter()
        .map(|e| e.decision)
        .collect();
    assert_eq!(actions, vec![AuditAction::Requested, AuditAction::Denied]);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn readers_see_whole_telemetry_updates() {
    let authorizer = Arc::new(authorizer());
    let tipper = ResourceId::from("veh-tipper-5");
    let request = AuthorizeRequest::new(
        "svc-routing",
        ActionName::from_static("vehicle:update:load_balance"),
        "veh-tipper-5",
    )
    .at(t0());

    let writer = {
        let authorizer = Arc::clone(&authorizer);
        thread::spawn(move || {
            for i in 0..50 {
                let status = if i % 2 == 0 { "Available" } else { "In_Maintenance" };
                authorizer
                    .apply_telemetry(&tipper, &AttributeBag::new().with("status", status))
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let authorizer = Arc::clone(&authorizer);
            let request = request.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let response = authorizer.authorize(&request).unwrap();
                    assert_eq!(response.trace.len(), 7);
                    let step = &response.trace[1];
                    match response.decision {
                        Outcome::Granted => assert_eq!(step.status, TraceStatus::Granted),
                        Outcome::Denied => assert_eq!(step.status, TraceStatus::Denied),
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    // 50 updates, the last one left the tipper in maintenance.
    assert!(!authorizer.authorize(&request).unwrap().is_granted());
}
