//! `fleetedge jit simulate`

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use fleetedge::{
    AuditQuery, AuthorizeRequest, EventKind, FleetEdgeConfig, FleetEvent, GrantDecision,
    GrantDecisionRequest, JitGrantRequest, ResourceId,
};

use crate::style::{
    SemanticStyle, audit_table, outcome_label, print_labeled, print_spacer, rows_table,
};

use super::authorize::demo_authorizer;

const SUPERVISOR: &str = "cli-supervisor";

pub struct SimulateArgs {
    pub actor: String,
    pub permissions: Vec<String>,
    pub resource: Option<String>,
    pub hours: u32,
    pub deny: bool,
    pub check_after_hours: Vec<u32>,
}

/// Walks one grant through request, decision, checks and expiry.
pub fn simulate(config: &FleetEdgeConfig, args: &SimulateArgs) -> Result<()> {
    let authorizer = demo_authorizer(config, None)?;
    let start = Utc::now();

    let permissions = args
        .permissions
        .iter()
        .map(|p| super::parse_action(p))
        .collect::<Result<Vec<_>>>()?;

    let mut event = FleetEvent::new(
        format!("evt-sim-{}", start.timestamp()),
        EventKind::Other("simulation".to_string()),
        args.actor.as_str(),
        start,
    )
    .with_description("fleetedge jit simulate");
    if let Some(resource) = &args.resource {
        event = event.with_resource(resource.as_str());
    }

    let id = authorizer
        .request_grant_at(
            &JitGrantRequest {
                event,
                permissions: permissions.clone(),
                duration_hours: Some(args.hours),
            },
            start,
        )
        .context("JIT request rejected")?;

    let decision = if args.deny {
        GrantDecision::Denied
    } else {
        GrantDecision::Approved
    };
    let grant = authorizer.decide_grant_at(
        id,
        &GrantDecisionRequest { status: decision },
        SUPERVISOR,
        start,
    )?;

    println!("{}", "JIT grant".header());
    print_labeled("Id", &grant.id.to_string());
    print_labeled("Actor", grant.actor.as_str());
    print_labeled("Status", &grant.status.to_string());
    print_labeled(
        "Window",
        &match (grant.created_at, grant.expires_at) {
            (Some(from), Some(to)) => format!("{} .. {}", from.to_rfc3339(), to.to_rfc3339()),
            _ => "none".to_string(),
        },
    );
    print_spacer();

    let mut rows = Vec::new();
    for hours in &args.check_after_hours {
        let at = start + Duration::hours(i64::from(*hours));
        for action in &permissions {
            let (covered, decision) = match &args.resource {
                Some(resource) => {
                    let resource = ResourceId::from(resource.as_str());
                    let covered = authorizer
                        .covering_grant(&grant.actor, action, &resource, at)?
                        .is_some();
                    let request =
                        AuthorizeRequest::new(grant.actor.clone(), action.clone(), resource).at(at);
                    (covered, outcome_label(authorizer.authorize(&request)?.decision))
                }
                // An event without a resource covers every resource.
                None => (grant.covers(action, at), "-".muted()),
            };
            rows.push(vec![
                format!("+{hours}h"),
                action.to_string(),
                if covered { "active".granted() } else { "inactive".muted() },
                decision,
            ]);
        }
    }
    println!("{}", rows_table(&["After", "Permission", "Grant", "Decision"], &rows));

    if let Some(last) = args.check_after_hours.iter().max() {
        let expired = authorizer.sweep_expired(start + Duration::hours(i64::from(*last)))?;
        if !expired.is_empty() {
            print_labeled("Expired by sweep", &expired.len().to_string());
        }
    }
    print_spacer();

    let entries = authorizer.audit_log(&AuditQuery::new().with_grant(id))?;
    println!("{}", "Audit log".header());
    println!("{}", audit_table(&entries));
    Ok(())
}
