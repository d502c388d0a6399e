//! `fleetedge authorize`

use std::path::PathBuf;

use anyhow::{Context, Result};
use fleetedge::{AuthorizeRequest, AuthorizeResponse, Authorizer, FleetEdgeConfig, fixtures};

use crate::Format;
use crate::style::{SemanticStyle, outcome_label, print_labeled, print_spacer, trace_table};

pub struct Args {
    pub actor: String,
    pub action: String,
    pub resource: String,
    pub policies: Option<PathBuf>,
    pub context: Vec<String>,
    pub at: Option<String>,
}

/// Builds an authorizer over the demo fleet, optionally replacing its policies.
pub(crate) fn demo_authorizer(
    config: &FleetEdgeConfig,
    policies: Option<&PathBuf>,
) -> Result<Authorizer> {
    let mut config = config.clone();
    if let Some(path) = policies {
        config.store.policy_file = Some(path.clone());
    }
    let fixture = fixtures::fleet_demo().context("Failed to build fleet fixture")?;
    Authorizer::from_config(&config, fixture).context("Failed to initialize authorizer")
}

pub fn run(config: &FleetEdgeConfig, args: &Args, format: Format) -> Result<()> {
    let authorizer = demo_authorizer(config, args.policies.as_ref())?;

    let mut request = AuthorizeRequest::new(
        args.actor.as_str(),
        super::parse_action(&args.action)?,
        args.resource.as_str(),
    )
    .with_context(super::parse_context(&args.context)?);
    if let Some(at) = &args.at {
        request = request.at(super::parse_time(at)?);
    }

    let response = authorizer
        .authorize(&request)
        .context("Authorization request rejected")?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        Format::Text => print_response(&request, &response),
    }
    Ok(())
}

pub(crate) fn print_response(request: &AuthorizeRequest, response: &AuthorizeResponse) {
    println!(
        "{} {} {} {}",
        request.actor.code(),
        request.action.code(),
        request.resource.code(),
        outcome_label(response.decision)
    );
    println!("{}", trace_table(&response.trace));
    print_labeled("Reason", &response.reason);
    print_labeled(
        "Deciding policy",
        response
            .deciding_policy
            .as_ref()
            .map_or("none (default deny)", |p| p.as_str()),
    );
    if let Some(grant) = response.jit_grant {
        print_labeled("JIT grant", &grant.to_string());
    }
    print_labeled("Evaluated at", &response.evaluated_at.to_rfc3339());
    print_spacer();
}
