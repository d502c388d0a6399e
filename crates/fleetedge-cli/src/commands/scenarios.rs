//! `fleetedge scenarios`

use anyhow::{Result, bail};
use chrono::Utc;
use fleetedge::FleetEdgeConfig;
use fleetedge::fixtures::fleet_scenarios;
use serde_json::json;

use crate::Format;
use crate::style::{SemanticStyle, outcome_label, print_success, rows_table};

use super::authorize::{demo_authorizer, print_response};

pub fn run(config: &FleetEdgeConfig, traces: bool, format: Format) -> Result<()> {
    let authorizer = demo_authorizer(config, None)?;
    let now = Utc::now();

    let mut rows = Vec::new();
    let mut report = Vec::new();
    let mut failures = 0usize;

    for scenario in fleet_scenarios(now) {
        let response = authorizer.authorize(&scenario.request)?;
        let deciding = response.deciding_policy.as_ref().map(|p| p.as_str());
        let passed = response.decision == scenario.expected && deciding == scenario.deciding_policy;
        if !passed {
            failures += 1;
        }

        if traces && format == Format::Text {
            println!("{}", scenario.name.header());
            print_response(&scenario.request, &response);
        }

        rows.push(vec![
            scenario.name.to_string(),
            outcome_label(response.decision),
            deciding.unwrap_or("-").to_string(),
            if passed { "ok".granted() } else { "MISMATCH".denied() },
        ]);
        report.push(json!({
            "name": scenario.name,
            "passed": passed,
            "response": response,
        }));
    }

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => {
            println!("{}", rows_table(&["Scenario", "Decision", "Deciding policy", "Check"], &rows));
            if failures == 0 {
                print_success(&format!("{} scenarios decided as expected", rows.len()));
            }
        }
    }

    if failures > 0 {
        bail!("{failures} scenario(s) did not decide as expected");
    }
    Ok(())
}
