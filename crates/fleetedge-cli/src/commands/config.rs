//! `fleetedge config show`

use anyhow::Result;
use fleetedge::FleetEdgeConfig;

use crate::ConfigFormat;
use crate::style::{SemanticStyle, print_labeled, print_spacer};

pub fn show(config: &FleetEdgeConfig, format: ConfigFormat) -> Result<()> {
    match format {
        ConfigFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        ConfigFormat::Toml => println!("{}", toml::to_string_pretty(config)?),
        ConfigFormat::Text => {
            println!("{}", "FleetEdge Configuration".header());
            print_spacer();

            println!("Evaluator:");
            print_labeled(
                "Enforce action catalog",
                &config.evaluator.enforce_action_catalog.to_string(),
            );

            println!("Store:");
            print_labeled("History depth", &config.store.history_depth.to_string());
            print_labeled(
                "Policy file",
                &config
                    .store
                    .policy_file
                    .as_ref()
                    .map_or("built-in presets".to_string(), |p| p.display().to_string()),
            );

            println!("JIT:");
            print_labeled("Max duration (h)", &config.jit.max_duration_hours.to_string());
            print_labeled(
                "Default duration (h)",
                &config.jit.default_duration_hours.to_string(),
            );
            print_labeled("Sweep interval (s)", &config.jit.sweep_interval_secs.to_string());

            println!("Logging:");
            print_labeled("Level", &config.logging.level);
        }
    }
    Ok(())
}
