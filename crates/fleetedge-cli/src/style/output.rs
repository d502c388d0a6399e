//! One-line message helpers.

use fleetedge::Outcome;

use super::colors::SemanticStyle;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".granted(), msg);
}

pub fn print_labeled(key: &str, value: &str) {
    println!("  {}: {}", key.muted(), value);
}

pub fn print_spacer() {
    println!();
}

/// `GRANTED` / `DENIED`, colored.
pub fn outcome_label(outcome: Outcome) -> String {
    match outcome {
        Outcome::Granted => "GRANTED".granted(),
        Outcome::Denied => "DENIED".denied(),
    }
}
