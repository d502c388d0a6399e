//! Tables built with comfy-table.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use fleetedge::{AuditEntry, TraceStatus, TraceStep};

use super::SemanticStyle;

fn base_table(columns: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header: Vec<Cell> = columns
        .iter()
        .map(|col| {
            if super::no_color() {
                Cell::new(col)
            } else {
                Cell::new(col).add_attribute(Attribute::Bold).fg(Color::Cyan)
            }
        })
        .collect();
    table.set_header(header);
    table
}

fn status_cell(status: TraceStatus) -> Cell {
    let (text, color) = match status {
        TraceStatus::Granted => ("granted", Color::Green),
        TraceStatus::Denied => ("denied", Color::Red),
        TraceStatus::NotApplicable => ("not_applicable", Color::DarkGrey),
    };
    if super::no_color() {
        Cell::new(text)
    } else {
        Cell::new(text).fg(color)
    }
}

/// One row per policy, in evaluation order.
pub fn trace_table(trace: &[TraceStep]) -> Table {
    let mut table = base_table(&["#", "Policy", "Status", "Reason", "Critical"]);
    for (i, step) in trace.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&step.policy_name),
            status_cell(step.status),
            Cell::new(&step.reason),
            Cell::new(if step.is_critical { "!".warning() } else { String::new() }),
        ]);
    }
    table
}

pub fn audit_table(entries: &[AuditEntry]) -> Table {
    let mut table = base_table(&["At", "Grant", "Actor", "Event", "Decision", "Recorded by"]);
    for entry in entries {
        table.add_row(vec![
            entry.at.to_rfc3339(),
            entry.grant_id.to_string(),
            entry.actor.to_string(),
            entry.event.to_string(),
            entry.decision.as_str().to_string(),
            entry.recorded_by.clone(),
        ]);
    }
    table
}

/// Generic string table.
pub fn rows_table(columns: &[&str], rows: &[Vec<String>]) -> Table {
    let mut table = base_table(columns);
    for row in rows {
        table.add_row(row);
    }
    table
}
