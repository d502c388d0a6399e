//! Field-level policy diffs, shown before an edit is committed.

use std::fmt::{self, Display};

use fleetedge_types::{ActionName, PolicyId};
use serde::{Deserialize, Serialize};

use crate::policy::{Condition, Effect, Policy};

/// One field-level change between two versions of a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum PolicyChange {
    Created,
    NameChanged { from: String, to: String },
    DescriptionChanged { from: String, to: String },
    EffectChanged { from: Effect, to: Effect },
    ActionAdded { action: ActionName },
    ActionRemoved { action: ActionName },
    ConditionAdded { condition: Condition },
    ConditionRemoved { condition: Condition },
}

impl Display for PolicyChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("+ new policy"),
            Self::NameChanged { from, to } => write!(f, "~ name: '{from}' -> '{to}'"),
            Self::DescriptionChanged { from, to } => {
                write!(f, "~ description: '{from}' -> '{to}'")
            }
            Self::EffectChanged { from, to } => write!(f, "~ effect: {from} -> {to}"),
            Self::ActionAdded { action } => write!(f, "+ action {action}"),
            Self::ActionRemoved { action } => write!(f, "- action {action}"),
            Self::ConditionAdded { condition } => write!(f, "+ condition {condition}"),
            Self::ConditionRemoved { condition } => write!(f, "- condition {condition}"),
        }
    }
}

/// The changes an edit would make to a stored policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDiff {
    pub policy_id: PolicyId,
    /// Version the diff was computed against (`None` for a new policy).
    pub base_version: Option<u32>,
    pub changes: Vec<PolicyChange>,
}

impl PolicyDiff {
    /// Diffs `new` against `old`. A missing `old` yields a single `Created`.
    ///
    /// Action and condition changes are reported as set differences, so
    /// reordering alone produces no change.
    pub fn between(old: Option<&Policy>, new: &Policy, base_version: Option<u32>) -> Self {
        let Some(old) = old else {
            return Self {
                policy_id: new.id.clone(),
                base_version,
                changes: vec![PolicyChange::Created],
            };
        };

        let mut changes = Vec::new();

        if old.name != new.name {
            changes.push(PolicyChange::NameChanged {
                from: old.name.clone(),
                to: new.name.clone(),
            });
        }
        if old.description != new.description {
            changes.push(PolicyChange::DescriptionChanged {
                from: old.description.clone(),
                to: new.description.clone(),
            });
        }
        if old.effect != new.effect {
            changes.push(PolicyChange::EffectChanged {
                from: old.effect,
                to: new.effect,
            });
        }

        for action in old.actions.iter().filter(|a| !new.actions.contains(a)) {
            changes.push(PolicyChange::ActionRemoved {
                action: action.clone(),
            });
        }
        for action in new.actions.iter().filter(|a| !old.actions.contains(a)) {
            changes.push(PolicyChange::ActionAdded {
                action: action.clone(),
            });
        }

        for condition in old.conditions.iter().filter(|c| !new.conditions.contains(c)) {
            changes.push(PolicyChange::ConditionRemoved {
                condition: condition.clone(),
            });
        }
        for condition in new.conditions.iter().filter(|c| !old.conditions.contains(c)) {
            changes.push(PolicyChange::ConditionAdded {
                condition: condition.clone(),
            });
        }

        Self {
            policy_id: new.id.clone(),
            base_version,
            changes,
        }
    }

    /// Returns true if committing would change nothing.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl Display for PolicyDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base_version {
            Some(v) => writeln!(f, "policy {} (against v{v})", self.policy_id)?,
            None => writeln!(f, "policy {} (new)", self.policy_id)?,
        }
        if self.changes.is_empty() {
            return writeln!(f, "  (no changes)");
        }
        for change in &self.changes {
            writeln!(f, "  {change}")?;
        }
        Ok(())
    }
}
