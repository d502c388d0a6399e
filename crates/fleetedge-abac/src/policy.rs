//! ABAC policy definitions.
//!
//! A policy covers a list of actions and carries conditions that must all
//! hold (AND) for the policy to match. Policies are evaluated in declaration
//! order; see [`crate::evaluator`] for how matches combine into a decision.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use fleetedge_types::{ActionName, AttributeKind, AttributeValue, PolicyId};
use serde::{Deserialize, Serialize};

use crate::attributes::schema_key;
use crate::error::{PolicyError, Result};

// ============================================================================
// Effect
// ============================================================================

/// The effect of a matching policy: allow or deny the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Grant access.
    Allow,
    /// Deny access.
    Deny,
}

impl Default for Effect {
    /// Defaults to `Deny` (safe default: deny unless explicitly allowed).
    fn default() -> Self {
        Self::Deny
    }
}

impl Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("allow"),
            Self::Deny => f.write_str("deny"),
        }
    }
}

// ============================================================================
// Condition
// ============================================================================

/// Comparison operator of a condition.
///
/// Deserialization rejects any other operator name, so an unknown operator
/// surfaces as a malformed policy when it is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    In,
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::In => "in",
        };
        f.write_str(name)
    }
}

/// A single `(attribute, operator, value)` test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Attribute name. May be prefixed with `actor.`, `resource.` or `context.`.
    pub attribute: String,
    pub operator: Operator,
    pub value: AttributeValue,
}

impl Condition {
    pub fn new(
        attribute: impl Into<String>,
        operator: Operator,
        value: impl Into<AttributeValue>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn equals(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::new(attribute, Operator::Equals, value)
    }

    pub fn not_equals(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::new(attribute, Operator::NotEquals, value)
    }

    pub fn greater_than(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::new(attribute, Operator::GreaterThan, value)
    }

    pub fn less_than(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::new(attribute, Operator::LessThan, value)
    }

    pub fn is_in(attribute: impl Into<String>, values: impl Into<AttributeValue>) -> Self {
        Self::new(attribute, Operator::In, values)
    }

    /// Checks operator/value compatibility, and the attribute type if the
    /// schema declares one.
    fn validate(&self, policy: &PolicyId, schema: Option<&AttributeSchema>) -> Result<()> {
        if self.attribute.trim().is_empty() {
            return Err(PolicyError::malformed(
                policy,
                "condition attribute name must not be empty",
            ));
        }

        let type_error = |reason: String| PolicyError::TypeError {
            policy: policy.to_string(),
            attribute: self.attribute.clone(),
            reason,
        };

        match self.operator {
            Operator::GreaterThan | Operator::LessThan => {
                if !self.value.kind().is_numeric() {
                    return Err(type_error(format!(
                        "{} requires a numeric value, got {}",
                        self.operator,
                        self.value.kind()
                    )));
                }
            }
            Operator::In => match &self.value {
                AttributeValue::List(items) if items.is_empty() => {
                    return Err(type_error("in requires a non-empty list".to_string()));
                }
                AttributeValue::List(items) => {
                    if items.iter().any(|v| !v.is_scalar()) {
                        return Err(type_error("in list must contain only scalars".to_string()));
                    }
                }
                other => {
                    return Err(type_error(format!(
                        "in requires a list value, got {}",
                        other.kind()
                    )));
                }
            },
            Operator::Equals | Operator::NotEquals => {
                if !self.value.is_scalar() {
                    return Err(type_error(format!(
                        "{} requires a scalar value, got list",
                        self.operator
                    )));
                }
            }
        }

        let Some(declared) = schema.and_then(|s| s.kind_of(schema_key(&self.attribute))) else {
            return Ok(());
        };

        let compatible = match (&self.operator, &self.value) {
            (Operator::GreaterThan | Operator::LessThan, _) => declared.is_numeric(),
            (Operator::In, AttributeValue::List(items)) => items
                .iter()
                .all(|v| declared.is_comparable_with(v.kind())),
            (_, value) => declared.is_comparable_with(value.kind()),
        };

        if compatible {
            Ok(())
        } else {
            Err(type_error(format!(
                "attribute is declared as {declared}, incompatible with {} {}",
                self.operator, self.value
            )))
        }
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.attribute, self.operator, self.value)
    }
}

// ============================================================================
// Attribute Schema
// ============================================================================

/// Declared attribute types, used to reject ill-typed conditions at write time.
///
/// Attributes not listed in the schema are unchecked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSchema(BTreeMap<String, AttributeKind>);

impl AttributeSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an attribute type (builder pattern).
    pub fn declare(mut self, name: impl Into<String>, kind: AttributeKind) -> Self {
        self.0.insert(name.into(), kind);
        self
    }

    pub fn kind_of(&self, name: &str) -> Option<AttributeKind> {
        self.0.get(name).copied()
    }

    /// Attribute types used by the FleetEdge vehicle and cargo resources.
    pub fn fleet() -> Self {
        Self::new()
            .declare("status", AttributeKind::Text)
            .declare("location", AttributeKind::Text)
            .declare("cargoType", AttributeKind::Text)
            .declare("insurancePolicyId", AttributeKind::Text)
            .declare("onActiveRoute", AttributeKind::Bool)
            .declare("mileage", AttributeKind::Integer)
            .declare("actor.kind", AttributeKind::Text)
            .declare("actor.id", AttributeKind::Text)
    }
}

// ============================================================================
// Policy
// ============================================================================

/// An Attribute-Based Access Control policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    /// Human-readable name shown in decision traces.
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub effect: Effect,
    /// Actions this policy applies to (exact string membership).
    pub actions: Vec<ActionName>,
    /// All conditions must hold for the policy to match.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Policy {
    /// Creates a policy with no actions or conditions.
    pub fn new(id: impl Into<PolicyId>, name: impl Into<String>, effect: Effect) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            effect,
            actions: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a covered action (builder pattern).
    pub fn with_action(mut self, action: ActionName) -> Self {
        self.actions.push(action);
        self
    }

    /// Adds a condition (builder pattern).
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Returns whether `action` appears in this policy's action list.
    pub fn applies_to(&self, action: &ActionName) -> bool {
        self.actions.contains(action)
    }

    /// Validates the policy for storage.
    ///
    /// Checks that the id and name are present, the action list is non-empty,
    /// and every condition is well-typed (against `schema` when given).
    pub fn validate(&self, schema: Option<&AttributeSchema>) -> Result<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(PolicyError::malformed("<unnamed>", "policy id must not be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(PolicyError::malformed(&self.id, "policy name must not be empty"));
        }
        if self.actions.is_empty() {
            return Err(PolicyError::malformed(
                &self.id,
                "policy must cover at least one action",
            ));
        }
        for condition in &self.conditions {
            condition.validate(&self.id, schema)?;
        }
        Ok(())
    }

    // ========================================================================
    // Fleet presets
    // ========================================================================

    /// Insurance partners may read telemetry of vehicles covered by their
    /// policy while the vehicle is on an active route.
    pub fn insurance_partner_telemetry() -> Self {
        Self::new(
            "pol-insurance-telemetry",
            "Insurance Partner Telemetry Access",
            Effect::Allow,
        )
        .with_description("Allianz may stream telemetry for insured vehicles on active routes")
        .with_action(ActionName::from_static("vehicle:read:telemetry"))
        .with_condition(Condition::equals("insurancePolicyId", "ALLIANZ-9983-B"))
        .with_condition(Condition::equals("onActiveRoute", true))
    }

    /// Tipper trucks may be re-balanced only while available.
    pub fn tipper_access() -> Self {
        Self::new("pol-tipper-access", "Tipper Access Policy", Effect::Allow)
            .with_description("Load balancing is only permitted on available tippers")
            .with_action(ActionName::from_static("vehicle:update:load_balance"))
            .with_condition(Condition::equals("status", "Available"))
    }

    /// Maintenance logs are written by humans only.
    pub fn maintenance_log_write() -> Self {
        Self::new(
            "pol-maintenance-write",
            "Maintenance Log Write Access",
            Effect::Allow,
        )
        .with_description("Technicians sign maintenance entries personally")
        .with_action(ActionName::from_static("maintenance:write:log"))
        .with_condition(Condition::equals("actor.kind", "human_user"))
    }

    /// Hazardous cargo manifests are frozen for everyone.
    pub fn hazardous_cargo_lockdown() -> Self {
        Self::new(
            "pol-hazmat-lockdown",
            "Hazardous Cargo Lockdown",
            Effect::Deny,
        )
        .with_description("Manifests for hazardous cargo cannot be edited or removed")
        .with_action(ActionName::from_static("cargo:update:manifest"))
        .with_action(ActionName::from_static("cargo:delete:manifest"))
        .with_condition(Condition::is_in(
            "cargoType",
            vec!["hazmat", "explosives"],
        ))
    }

    /// Dispatchers edit cargo manifests.
    pub fn cargo_manifest_editing() -> Self {
        Self::new(
            "pol-cargo-manifest-edit",
            "Cargo Manifest Editing",
            Effect::Allow,
        )
        .with_action(ActionName::from_static("cargo:update:manifest"))
        .with_condition(Condition::equals("actor.kind", "human_user"))
    }

    /// Vehicles past their service mileage may not be routed.
    pub fn high_mileage_hold() -> Self {
        Self::new(
            "pol-high-mileage-hold",
            "High Mileage Service Hold",
            Effect::Deny,
        )
        .with_action(ActionName::from_static("vehicle:update:route"))
        .with_condition(Condition::greater_than("mileage", 250_000_i64))
    }

    /// Routing services dispatch vehicles.
    pub fn route_dispatch() -> Self {
        Self::new("pol-route-dispatch", "Route Dispatch", Effect::Allow)
            .with_action(ActionName::from_static("vehicle:update:route"))
            .with_condition(Condition::equals("actor.kind", "service_principal"))
    }

    /// All fleet presets, in the order they are declared to the store.
    pub fn fleet_policies() -> Vec<Self> {
        vec![
            Self::insurance_partner_telemetry(),
            Self::tipper_access(),
            Self::maintenance_log_write(),
            Self::hazardous_cargo_lockdown(),
            Self::cargo_manifest_editing(),
            Self::high_mileage_hold(),
            Self::route_dispatch(),
        ]
    }
}

// ============================================================================
// Tests
// ============================================================================
