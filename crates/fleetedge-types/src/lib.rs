//! # fleetedge-types: Core types for `FleetEdge`
//!
//! This crate contains shared types used across the `FleetEdge` access control
//! engine:
//! - Entity IDs ([`ActorId`], [`ResourceId`], [`PolicyId`], [`EventId`], [`GrantId`])
//! - RBAC registry IDs ([`ModuleId`], [`PermissionId`], [`RoleId`])
//! - Namespaced actions ([`ActionName`])
//! - Attribute values and bags ([`AttributeValue`], [`AttributeKind`], [`AttributeBag`])

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Errors
// ============================================================================

/// Errors produced when parsing core types from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// The action string is not a valid namespaced action.
    #[error("invalid action name '{value}': {reason}")]
    InvalidAction { value: String, reason: &'static str },
}

// ============================================================================
// Entity IDs - string-backed, compared by value
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true if the identifier is the empty string.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identity performing an action (human user or service principal).
    ActorId
);
string_id!(
    /// Target entity of an action (vehicle, maintenance log, cargo manifest).
    ResourceId
);
string_id!(
    /// Identifier of an ABAC policy in the policy store.
    PolicyId
);
string_id!(
    /// Identifier of a fleet event (breakdown, route deviation, ...).
    EventId
);
string_id!(
    /// Identifier of a portal module in the RBAC registry.
    ModuleId
);
string_id!(
    /// Identifier of a permission in the RBAC registry.
    PermissionId
);
string_id!(
    /// Identifier of a role in the RBAC registry.
    RoleId
);

/// Unique identifier for a just-in-time access grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantId(Uuid);

impl GrantId {
    /// Generates a fresh random grant id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for GrantId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for GrantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ============================================================================
// ActionName
// ============================================================================

/// A namespaced action such as `vehicle:update:load_balance`.
///
/// Segments are separated by `:` and must be non-empty. Whitespace is not
/// allowed anywhere. Two actions match only when their strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActionName(String);

impl ActionName {
    /// Parses and validates an action name.
    pub fn parse(value: impl Into<String>) -> Result<Self, TypesError> {
        let value = value.into();

        if value.is_empty() {
            return Err(TypesError::InvalidAction {
                value,
                reason: "action must not be empty",
            });
        }
        if value.chars().any(char::is_whitespace) {
            return Err(TypesError::InvalidAction {
                value,
                reason: "action must not contain whitespace",
            });
        }
        if value.split(':').any(str::is_empty) {
            return Err(TypesError::InvalidAction {
                value,
                reason: "action segments must not be empty",
            });
        }

        Ok(Self(value))
    }

    /// Builds an action from a compile-time literal.
    ///
    /// # Panics
    ///
    /// Panics if the literal is not a valid action name.
    pub fn from_static(value: &'static str) -> Self {
        match Self::parse(value) {
            Ok(action) => action,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the leading namespace segment (`vehicle` for `vehicle:read:telemetry`).
    pub fn namespace(&self) -> &str {
        self.0.split(':').next().unwrap_or_default()
    }
}

impl Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ActionName {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ActionName {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ActionName> for String {
    fn from(value: ActionName) -> Self {
        value.0
    }
}

// ============================================================================
// Attribute values
// ============================================================================

/// The runtime type of an [`AttributeValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Bool,
    Integer,
    Float,
    Text,
    List,
}

impl AttributeKind {
    /// Integers and floats compare with each other; nothing else does.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    /// Returns true if values of these two kinds can be compared for equality.
    pub fn is_comparable_with(self, other: Self) -> bool {
        self == other || (self.is_numeric() && other.is_numeric())
    }
}

impl Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
            Self::List => "list",
        };
        f.write_str(name)
    }
}

/// A single attribute value in a resource, actor, or context bag.
///
/// Serialized untagged, so JSON literals map directly: `true`, `42`, `1.5`,
/// `"In_Maintenance"`, `["a", "b"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Bool(_) => AttributeKind::Bool,
            Self::Integer(_) => AttributeKind::Integer,
            Self::Float(_) => AttributeKind::Float,
            Self::Text(_) => AttributeKind::Text,
            Self::List(_) => AttributeKind::List,
        }
    }

    /// Numeric view of the value, if it is an integer or float.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::List(_))
    }

    /// Parses a loosely-typed literal (as typed on a command line).
    ///
    /// `true`/`false` become booleans, integers and floats are recognised,
    /// comma-separated values in brackets become lists, everything else is text.
    pub fn parse_literal(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(inner) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            let items = inner
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(Self::parse_literal)
                .collect();
            return Self::List(items);
        }
        match trimmed {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Self::Integer(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Self::Float(f);
        }
        Self::Text(trimmed.to_string())
    }
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<AttributeValue>> From<Vec<T>> for AttributeValue {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// AttributeBag
// ============================================================================

/// An open, ordered set of named attributes.
///
/// Backed by a `BTreeMap` so iteration (and therefore anything rendered from
/// it) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeBag(BTreeMap<String, AttributeValue>);

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute (builder pattern).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts an attribute, returning the previous value if present.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.0.remove(name)
    }

    /// Overwrites attributes in `self` with those in `other`.
    pub fn merge(&mut self, other: &AttributeBag) {
        for (name, value) in &other.0 {
            self.0.insert(name.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for AttributeBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("vehicle:read:telemetry" ; "three segments")]
    #[test_case("cargo:read" ; "two segments")]
    #[test_case("export" ; "single segment")]
    fn test_action_name_accepts(raw: &str) {
        let action = ActionName::parse(raw).expect("valid action");
        assert_eq!(action.as_str(), raw);
    }

    #[test_case("" ; "empty")]
    #[test_case("vehicle::read" ; "empty middle segment")]
    #[test_case("vehicle:read:" ; "trailing separator")]
    #[test_case("vehicle: read" ; "whitespace")]
    fn test_action_name_rejects(raw: &str) {
        assert!(ActionName::parse(raw).is_err());
    }

    #[test]
    fn test_action_namespace() {
        let action = ActionName::parse("vehicle:update:load_balance").unwrap();
        assert_eq!(action.namespace(), "vehicle");
    }

    #[test]
    fn test_action_name_deserialize_validates() {
        let ok: Result<ActionName, _> = serde_json::from_str("\"vehicle:read:telemetry\"");
        assert!(ok.is_ok());

        let bad: Result<ActionName, _> = serde_json::from_str("\"vehicle::\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_attribute_value_untagged_json() {
        let bag: AttributeBag = serde_json::from_str(
            r#"{"onActiveRoute": true, "mileage": 48210, "load": 0.75,
                "status": "In_Maintenance", "zones": ["north", "east"]}"#,
        )
        .unwrap();

        assert_eq!(bag.get("onActiveRoute"), Some(&AttributeValue::Bool(true)));
        assert_eq!(bag.get("mileage"), Some(&AttributeValue::Integer(48210)));
        assert_eq!(bag.get("load"), Some(&AttributeValue::Float(0.75)));
        assert_eq!(
            bag.get("status"),
            Some(&AttributeValue::Text("In_Maintenance".to_string()))
        );
        assert_eq!(bag.get("zones").map(AttributeValue::kind), Some(AttributeKind::List));
    }

    #[test_case("true", AttributeValue::Bool(true))]
    #[test_case("42", AttributeValue::Integer(42))]
    #[test_case("2.5", AttributeValue::Float(2.5))]
    #[test_case("Available", AttributeValue::Text("Available".to_string()))]
    fn test_parse_literal(raw: &str, expected: AttributeValue) {
        assert_eq!(AttributeValue::parse_literal(raw), expected);
    }

    #[test]
    fn test_parse_literal_list() {
        let value = AttributeValue::parse_literal("[north, 3]");
        assert_eq!(
            value,
            AttributeValue::List(vec![
                AttributeValue::Text("north".to_string()),
                AttributeValue::Integer(3),
            ])
        );
    }

    #[test]
    fn test_kind_comparability() {
        assert!(AttributeKind::Integer.is_comparable_with(AttributeKind::Float));
        assert!(AttributeKind::Text.is_comparable_with(AttributeKind::Text));
        assert!(!AttributeKind::Text.is_comparable_with(AttributeKind::Integer));
        assert!(!AttributeKind::Bool.is_comparable_with(AttributeKind::Integer));
    }

    #[test]
    fn test_bag_merge_overwrites() {
        let mut bag = AttributeBag::new()
            .with("status", "Available")
            .with("mileage", 100_i64);
        bag.merge(&AttributeBag::new().with("status", "In_Maintenance"));

        assert_eq!(bag.len(), 2);
        assert_eq!(bag.get("status"), Some(&AttributeValue::from("In_Maintenance")));
    }

    #[test]
    fn test_grant_id_parse_roundtrip() {
        let id = GrantId::generate();
        let parsed: GrantId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
