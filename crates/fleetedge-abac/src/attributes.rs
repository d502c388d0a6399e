//! Attribute sources for ABAC evaluation.
//!
//! Three attribute sources feed a condition:
//! - **Actor**: id, kind (human user or service principal), display name
//! - **Resource snapshot**: the resource's attribute bag frozen at one instant
//! - **Request context**: evaluation time plus caller-supplied attributes

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use fleetedge_types::{ActorId, AttributeBag, AttributeValue, ResourceId};
use serde::{Deserialize, Serialize};

// ============================================================================
// Actor
// ============================================================================

/// The kind of identity performing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// A person signed into the portal.
    HumanUser,
    /// An automated system (routing service, insurance partner integration).
    ServicePrincipal,
}

impl ActorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HumanUser => "human_user",
            Self::ServicePrincipal => "service_principal",
        }
    }
}

/// Identity performing an action.
///
/// Actors are immutable once issued; fields are only readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    id: ActorId,
    kind: ActorKind,
    display_name: String,
}

impl Actor {
    pub fn new(id: impl Into<ActorId>, kind: ActorKind, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            display_name: display_name.into(),
        }
    }

    pub fn id(&self) -> &ActorId {
        &self.id
    }

    pub fn kind(&self) -> ActorKind {
        self.kind
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Looks up an `actor.*` attribute by its unprefixed name.
    fn attribute(&self, name: &str) -> Option<AttributeValue> {
        match name {
            "id" => Some(AttributeValue::Text(self.id.to_string())),
            "kind" => Some(AttributeValue::Text(self.kind.as_str().to_string())),
            "display_name" => Some(AttributeValue::Text(self.display_name.clone())),
            _ => None,
        }
    }
}

// ============================================================================
// Resource
// ============================================================================

/// The kind of fleet entity being accessed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Vehicle,
    MaintenanceLog,
    CargoManifest,
    Other(String),
}

/// Target entity of an action, with an open attribute bag.
///
/// Fleet telemetry mutates the attribute bag over time. Every mutation bumps
/// `revision`, so a snapshot records exactly which state it observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub kind: ResourceKind,
    #[serde(default)]
    pub attributes: AttributeBag,
    #[serde(default)]
    pub revision: u64,
}

impl Resource {
    pub fn new(id: impl Into<ResourceId>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            attributes: AttributeBag::new(),
            revision: 0,
        }
    }

    /// Sets an attribute (builder pattern). Does not bump the revision.
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(name, value);
        self
    }

    /// Merges a telemetry update into the attribute bag.
    ///
    /// Returns the new revision.
    pub fn apply_telemetry(&mut self, update: &AttributeBag) -> u64 {
        self.attributes.merge(update);
        self.revision += 1;
        self.revision
    }

    /// Freezes the current attributes for one evaluation.
    pub fn snapshot(&self, taken_at: DateTime<Utc>) -> AttributeSnapshot {
        AttributeSnapshot {
            resource_id: self.id.clone(),
            resource_kind: self.kind.clone(),
            attributes: self.attributes.clone(),
            revision: self.revision,
            taken_at,
        }
    }
}

/// A point-in-time copy of one resource's attributes.
///
/// The evaluator only reads snapshots, so concurrent telemetry updates cannot
/// change attributes halfway through an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSnapshot {
    pub resource_id: ResourceId,
    pub resource_kind: ResourceKind,
    pub attributes: AttributeBag,
    pub revision: u64,
    pub taken_at: DateTime<Utc>,
}

// ============================================================================
// Request Context
// ============================================================================

/// Evaluation time plus caller-supplied context attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    pub at: DateTime<Utc>,
    #[serde(default)]
    pub attributes: AttributeBag,
}

impl RequestContext {
    pub fn at(at: DateTime<Utc>) -> Self {
        Self {
            at,
            attributes: AttributeBag::new(),
        }
    }

    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(name, value);
        self
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolves a condition's attribute name against the three sources.
///
/// - `actor.<name>` reads the actor
/// - `context.<name>` reads the context bag
/// - `resource.<name>` reads the resource snapshot
/// - a bare `<name>` reads the resource snapshot, then the context bag
pub(crate) fn resolve<'a>(
    name: &str,
    actor: &Actor,
    resource: &'a AttributeSnapshot,
    context: &'a RequestContext,
) -> Option<Cow<'a, AttributeValue>> {
    if let Some(field) = name.strip_prefix("actor.") {
        return actor.attribute(field).map(Cow::Owned);
    }
    if let Some(field) = name.strip_prefix("context.") {
        return context.attributes.get(field).map(Cow::Borrowed);
    }
    if let Some(field) = name.strip_prefix("resource.") {
        return resource.attributes.get(field).map(Cow::Borrowed);
    }
    resource
        .attributes
        .get(name)
        .or_else(|| context.attributes.get(name))
        .map(Cow::Borrowed)
}

/// Strips the `resource.` prefix so schema lookups see the bare name.
pub(crate) fn schema_key(name: &str) -> &str {
    name.strip_prefix("resource.").unwrap_or(name)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, 9, 30, 0).unwrap()
    }

    fn van() -> Resource {
        Resource::new("veh-ev-12", ResourceKind::Vehicle)
            .with_attribute("status", "Available")
            .with_attribute("onActiveRoute", true)
    }

    #[test]
    fn test_telemetry_bumps_revision() {
        let mut resource = van();
        assert_eq!(resource.revision, 0);

        let rev = resource.apply_telemetry(&AttributeBag::new().with("status", "In_Maintenance"));
        assert_eq!(rev, 1);
        assert_eq!(
            resource.attributes.get("status"),
            Some(&AttributeValue::from("In_Maintenance"))
        );
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_updates() {
        let mut resource = van();
        let snapshot = resource.snapshot(ts());

        resource.apply_telemetry(&AttributeBag::new().with("status", "In_Maintenance"));

        assert_eq!(snapshot.revision, 0);
        assert_eq!(
            snapshot.attributes.get("status"),
            Some(&AttributeValue::from("Available"))
        );
    }

    #[test]
    fn test_resolve_prefixes() {
        let actor = Actor::new("svc-routing", ActorKind::ServicePrincipal, "Routing Service");
        let snapshot = van().snapshot(ts());
        let context = RequestContext::at(ts())
            .with_attribute("region", "north")
            .with_attribute("status", "ignored");

        let kind = resolve("actor.kind", &actor, &snapshot, &context).unwrap();
        assert_eq!(kind.as_ref(), &AttributeValue::from("service_principal"));

        let region = resolve("context.region", &actor, &snapshot, &context).unwrap();
        assert_eq!(region.as_ref(), &AttributeValue::from("north"));

        // Bare names prefer the resource over the context.
        let status = resolve("status", &actor, &snapshot, &context).unwrap();
        assert_eq!(status.as_ref(), &AttributeValue::from("Available"));

        // Bare names fall back to the context.
        let region = resolve("region", &actor, &snapshot, &context).unwrap();
        assert_eq!(region.as_ref(), &AttributeValue::from("north"));

        assert!(resolve("resource.region", &actor, &snapshot, &context).is_none());
        assert!(resolve("actor.department", &actor, &snapshot, &context).is_none());
    }
}
