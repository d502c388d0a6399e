//! Known actors and resources.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use fleetedge_abac::{Actor, AttributeSnapshot, Resource};
use fleetedge_types::{ActorId, AttributeBag, ResourceId};
use tracing::debug;

use crate::error::{AuthorizeError, Result};

/// Actors and resources by id.
///
/// Resources change as telemetry arrives; evaluations read a
/// [`snapshot`](Directory::snapshot) so an update never lands mid-decision.
#[derive(Debug, Default, Clone)]
pub struct Directory {
    actors: HashMap<ActorId, Actor>,
    resources: HashMap<ResourceId, Resource>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an actor.
    pub fn add_actor(&mut self, actor: Actor) {
        self.actors.insert(actor.id().clone(), actor);
    }

    /// Adds or replaces a resource.
    pub fn add_resource(&mut self, resource: Resource) {
        self.resources.insert(resource.id.clone(), resource);
    }

    pub fn actor(&self, id: &ActorId) -> Result<&Actor> {
        self.actors
            .get(id)
            .ok_or_else(|| AuthorizeError::UnknownActor(id.clone()))
    }

    pub fn resource(&self, id: &ResourceId) -> Result<&Resource> {
        self.resources
            .get(id)
            .ok_or_else(|| AuthorizeError::UnknownResource(id.clone()))
    }

    /// Merges a telemetry update into a resource, returning its new revision.
    pub fn apply_telemetry(&mut self, id: &ResourceId, update: &AttributeBag) -> Result<u64> {
        let resource = self
            .resources
            .get_mut(id)
            .ok_or_else(|| AuthorizeError::UnknownResource(id.clone()))?;
        let revision = resource.apply_telemetry(update);
        debug!(resource = %id, revision, attributes = update.len(), "Telemetry applied");
        Ok(revision)
    }

    /// A consistent copy of a resource's attributes at `at`.
    pub fn snapshot(&self, id: &ResourceId, at: DateTime<Utc>) -> Result<AttributeSnapshot> {
        Ok(self.resource(id)?.snapshot(at))
    }

    /// Actors sorted by id.
    pub fn actors(&self) -> Vec<&Actor> {
        let mut actors: Vec<_> = self.actors.values().collect();
        actors.sort_by(|a, b| a.id().cmp(b.id()));
        actors
    }

    /// Resources sorted by id.
    pub fn resources(&self) -> Vec<&Resource> {
        let mut resources: Vec<_> = self.resources.values().collect();
        resources.sort_by(|a, b| a.id.cmp(&b.id));
        resources
    }
}
