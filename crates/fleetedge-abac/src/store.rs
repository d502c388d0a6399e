//! Versioned policy store.
//!
//! Holds policies in declaration order. Every write is validated first and
//! returns the version it replaced, so callers can diff before committing.
//! Readers take an immutable [`PolicySet`] snapshot and evaluate against it
//! without holding any lock on the store.

use std::collections::{HashMap, VecDeque};
use std::ops::Deref;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleetedge_types::PolicyId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::diff::PolicyDiff;
use crate::error::{PolicyError, Result};
use crate::policy::{AttributeSchema, Policy};

/// Default number of previous versions retained per policy.
pub const DEFAULT_HISTORY_DEPTH: usize = 16;

/// A policy together with its version metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPolicy {
    pub policy: Policy,
    /// Starts at 1; increments on every `put` for the same id, including a
    /// re-creation after `delete`.
    pub version: u32,
    pub committed_at: DateTime<Utc>,
}

/// An immutable, cheaply clonable view of the store's policies.
#[derive(Debug, Clone, Default)]
pub struct PolicySet(Arc<[Policy]>);

impl PolicySet {
    pub fn new(policies: Vec<Policy>) -> Self {
        Self(policies.into())
    }
}

impl Deref for PolicySet {
    type Target = [Policy];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// CRUD over policies with validation and version history.
///
/// Single writer at a time (wrap in a lock to share); last write wins.
#[derive(Debug)]
pub struct PolicyStore {
    /// Current versions, in declaration order.
    entries: Vec<StoredPolicy>,
    /// Previous versions per policy, oldest first.
    history: HashMap<PolicyId, VecDeque<StoredPolicy>>,
    /// Last version of each deleted policy.
    retired: HashMap<PolicyId, u32>,
    schema: Option<AttributeSchema>,
    history_depth: usize,
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyStore {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            history: HashMap::new(),
            retired: HashMap::new(),
            schema: None,
            history_depth: DEFAULT_HISTORY_DEPTH,
        }
    }

    /// Validates conditions against an attribute schema on every write.
    pub fn with_schema(mut self, schema: AttributeSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Sets how many previous versions are retained per policy.
    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history_depth = depth;
        self
    }

    pub fn schema(&self) -> Option<&AttributeSchema> {
        self.schema.as_ref()
    }

    pub fn get(&self, id: &PolicyId) -> Option<&StoredPolicy> {
        self.position(id).map(|i| &self.entries[i])
    }

    /// All current policies, in declaration order.
    pub fn list(&self) -> &[StoredPolicy] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts or replaces a policy, returning the replaced version.
    pub fn put(&mut self, policy: Policy) -> Result<Option<StoredPolicy>> {
        self.put_at(policy, Utc::now())
    }

    /// Inserts or replaces a policy with an explicit commit time.
    ///
    /// A replaced policy keeps its position in declaration order.
    pub fn put_at(
        &mut self,
        policy: Policy,
        committed_at: DateTime<Utc>,
    ) -> Result<Option<StoredPolicy>> {
        if let Err(e) = policy.validate(self.schema.as_ref()) {
            warn!(policy = %policy.id, error = %e, "Policy rejected");
            return Err(e);
        }

        match self.position(&policy.id) {
            Some(index) => {
                let version = self.entries[index].version + 1;
                let id = policy.id.clone();
                let previous = std::mem::replace(
                    &mut self.entries[index],
                    StoredPolicy {
                        policy,
                        version,
                        committed_at,
                    },
                );
                self.remember(id.clone(), previous.clone());
                info!(policy = %id, version, "Policy updated");
                Ok(Some(previous))
            }
            None => {
                let version = self.retired.remove(&policy.id).map_or(1, |last| last + 1);
                info!(policy = %policy.id, version, "Policy created");
                self.entries.push(StoredPolicy {
                    policy,
                    version,
                    committed_at,
                });
                Ok(None)
            }
        }
    }

    /// Removes a policy, returning its last version.
    ///
    /// History is kept so a deleted policy can still be inspected.
    pub fn delete(&mut self, id: &PolicyId) -> Result<StoredPolicy> {
        let index = self
            .position(id)
            .ok_or_else(|| PolicyError::PolicyNotFound(id.clone()))?;
        let removed = self.entries.remove(index);
        self.retired.insert(id.clone(), removed.version);
        self.remember(id.clone(), removed.clone());
        info!(policy = %id, version = removed.version, "Policy deleted");
        Ok(removed)
    }

    /// Validates `policy` and diffs it against the stored version without
    /// committing.
    pub fn preview(&self, policy: &Policy) -> Result<PolicyDiff> {
        policy.validate(self.schema.as_ref())?;
        let current = self.get(&policy.id);
        Ok(PolicyDiff::between(
            current.map(|s| &s.policy),
            policy,
            current.map(|s| s.version),
        ))
    }

    /// Previous versions of a policy, oldest first.
    pub fn history(&self, id: &PolicyId) -> impl Iterator<Item = &StoredPolicy> {
        self.history.get(id).into_iter().flatten()
    }

    /// An immutable snapshot of the current policies for evaluation.
    pub fn snapshot(&self) -> PolicySet {
        PolicySet::new(self.entries.iter().map(|s| s.policy.clone()).collect())
    }

    /// Loads a JSON array of policies.
    ///
    /// All policies are parsed and validated before any is committed, so a
    /// single bad policy leaves the store unchanged. Returns how many policies
    /// were written.
    pub fn load_json(&mut self, json: &str) -> Result<usize> {
        let policies: Vec<Policy> = serde_json::from_str(json)
            .map_err(|e| PolicyError::malformed("<input>", e.to_string()))?;

        for policy in &policies {
            policy.validate(self.schema.as_ref())?;
        }

        let count = policies.len();
        let now = Utc::now();
        for policy in policies {
            self.put_at(policy, now)?;
        }
        debug!(count, "Policies loaded");
        Ok(count)
    }

    fn position(&self, id: &PolicyId) -> Option<usize> {
        self.entries.iter().position(|s| &s.policy.id == id)
    }

    fn remember(&mut self, id: PolicyId, previous: StoredPolicy) {
        if self.history_depth == 0 {
            return;
        }
        let versions = self.history.entry(id).or_default();
        versions.push_back(previous);
        while versions.len() > self.history_depth {
            versions.pop_front();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
