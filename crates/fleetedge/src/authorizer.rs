//! The authorization entry point.
//!
//! [`Authorizer`] ties the policy store, the directory of actors and
//! resources, and the JIT manager together behind `RwLock`s so it can be
//! shared across threads (and with the [`ExpirySweeper`](crate::ExpirySweeper)).
//!
//! Request flow:
//! 1. Resolve actor and resource, snapshot the resource at the request time.
//! 2. Reject actions missing from the catalog (when enforced).
//! 3. Evaluate against an immutable snapshot of the policies.
//! 4. If the denial did not come from a matched deny policy, look for an
//!    active JIT grant covering the actor, action and resource.

use std::fs;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use fleetedge_abac::{
    AttributeSchema, Outcome, Policy, PolicyDiff, PolicySet, PolicyStore, RequestContext,
    StoredPolicy, evaluate,
};
use fleetedge_config::FleetEdgeConfig;
use fleetedge_jit::{AuditEntry, AuditQuery, FleetEvent, JitGrant, JitManager};
use fleetedge_types::{ActionName, ActorId, AttributeBag, GrantId, PolicyId, ResourceId};
use tracing::{debug, info, warn};

use crate::api::{AuthorizeRequest, AuthorizeResponse, GrantDecisionRequest, JitGrantRequest};
use crate::catalog::ActionCatalog;
use crate::directory::Directory;
use crate::error::{AuthorizeError, Result};
use crate::fixtures::FleetFixture;

pub struct Authorizer {
    store: RwLock<PolicyStore>,
    directory: RwLock<Directory>,
    jit: RwLock<JitManager>,
    catalog: RwLock<ActionCatalog>,
    enforce_catalog: bool,
    default_grant_hours: u32,
}

impl Authorizer {
    pub fn new(
        store: PolicyStore,
        directory: Directory,
        jit: JitManager,
        catalog: ActionCatalog,
    ) -> Self {
        Self {
            store: RwLock::new(store),
            directory: RwLock::new(directory),
            jit: RwLock::new(jit),
            catalog: RwLock::new(catalog),
            enforce_catalog: true,
            default_grant_hours: 2,
        }
    }

    /// Whether unknown actions are rejected before evaluation (default: true).
    pub fn with_catalog_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_catalog = enforce;
        self
    }

    /// Duration used for JIT requests that do not name one.
    pub fn with_default_grant_hours(mut self, hours: u32) -> Self {
        self.default_grant_hours = hours;
        self
    }

    /// Builds an authorizer over `fixture`'s actors and resources.
    ///
    /// Policies come from `store.policy_file` when configured, otherwise
    /// from the fixture.
    pub fn from_config(config: &FleetEdgeConfig, fixture: FleetFixture) -> Result<Self> {
        let mut store = PolicyStore::new()
            .with_schema(AttributeSchema::fleet())
            .with_history_depth(config.store.history_depth);

        match &config.store.policy_file {
            Some(path) => {
                let count = store.load_json(&read_file(path)?)?;
                info!(path = %path.display(), count, "Policies loaded from file");
            }
            None => {
                for policy in fixture.policies.iter().cloned() {
                    store.put(policy)?;
                }
            }
        }

        let mut catalog = fixture.catalog.clone();
        catalog.extend(&ActionCatalog::from_policies(&store.snapshot()));

        Ok(Self::new(
            store,
            fixture.directory(),
            JitManager::with_max_duration(config.jit.max_duration_hours),
            catalog,
        )
        .with_catalog_enforcement(config.evaluator.enforce_action_catalog)
        .with_default_grant_hours(config.jit.default_duration_hours))
    }

    // ------------------------------------------------------------------------
    // Authorization
    // ------------------------------------------------------------------------

    /// Decides an access request.
    pub fn authorize(&self, request: &AuthorizeRequest) -> Result<AuthorizeResponse> {
        let at = request.at.unwrap_or_else(Utc::now);

        let (actor, snapshot) = {
            let directory = self.directory()?;
            let actor = directory.actor(&request.actor)?.clone();
            (actor, directory.snapshot(&request.resource, at)?)
        };

        if self.enforce_catalog && !self.catalog()?.contains(&request.action) {
            warn!(actor = %request.actor, action = %request.action, "Unknown action rejected");
            return Err(AuthorizeError::UnknownAction(request.action.clone()));
        }

        let policies = self.store()?.snapshot();
        let context = RequestContext {
            at,
            attributes: request.context.clone(),
        };
        let decision = evaluate(&policies, &actor, &request.action, &snapshot, &context);
        let explicit_deny = decision.is_explicit_deny();
        let mut response = AuthorizeResponse::from(decision);

        if !response.is_granted() && !explicit_deny {
            let jit = self.jit()?;
            if let Some(grant) =
                jit.covering_grant(&request.actor, &request.action, &request.resource, at)
            {
                upgrade_with_grant(&mut response, grant);
            }
        }

        info!(
            actor = %request.actor,
            action = %request.action,
            resource = %request.resource,
            revision = snapshot.revision,
            outcome = ?response.decision,
            jit_grant = ?response.jit_grant,
            "Authorization decided"
        );

        Ok(response)
    }

    // ------------------------------------------------------------------------
    // Policy store
    // ------------------------------------------------------------------------

    /// Publishes a policy, returning the version it replaced.
    ///
    /// The policy's actions join the catalog.
    pub fn put_policy(&self, policy: Policy) -> Result<Option<StoredPolicy>> {
        let actions = policy.actions.clone();
        let previous = self.store_mut()?.put(policy)?;
        let mut catalog = self.catalog_mut()?;
        for action in actions {
            catalog.insert(action);
        }
        Ok(previous)
    }

    pub fn delete_policy(&self, id: &PolicyId) -> Result<StoredPolicy> {
        Ok(self.store_mut()?.delete(id)?)
    }

    /// Validates and diffs a policy against the stored version without
    /// committing it.
    pub fn preview_policy(&self, policy: &Policy) -> Result<PolicyDiff> {
        Ok(self.store()?.preview(policy)?)
    }

    /// Bulk-loads a JSON array of policies. All or nothing.
    pub fn load_policies_json(&self, json: &str) -> Result<usize> {
        let count = self.store_mut()?.load_json(json)?;
        let snapshot = self.store()?.snapshot();
        self.catalog_mut()?.extend(&ActionCatalog::from_policies(&snapshot));
        Ok(count)
    }

    pub fn policy(&self, id: &PolicyId) -> Result<Option<StoredPolicy>> {
        Ok(self.store()?.get(id).cloned())
    }

    /// Previous versions of a policy, oldest first.
    pub fn policy_history(&self, id: &PolicyId) -> Result<Vec<StoredPolicy>> {
        Ok(self.store()?.history(id).cloned().collect())
    }

    pub fn policies(&self) -> Result<PolicySet> {
        Ok(self.store()?.snapshot())
    }

    pub fn catalog_snapshot(&self) -> Result<ActionCatalog> {
        Ok(self.catalog()?.clone())
    }

    // ------------------------------------------------------------------------
    // Directory
    // ------------------------------------------------------------------------

    /// Merges a telemetry update into a resource, returning its new revision.
    pub fn apply_telemetry(&self, resource: &ResourceId, update: &AttributeBag) -> Result<u64> {
        self.directory_mut()?.apply_telemetry(resource, update)
    }

    pub fn directory_snapshot(&self) -> Result<Directory> {
        Ok(self.directory()?.clone())
    }

    // ------------------------------------------------------------------------
    // Just-in-time grants
    // ------------------------------------------------------------------------

    pub fn request_grant(&self, request: &JitGrantRequest) -> Result<GrantId> {
        self.request_grant_at(request, Utc::now())
    }

    /// Opens a pending JIT grant.
    ///
    /// The event's actor and resource must be known, and every requested
    /// permission must be in the catalog when the catalog is enforced.
    pub fn request_grant_at(
        &self,
        request: &JitGrantRequest,
        now: DateTime<Utc>,
    ) -> Result<GrantId> {
        self.check_event(&request.event)?;
        if self.enforce_catalog {
            let catalog = self.catalog()?;
            if let Some(unknown) = request.permissions.iter().find(|a| !catalog.contains(a)) {
                return Err(AuthorizeError::UnknownAction(unknown.clone()));
            }
        }

        let hours = request.duration_hours.unwrap_or(self.default_grant_hours);
        Ok(self.jit_mut()?.request_at(
            request.event.clone(),
            request.permissions.iter().cloned(),
            hours,
            now,
        )?)
    }

    pub fn decide_grant(
        &self,
        id: GrantId,
        body: &GrantDecisionRequest,
        decided_by: &str,
    ) -> Result<JitGrant> {
        self.decide_grant_at(id, body, decided_by, Utc::now())
    }

    pub fn decide_grant_at(
        &self,
        id: GrantId,
        body: &GrantDecisionRequest,
        decided_by: &str,
        now: DateTime<Utc>,
    ) -> Result<JitGrant> {
        Ok(self
            .jit_mut()?
            .decide_at(id, body.status, decided_by, now)?
            .clone())
    }

    /// Materialises every expiry due at `now`.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Result<Vec<GrantId>> {
        let expired = self.jit_mut()?.sweep(now);
        if !expired.is_empty() {
            debug!(count = expired.len(), "JIT grants expired");
        }
        Ok(expired)
    }

    pub fn grant(&self, id: GrantId) -> Result<Option<JitGrant>> {
        Ok(self.jit()?.get(id).cloned())
    }

    /// The grant that can lift a denial for `actor` on `action` against
    /// `resource` at `at`.
    pub fn covering_grant(
        &self,
        actor: &ActorId,
        action: &ActionName,
        resource: &ResourceId,
        at: DateTime<Utc>,
    ) -> Result<Option<JitGrant>> {
        Ok(self.jit()?.covering_grant(actor, action, resource, at).cloned())
    }

    pub fn audit_log(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
        Ok(self.jit()?.audit().query(query).into_iter().cloned().collect())
    }

    pub fn export_audit_json(&self, query: &AuditQuery) -> Result<String> {
        Ok(self.jit()?.audit().export_json(query)?)
    }

    fn check_event(&self, event: &FleetEvent) -> Result<()> {
        let directory = self.directory()?;
        directory.actor(&event.actor)?;
        if let Some(resource) = &event.resource {
            directory.resource(resource)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Locks
    // ------------------------------------------------------------------------

    fn store(&self) -> Result<RwLockReadGuard<'_, PolicyStore>> {
        self.store
            .read()
            .map_err(|_| AuthorizeError::internal("policy store lock poisoned"))
    }

    fn store_mut(&self) -> Result<RwLockWriteGuard<'_, PolicyStore>> {
        self.store
            .write()
            .map_err(|_| AuthorizeError::internal("policy store lock poisoned"))
    }

    fn directory(&self) -> Result<RwLockReadGuard<'_, Directory>> {
        self.directory
            .read()
            .map_err(|_| AuthorizeError::internal("directory lock poisoned"))
    }

    fn directory_mut(&self) -> Result<RwLockWriteGuard<'_, Directory>> {
        self.directory
            .write()
            .map_err(|_| AuthorizeError::internal("directory lock poisoned"))
    }

    fn jit(&self) -> Result<RwLockReadGuard<'_, JitManager>> {
        self.jit
            .read()
            .map_err(|_| AuthorizeError::internal("JIT manager lock poisoned"))
    }

    fn jit_mut(&self) -> Result<RwLockWriteGuard<'_, JitManager>> {
        self.jit
            .write()
            .map_err(|_| AuthorizeError::internal("JIT manager lock poisoned"))
    }

    fn catalog(&self) -> Result<RwLockReadGuard<'_, ActionCatalog>> {
        self.catalog
            .read()
            .map_err(|_| AuthorizeError::internal("action catalog lock poisoned"))
    }

    fn catalog_mut(&self) -> Result<RwLockWriteGuard<'_, ActionCatalog>> {
        self.catalog
            .write()
            .map_err(|_| AuthorizeError::internal("action catalog lock poisoned"))
    }
}

/// Turns a non-explicit denial into a grant backed by `grant`.
///
/// The trace still shows the static evaluation, but no step is critical any
/// more since nothing blocked the request.
fn upgrade_with_grant(response: &mut AuthorizeResponse, grant: &JitGrant) {
    response.decision = Outcome::Granted;
    response.jit_grant = Some(grant.id);
    response.deciding_policy = None;
    response.reason = format!(
        "granted by JIT grant {} ({} {})",
        grant.id, grant.event.kind, grant.event.id
    );
    for step in &mut response.trace {
        step.is_critical = false;
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| AuthorizeError::Io {
        path: path.to_path_buf(),
        source,
    })
}
