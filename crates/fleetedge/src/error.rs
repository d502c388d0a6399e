use std::path::PathBuf;

use fleetedge_abac::PolicyError;
use fleetedge_config::ConfigError;
use fleetedge_jit::JitError;
use fleetedge_rbac::RbacError;
use fleetedge_types::{ActionName, ActorId, ResourceId};
use thiserror::Error;

/// Errors surfaced by the [`Authorizer`](crate::Authorizer).
///
/// Unknown actors, resources and actions are rejected before any policy is
/// evaluated. A missing attribute is never an error; it shows up as a failed
/// condition in the trace.
#[derive(Debug, Error)]
pub enum AuthorizeError {
    #[error("unknown actor: {0}")]
    UnknownActor(ActorId),

    #[error("unknown resource: {0}")]
    UnknownResource(ResourceId),

    #[error("unknown action: {0}")]
    UnknownAction(ActionName),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Jit(#[from] JitError),

    #[error(transparent)]
    Rbac(#[from] RbacError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthorizeError {
    pub(crate) fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AuthorizeError>;
