use fleetedge_types::GrantId;
use thiserror::Error;

use crate::grant::GrantStatus;

#[derive(Debug, Error)]
pub enum JitError {
    #[error("JIT grant not found: {0}")]
    GrantNotFound(GrantId),

    #[error("JIT grant {id} already decided ({status})")]
    GrantAlreadyDecided { id: GrantId, status: GrantStatus },

    #[error("JIT grant {0} has expired")]
    GrantExpired(GrantId),

    #[error("Invalid JIT request: {0}")]
    InvalidRequest(String),

    #[error("Audit export failed: {0}")]
    Export(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, JitError>;
