//! Policy validation and store errors.

use fleetedge_types::PolicyId;
use thiserror::Error;

/// Error type for policy validation and policy store operations.
///
/// Every variant is raised at write or load time. Evaluation never fails:
/// problems found while evaluating (missing attributes, runtime type
/// mismatches) are reported in the trace instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The policy is structurally invalid or could not be parsed.
    #[error("Malformed policy '{policy}': {reason}")]
    MalformedPolicy { policy: String, reason: String },

    /// A condition applies an operator to an incompatible attribute type.
    #[error("Type error in policy '{policy}', attribute '{attribute}': {reason}")]
    TypeError {
        policy: String,
        attribute: String,
        reason: String,
    },

    /// No policy with this id exists in the store.
    #[error("Policy not found: {0}")]
    PolicyNotFound(PolicyId),
}

impl PolicyError {
    pub(crate) fn malformed(policy: impl ToString, reason: impl Into<String>) -> Self {
        Self::MalformedPolicy {
            policy: policy.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;
