//! Error types for the operator control plane.
//!
//! The taxonomy matters more than the variants: terminal errors (bad spec,
//! unknown cluster) are surfaced and never retried; everything else is
//! transient and the worker retries with backoff. Safety-blocked actions are
//! not errors at all - they come back from the reconciler as
//! [`Action::Retry`](flotilla_mesh::Action::Retry).

use flotilla_mesh::{ClusterId, ReconcileError};
use thiserror::Error;

/// Result type for operator operations.
pub type Result<T> = std::result::Result<T, OperatorError>;

/// Errors that can occur in the control plane.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Rejected desired spec; never retried
    #[error("Validation error: {0}")]
    Validation(#[from] ReconcileError),

    /// Provisioning a new member failed
    #[error("Provision error: {0}")]
    Provision(String),

    /// Deprovisioning a member failed
    #[error("Deprovision error: {0}")]
    Deprovision(String),

    /// Concurrent modification of the spec at the orchestrator
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A member's monitoring endpoint could not be sampled
    #[error("Sampling error: {0}")]
    Sampling(String),

    /// Malformed monitoring payload
    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// The mesh did not converge before the deadline
    #[error("Convergence timeout: cluster {cluster} did not reach a full mesh of {size} members at {version}")]
    ConvergenceTimeout {
        cluster: ClusterId,
        size: u32,
        version: String,
    },

    /// The waiting operation was canceled by its caller
    #[error("Canceled")]
    Canceled,

    /// No such cluster registered with this operator
    #[error("Unknown cluster: {0}")]
    UnknownCluster(ClusterId),
}

impl OperatorError {
    /// Terminal errors cannot succeed on retry and are surfaced as-is.
    /// Everything else is transient: the worker backs off and tries again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperatorError::Validation(_) | OperatorError::UnknownCluster(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_split() {
        assert!(OperatorError::UnknownCluster(ClusterId::new("ns", "c")).is_terminal());
        assert!(!OperatorError::Provision("pod pending".into()).is_terminal());
        assert!(!OperatorError::Sampling("connection refused".into()).is_terminal());
        assert!(!OperatorError::Canceled.is_terminal());
    }
}
