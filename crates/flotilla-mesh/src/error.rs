//! Error types for membership reconciliation.

use crate::spec::ClusterId;
use thiserror::Error;

/// Errors a reconcile pass can reject a spec with.
///
/// These are terminal: retrying with the same spec cannot succeed. Safety
/// blocks and stale snapshots are NOT errors - they come back as
/// [`Action::Retry`](crate::reconcile::Action::Retry).
#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    /// Desired size must be at least 1
    #[error("cluster {cluster}: desired size must be at least 1")]
    InvalidSize { cluster: ClusterId },
}
