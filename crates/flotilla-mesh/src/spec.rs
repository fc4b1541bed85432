//! Desired cluster state as declared by the user.

use crate::error::ReconcileError;
use std::fmt;

/// Identity of a cluster: namespace plus name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterId {
    pub namespace: String,
    pub name: String,
}

impl ClusterId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// The desired shape of a cluster.
///
/// Immutable within a reconcile pass; only the API layer replaces it
/// (via a patch), which wakes the cluster's worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSpec {
    pub id: ClusterId,
    /// Desired number of members. Must be at least 1.
    pub size: u32,
    /// Version every member should run, e.g. "2.0.0".
    pub version: String,
}

impl ClusterSpec {
    pub fn new(id: ClusterId, size: u32, version: impl Into<String>) -> Self {
        Self {
            id,
            size,
            version: version.into(),
        }
    }

    /// Reject specs no reconcile pass should ever act on.
    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.size == 0 {
            return Err(ReconcileError::InvalidSize {
                cluster: self.id.clone(),
            });
        }
        Ok(())
    }
}
