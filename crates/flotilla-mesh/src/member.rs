//! Cluster members and their lifecycle.
//!
//! A member is one running instance of the messaging service. The control
//! plane only ever sees members through snapshots; the records here are
//! values, not live handles.
//!
//! # Lifecycle
//!
//! ```text
//! Pending ──▶ Connecting ──▶ Connected ──▶ Draining ──▶ Removed
//! ```
//!
//! A member is created `Pending` when the reconciler decides the cluster must
//! grow. Route observations move it through `Connecting` to `Connected`. On
//! shrink, a chosen member drains until no other member lists it as a peer,
//! then it is deprovisioned and recorded `Removed`.

use std::collections::BTreeSet;
use std::fmt;

/// Unique member identifier within a cluster (assigned by the orchestrator).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Where a member is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberState {
    /// Decided upon but not yet provisioned
    Pending,
    /// Provisioned, route propagation in progress
    Connecting,
    /// Mutually visible to every other connected member of its version
    Connected,
    /// Chosen for removal, waiting for dependents to drop it
    Draining,
    /// Deprovisioned; kept only until the next snapshot drops it
    Removed,
}

impl MemberState {
    /// Whether this member counts toward the cluster's working size.
    pub fn is_active(self) -> bool {
        matches!(self, MemberState::Connecting | MemberState::Connected)
    }
}

/// One member as last observed.
///
/// `observed_peers` is the peer set the member itself reported, not what
/// others report about it. Mutual connectivity is checked across records,
/// never inferred from one side.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: MemberId,
    pub version: String,
    pub state: MemberState,
    pub observed_peers: BTreeSet<MemberId>,
}

impl Member {
    /// A freshly decided member: no peers observed yet.
    pub fn pending(id: MemberId, version: impl Into<String>) -> Self {
        Self {
            id,
            version: version.into(),
            state: MemberState::Pending,
            observed_peers: BTreeSet::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Whether this member's own report includes `other` as a peer.
    pub fn sees(&self, other: &MemberId) -> bool {
        self.observed_peers.contains(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_states() {
        assert!(!MemberState::Pending.is_active());
        assert!(MemberState::Connecting.is_active());
        assert!(MemberState::Connected.is_active());
        assert!(!MemberState::Draining.is_active());
        assert!(!MemberState::Removed.is_active());
    }

    #[test]
    fn pending_member_has_no_peers() {
        let m = Member::pending(MemberId::from("m-0"), "2.0.0");
        assert_eq!(m.state, MemberState::Pending);
        assert!(m.observed_peers.is_empty());
        assert!(!m.sees(&MemberId::from("m-1")));
    }
}
