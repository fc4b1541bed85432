//! Point-in-time observations of cluster membership.
//!
//! A snapshot is an immutable value: samplers produce it, the reconciler
//! reads it, and a newer snapshot supersedes it. Nothing mutates a snapshot
//! after it has been handed to a caller. Timestamps are monotonic
//! (`Instant`), so "never act on an older snapshot than the one last acted
//! on" is a plain comparison.

use crate::member::{Member, MemberId, MemberState};
use std::time::{Duration, Instant};

/// All members of one cluster as observed at a single point in time.
///
/// `members` preserves creation order: the last entry is the most recently
/// added member, which is the removal tie-break the reconciler uses.
#[derive(Debug, Clone)]
pub struct MembershipSnapshot {
    pub members: Vec<Member>,
    pub taken_at: Instant,
}

impl MembershipSnapshot {
    /// Snapshot taken now.
    pub fn new(members: Vec<Member>) -> Self {
        Self {
            members,
            taken_at: Instant::now(),
        }
    }

    /// An empty snapshot (cluster not yet provisioned).
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.members.iter().find(|m| &m.id == id)
    }

    /// Members counting toward the working size (Connecting or Connected)
    /// of the given version, in creation order.
    pub fn active<'a>(&'a self, version: &'a str) -> impl Iterator<Item = &'a Member> {
        self.members
            .iter()
            .filter(move |m| m.is_active() && m.version == version)
    }

    pub fn active_count(&self, version: &str) -> usize {
        self.active(version).count()
    }

    /// Active members regardless of version.
    pub fn active_any_version(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|m| m.is_active())
    }

    pub fn age(&self) -> Duration {
        self.taken_at.elapsed()
    }

    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.age() > max_age
    }

    /// Whether any connected member still lists `id` as a peer.
    ///
    /// A member with dependents must not be removed: a peer routing through
    /// it could lose its only observed path.
    pub fn has_dependents(&self, id: &MemberId) -> bool {
        self.members
            .iter()
            .filter(|m| &m.id != id && m.state == MemberState::Connected)
            .any(|m| m.sees(id))
    }

    /// Whether the active members, with `candidate` ignored on both sides of
    /// every comparison, already mutually reference each other.
    ///
    /// This is the conservative safety gate for removal: if it holds, taking
    /// `candidate` out cannot leave two remaining members without a direct
    /// route between them. Incomplete route data fails the check, which the
    /// loop resolves by retrying on a fresher snapshot.
    pub fn mutually_meshed_without(&self, candidate: &MemberId) -> bool {
        let remaining: Vec<&Member> = self
            .active_any_version()
            .filter(|m| &m.id != candidate)
            .collect();

        for a in &remaining {
            for b in &remaining {
                if a.id != b.id && !a.sees(&b.id) {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected(id: &str, version: &str, peers: &[&str]) -> Member {
        Member {
            id: MemberId::from(id),
            version: version.to_string(),
            state: MemberState::Connected,
            observed_peers: peers.iter().map(|p| MemberId::from(*p)).collect(),
        }
    }

    fn full_mesh(ids: &[&str], version: &str) -> Vec<Member> {
        ids.iter()
            .map(|id| {
                let peers: Vec<&str> = ids.iter().copied().filter(|p| p != id).collect();
                connected(id, version, &peers)
            })
            .collect()
    }

    #[test]
    fn active_counts_by_version() {
        let mut members = full_mesh(&["m-0", "m-1", "m-2"], "2.0.0");
        members.push(connected("m-old", "1.4.0", &["m-0"]));
        members.push(Member {
            state: MemberState::Draining,
            ..connected("m-3", "2.0.0", &[])
        });
        let snap = MembershipSnapshot::new(members);

        assert_eq!(snap.active_count("2.0.0"), 3);
        assert_eq!(snap.active_count("1.4.0"), 1);
        assert_eq!(snap.active_any_version().count(), 4);
    }

    #[test]
    fn dependents_detected() {
        let snap = MembershipSnapshot::new(full_mesh(&["m-0", "m-1", "m-2"], "2.0.0"));
        assert!(snap.has_dependents(&MemberId::from("m-2")));

        // Nobody references a member that never joined the mesh.
        let mut members = full_mesh(&["m-0", "m-1"], "2.0.0");
        members.push(connected("m-2", "2.0.0", &["m-0", "m-1"]));
        let snap = MembershipSnapshot::new(members);
        assert!(!snap.has_dependents(&MemberId::from("m-2")));
    }

    #[test]
    fn mutual_mesh_ignores_candidate() {
        // m-0 and m-1 see each other; m-2 is referenced but removable.
        let snap = MembershipSnapshot::new(full_mesh(&["m-0", "m-1", "m-2"], "2.0.0"));
        assert!(snap.mutually_meshed_without(&MemberId::from("m-2")));
    }

    #[test]
    fn one_sided_reference_fails_mesh_check() {
        let members = vec![
            connected("m-0", "2.0.0", &["m-1", "m-2"]),
            // m-1 only sees m-2: removing m-2 would leave m-1 without a
            // route to m-0.
            connected("m-1", "2.0.0", &["m-2"]),
            connected("m-2", "2.0.0", &["m-0", "m-1"]),
        ];
        let snap = MembershipSnapshot::new(members);
        assert!(!snap.mutually_meshed_without(&MemberId::from("m-2")));
    }

    #[test]
    fn empty_set_is_trivially_meshed() {
        let snap = MembershipSnapshot::empty();
        assert!(snap.mutually_meshed_without(&MemberId::from("m-0")));
        assert!(!snap.has_dependents(&MemberId::from("m-0")));
    }

    #[test]
    fn staleness() {
        let snap = MembershipSnapshot {
            members: Vec::new(),
            taken_at: Instant::now() - Duration::from_secs(60),
        };
        assert!(snap.is_stale(Duration::from_secs(30)));
        assert!(!snap.is_stale(Duration::from_secs(120)));
    }
}
