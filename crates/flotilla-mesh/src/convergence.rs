//! The full-mesh convergence predicate.
//!
//! Deciding "has the cluster converged" is a pure function over one round of
//! route samples. The polling, deadlines, and cancellation live in the
//! operator crate; keeping the predicate here makes it deterministic to test
//! without timers or sockets.

use crate::member::MemberId;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// What one member reported from its monitoring endpoint: the peers it
/// currently routes to, and the version it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSample {
    pub peer_ids: BTreeSet<MemberId>,
    pub version: String,
}

/// Outcome of a convergence check.
#[derive(Debug, Clone)]
pub struct ConvergenceResult {
    pub converged: bool,
    pub size: u32,
    pub version: String,
    pub observed_at: Instant,
}

/// The target shape a converged cluster must show: every member of
/// `members` runs `version` and routes to exactly the other members.
#[derive(Debug, Clone)]
pub struct FullMesh {
    pub members: BTreeSet<MemberId>,
    pub version: String,
}

impl FullMesh {
    pub fn new(members: BTreeSet<MemberId>, version: impl Into<String>) -> Self {
        Self {
            members,
            version: version.into(),
        }
    }

    pub fn size(&self) -> u32 {
        self.members.len() as u32
    }

    /// Whether one round of samples shows the full mutual mesh.
    ///
    /// Denied when:
    /// - any target member is missing from the round (unreachable or a
    ///   transient sampling failure - the caller retries),
    /// - any target member reports the wrong version,
    /// - any target member's peer set differs from {all other members},
    /// - anything outside the target set is still reachable (a residual
    ///   draining member, or a stale-version member mid-upgrade).
    pub fn holds(&self, samples: &BTreeMap<MemberId, RouteSample>) -> bool {
        // Residual members deny convergence outright.
        if samples.keys().any(|id| !self.members.contains(id)) {
            return false;
        }

        for id in &self.members {
            let Some(sample) = samples.get(id) else {
                return false;
            };
            if sample.version != self.version {
                return false;
            }
            let expected: BTreeSet<MemberId> =
                self.members.iter().filter(|m| *m != id).cloned().collect();
            if sample.peer_ids != expected {
                return false;
            }
        }
        true
    }

    /// Package one round's verdict.
    pub fn result(&self, converged: bool) -> ConvergenceResult {
        ConvergenceResult {
            converged,
            size: self.size(),
            version: self.version.clone(),
            observed_at: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> BTreeSet<MemberId> {
        names.iter().map(|n| MemberId::from(*n)).collect()
    }

    fn sample(peers: &[&str], version: &str) -> RouteSample {
        RouteSample {
            peer_ids: ids(peers),
            version: version.to_string(),
        }
    }

    fn full_round(names: &[&str], version: &str) -> BTreeMap<MemberId, RouteSample> {
        names
            .iter()
            .map(|n| {
                let peers: Vec<&str> = names.iter().copied().filter(|p| p != n).collect();
                (MemberId::from(*n), sample(&peers, version))
            })
            .collect()
    }

    #[test]
    fn complete_mesh_converges() {
        let target = FullMesh::new(ids(&["m-0", "m-1", "m-2"]), "2.0.0");
        assert!(target.holds(&full_round(&["m-0", "m-1", "m-2"], "2.0.0")));
    }

    #[test]
    fn one_missing_peer_denies() {
        let target = FullMesh::new(ids(&["m-0", "m-1", "m-2"]), "2.0.0");
        let mut round = full_round(&["m-0", "m-1", "m-2"], "2.0.0");
        round
            .get_mut(&MemberId::from("m-1"))
            .unwrap()
            .peer_ids
            .remove(&MemberId::from("m-2"));
        assert!(!target.holds(&round));
    }

    #[test]
    fn missing_sample_denies() {
        let target = FullMesh::new(ids(&["m-0", "m-1", "m-2"]), "2.0.0");
        let mut round = full_round(&["m-0", "m-1", "m-2"], "2.0.0");
        round.remove(&MemberId::from("m-0"));
        assert!(!target.holds(&round));
    }

    #[test]
    fn wrong_version_denies() {
        let target = FullMesh::new(ids(&["m-0", "m-1"]), "2.0.0");
        let mut round = full_round(&["m-0", "m-1"], "2.0.0");
        round.get_mut(&MemberId::from("m-1")).unwrap().version = "1.4.0".to_string();
        assert!(!target.holds(&round));
    }

    #[test]
    fn residual_member_denies() {
        // All three targets fully meshed, but a draining member is still
        // reachable: mid-transition, not converged.
        let target = FullMesh::new(ids(&["m-0", "m-1", "m-2"]), "2.0.0");
        let mut round = full_round(&["m-0", "m-1", "m-2"], "2.0.0");
        round.insert(MemberId::from("m-3"), sample(&["m-0"], "2.0.0"));
        assert!(!target.holds(&round));
    }

    #[test]
    fn extra_peer_reference_denies() {
        let target = FullMesh::new(ids(&["m-0", "m-1"]), "2.0.0");
        let mut round = full_round(&["m-0", "m-1"], "2.0.0");
        round
            .get_mut(&MemberId::from("m-0"))
            .unwrap()
            .peer_ids
            .insert(MemberId::from("m-9"));
        assert!(!target.holds(&round));
    }

    #[test]
    fn single_member_mesh() {
        let target = FullMesh::new(ids(&["m-0"]), "2.0.0");
        let round = full_round(&["m-0"], "2.0.0");
        assert!(target.holds(&round));
        assert_eq!(target.size(), 1);
    }
}
