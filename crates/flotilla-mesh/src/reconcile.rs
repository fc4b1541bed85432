//! The membership reconciliation state machine.
//!
//! One pass computes exactly one safe step toward the desired state:
//!
//! ```text
//! reconcile(spec, snapshot) -> Action
//! ```
//!
//! Scaling is always incremental. Adding or removing one member at a time
//! bounds the number of simultaneous handshake/route-propagation operations
//! and keeps the blast radius of a failed step to a single member. The loop
//! gets the cluster to the target size by calling this repeatedly, verifying
//! mesh convergence between steps.
//!
//! Removal is gated on the current snapshot already showing a mutual mesh
//! among the members that would remain. The exact dependent-detection
//! heuristic of real route tables is richer than this; the pairwise check is
//! the conservative approximation and should be revisited against live
//! route-table semantics before relaxing it.

use crate::error::ReconcileError;
use crate::member::MemberId;
use crate::snapshot::MembershipSnapshot;
use crate::spec::ClusterSpec;
use std::time::Duration;

/// The single step a reconcile pass asks the executor to take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Observed state matches the spec; nothing to do.
    NoOp,
    /// Provision one new member running `version`.
    AddMember { version: String },
    /// Deprovision the given member.
    RemoveMember { id: MemberId },
    /// A step is needed but cannot be taken safely yet. Not an error:
    /// the loop retries on a fresher snapshot.
    Retry(RetryReason),
}

/// Why a pass held back instead of acting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// The snapshot is older than the freshness threshold.
    StaleSnapshot,
    /// Removing this member could split the mesh given current route data.
    RemovalUnsafe { id: MemberId },
}

/// Computes the next safe membership action for a cluster.
#[derive(Debug, Clone)]
pub struct MembershipReconciler {
    /// Snapshots older than this are not acted upon.
    snapshot_max_age: Duration,
}

impl MembershipReconciler {
    pub fn new(snapshot_max_age: Duration) -> Self {
        Self { snapshot_max_age }
    }

    /// One reconcile pass. Pure: no I/O, no clocks beyond the snapshot age
    /// check, deterministic for a given `(spec, snapshot)`.
    pub fn reconcile(
        &self,
        spec: &ClusterSpec,
        snapshot: &MembershipSnapshot,
    ) -> Result<Action, ReconcileError> {
        spec.validate()?;

        if snapshot.is_stale(self.snapshot_max_age) {
            return Ok(Action::Retry(RetryReason::StaleSnapshot));
        }

        let actual = snapshot.active_count(&spec.version);
        let desired = spec.size as usize;

        if actual < desired {
            return Ok(Action::AddMember {
                version: spec.version.clone(),
            });
        }

        if actual > desired {
            // Most-recently-added first: long-lived connections are the ones
            // worth preserving.
            let candidate = snapshot
                .active(&spec.version)
                .last()
                .map(|m| m.id.clone())
                .expect("actual > desired implies at least one active member");
            return Ok(self.remove_if_safe(snapshot, candidate));
        }

        // Size satisfied at the target version. A leftover member of another
        // version keeps the verifier from ever reporting convergence, so a
        // rolling replacement removes it here, one per pass.
        if let Some(stale) = snapshot
            .active_any_version()
            .filter(|m| m.version != spec.version)
            .last()
        {
            let candidate = stale.id.clone();
            return Ok(self.remove_if_safe(snapshot, candidate));
        }

        Ok(Action::NoOp)
    }

    fn remove_if_safe(&self, snapshot: &MembershipSnapshot, candidate: MemberId) -> Action {
        if snapshot.mutually_meshed_without(&candidate) {
            Action::RemoveMember { id: candidate }
        } else {
            Action::Retry(RetryReason::RemovalUnsafe { id: candidate })
        }
    }
}

impl Default for MembershipReconciler {
    fn default() -> Self {
        // Matches the sampler's default cadence with headroom for one slow
        // round.
        Self::new(Duration::from_secs(30))
    }
}
