//! The mesh-convergence verifier.
//!
//! Polls every reachable member's route table until the cluster shows a full
//! mutual mesh of the target size and version, the deadline elapses, or the
//! caller cancels. The decision itself is [`FullMesh::holds`] in
//! `flotilla-mesh`; this module only drives the sampling.
//!
//! A single bad sample never fails the wait: it leaves that member out of
//! the round, the predicate reads that as "not yet converged", and the next
//! interval retries. `converged = false` is only ever reported through an
//! explicit timeout or cancellation.

use crate::cancel::CancelToken;
use crate::error::{OperatorError, Result};
use crate::executor::MembershipSource;
use crate::sampler::RouteSampler;
use flotilla_mesh::{ClusterId, ConvergenceResult, FullMesh, MemberId, MemberState, RouteSample};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Blocks (cooperatively) until a cluster's mesh converges.
///
/// Never mutates member state; reads only, via [`RouteSampler`] and
/// [`MembershipSource`]. Safe to run concurrently with the cluster's
/// reconcile worker or from an external caller with its own deadline.
pub struct MeshConvergenceVerifier<O> {
    orchestrator: Arc<O>,
    sample_interval: Duration,
}

impl<O> MeshConvergenceVerifier<O>
where
    O: RouteSampler + MembershipSource,
{
    pub fn new(orchestrator: Arc<O>, sample_interval: Duration) -> Self {
        Self {
            orchestrator,
            sample_interval,
        }
    }

    /// Wait until every member of `version` reports exactly the peer set
    /// {all other target members} and `size` of them exist, with no residual
    /// member still reachable.
    ///
    /// The candidate set is re-derived from a fresh snapshot every round, so
    /// a wait started before a resize finishes observes the membership the
    /// reconciler is still changing.
    pub async fn wait_for_convergence(
        &self,
        cluster: &ClusterId,
        size: u32,
        version: &str,
        deadline: Instant,
        cancel: &CancelToken,
    ) -> Result<ConvergenceResult> {
        debug!(%cluster, size, version, "waiting for mesh convergence");
        loop {
            if let Some(result) = self.check_once(cluster, size, version).await {
                info!(%cluster, size, version, "mesh converged");
                return Ok(result);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.sample_interval) => {}
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(OperatorError::ConvergenceTimeout {
                        cluster: cluster.clone(),
                        size,
                        version: version.to_string(),
                    });
                }
                _ = cancel.canceled() => return Err(OperatorError::Canceled),
            }
        }
    }

    /// One sampling round. `None` means "not yet converged" for any reason,
    /// including transient snapshot or sampling failures.
    async fn check_once(
        &self,
        cluster: &ClusterId,
        size: u32,
        version: &str,
    ) -> Option<ConvergenceResult> {
        let snapshot = match self.orchestrator.snapshot(cluster).await {
            Ok(s) => s,
            Err(e) => {
                debug!(%cluster, error = %e, "snapshot failed, retrying next round");
                return None;
            }
        };

        let target_ids: BTreeSet<MemberId> = snapshot
            .active(version)
            .map(|m| m.id.clone())
            .collect();
        if target_ids.len() != size as usize {
            return None;
        }

        // Sample everything that might still be reachable, not just the
        // targets: a residual draining or stale-version member that answers
        // must deny convergence.
        let mut samples: BTreeMap<MemberId, RouteSample> = BTreeMap::new();
        for member in snapshot
            .members
            .iter()
            .filter(|m| m.state != MemberState::Removed)
        {
            match self.orchestrator.sample_routes(cluster, &member.id).await {
                Ok(sample) => {
                    samples.insert(member.id.clone(), sample);
                }
                Err(e) => {
                    debug!(%cluster, member = %member.id, error = %e, "sample failed");
                }
            }
        }

        let target = FullMesh::new(target_ids, version);
        target.holds(&samples).then(|| target.result(true))
    }
}
