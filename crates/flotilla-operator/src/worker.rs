//! Per-cluster reconcile workers.
//!
//! One worker task owns each cluster: all actions for a cluster are strictly
//! ordered through it (single-writer discipline), and clusters reconcile in
//! parallel only because their workers are independent tasks.
//!
//! The loop is level-triggered. Every pass re-derives the current
//! `(spec, snapshot)` - the spec from a watch channel (which dedups
//! intermediate values by construction), the snapshot fresh from the
//! orchestrator - and runs one reconcile pass. After a successful action the
//! worker waits for the mesh to absorb it, then immediately re-evaluates, so
//! a multi-step resize progresses as fast as verification allows. Failed
//! executor calls retry with capped exponential backoff.

use crate::cancel::CancelToken;
use crate::config::OperatorConfig;
use crate::error::OperatorError;
use crate::executor::{ActionExecutor, MembershipSource};
use crate::sampler::RouteSampler;
use crate::verifier::MeshConvergenceVerifier;
use flotilla_mesh::{Action, ClusterId, ClusterSpec, MembershipReconciler, MembershipSnapshot};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// How many consecutive held passes before a safety block is reported as a
/// stalled condition rather than ordinary churn.
const STALL_REPORT_THRESHOLD: u32 = 5;

/// The reconcile loop for a single cluster.
pub struct ClusterWorker<O> {
    cluster: ClusterId,
    orchestrator: Arc<O>,
    reconciler: MembershipReconciler,
    config: OperatorConfig,
    spec_rx: watch::Receiver<ClusterSpec>,
    cancel: CancelToken,
}

impl<O> ClusterWorker<O>
where
    O: ActionExecutor + MembershipSource + RouteSampler + Send + Sync + 'static,
{
    pub fn new(
        cluster: ClusterId,
        orchestrator: Arc<O>,
        config: OperatorConfig,
        spec_rx: watch::Receiver<ClusterSpec>,
        cancel: CancelToken,
    ) -> Self {
        let reconciler = MembershipReconciler::new(config.snapshot_max_age);
        Self {
            cluster,
            orchestrator,
            reconciler,
            config,
            spec_rx,
            cancel,
        }
    }

    /// Spawn the worker as an independent task.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until canceled or the spec source goes away.
    pub async fn run(mut self) {
        info!(cluster = %self.cluster, "reconcile worker started");
        let verifier = MeshConvergenceVerifier::new(
            Arc::clone(&self.orchestrator),
            self.config.sample_interval,
        );

        let mut backoff = self.config.backoff_base;
        let mut held_passes: u32 = 0;
        // Snapshot timestamp of the last pass that acted. Snapshots are
        // monotonically timestamped; acting on anything older would reorder
        // decisions.
        let mut last_acted_at: Option<Instant> = None;

        loop {
            if self.cancel.is_canceled() {
                break;
            }

            let spec = self.spec_rx.borrow_and_update().clone();

            let snapshot = match self.orchestrator.snapshot(&self.cluster).await {
                Ok(s) => s,
                Err(e) => {
                    warn!(cluster = %self.cluster, error = %e, "snapshot failed, backing off");
                    if !self.pause(backoff).await {
                        break;
                    }
                    backoff = bump(backoff, self.config.backoff_max);
                    continue;
                }
            };

            if let Some(acted) = last_acted_at {
                if snapshot.taken_at <= acted {
                    // Older than what we already acted on; wait for a newer
                    // observation instead of re-deciding on stale data.
                    if !self.pause(self.config.sample_interval).await {
                        break;
                    }
                    continue;
                }
            }

            let action = match self.reconciler.reconcile(&spec, &snapshot) {
                Ok(a) => a,
                Err(e) => {
                    // Terminal: only a changed spec can fix this.
                    error!(cluster = %self.cluster, error = %e, "spec rejected");
                    if !self.wait_for_spec_change().await {
                        break;
                    }
                    continue;
                }
            };

            match action {
                Action::NoOp => {
                    held_passes = 0;
                    backoff = self.config.backoff_base;
                    debug!(cluster = %self.cluster, size = spec.size, "converged with spec, idling");
                    if !self.idle().await {
                        break;
                    }
                }
                Action::Retry(reason) => {
                    held_passes += 1;
                    if held_passes >= STALL_REPORT_THRESHOLD {
                        warn!(
                            cluster = %self.cluster,
                            passes = held_passes,
                            ?reason,
                            "reconcile stalled"
                        );
                    } else {
                        debug!(cluster = %self.cluster, ?reason, "pass held, awaiting fresher snapshot");
                    }
                    if !self.pause(self.config.sample_interval).await {
                        break;
                    }
                }
                Action::AddMember { .. } | Action::RemoveMember { .. } => {
                    held_passes = 0;
                    let expected = expected_target_size(&spec, &snapshot, &action);
                    let target_version = match &action {
                        Action::AddMember { version } => version.clone(),
                        _ => spec.version.clone(),
                    };
                    match self.execute(&action).await {
                        Ok(()) => {
                            backoff = self.config.backoff_base;
                            last_acted_at = Some(snapshot.taken_at);
                            // Confirm the mesh absorbed the step before the
                            // next one. Mid-upgrade rounds cannot converge
                            // while stale-version members answer, so a step
                            // timeout here just hands control back to the
                            // loop, which proceeds on fresh observations.
                            let deadline =
                                tokio::time::Instant::now() + self.config.step_timeout;
                            match verifier
                                .wait_for_convergence(
                                    &self.cluster,
                                    expected,
                                    &target_version,
                                    deadline,
                                    &self.cancel,
                                )
                                .await
                            {
                                Ok(_) => {}
                                Err(OperatorError::Canceled) => break,
                                Err(e) => {
                                    debug!(cluster = %self.cluster, error = %e, "step not yet absorbed");
                                }
                            }
                        }
                        Err(e) if e.is_terminal() => {
                            error!(cluster = %self.cluster, error = %e, "action rejected");
                            if !self.wait_for_spec_change().await {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(
                                cluster = %self.cluster,
                                error = %e,
                                retry_in = ?backoff,
                                "action failed, requeueing"
                            );
                            if !self.pause(backoff).await {
                                break;
                            }
                            backoff = bump(backoff, self.config.backoff_max);
                        }
                    }
                }
            }
        }
        info!(cluster = %self.cluster, "reconcile worker stopped");
    }

    async fn execute(&self, action: &Action) -> crate::error::Result<()> {
        match action {
            Action::AddMember { version } => {
                let member = self
                    .orchestrator
                    .add_member(&self.cluster, version)
                    .await?;
                info!(cluster = %self.cluster, member = %member.id, version, "member added");
                Ok(())
            }
            Action::RemoveMember { id } => {
                self.orchestrator.remove_member(&self.cluster, id).await?;
                info!(cluster = %self.cluster, member = %id, "member removed");
                Ok(())
            }
            Action::NoOp | Action::Retry(_) => Ok(()),
        }
    }

    /// Sleep, abandoning early on cancel. Returns false when canceled.
    async fn pause(&self, d: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(d) => true,
            _ = self.cancel.canceled() => false,
        }
    }

    /// Suspend until the spec changes or the idle re-poll interval elapses.
    /// Returns false when the worker should exit.
    async fn idle(&mut self) -> bool {
        tokio::select! {
            changed = self.spec_rx.changed() => changed.is_ok(),
            _ = tokio::time::sleep(self.config.idle_repoll) => true,
            _ = self.cancel.canceled() => false,
        }
    }

    /// Suspend until the spec changes. Returns false when the worker should
    /// exit.
    async fn wait_for_spec_change(&mut self) -> bool {
        tokio::select! {
            changed = self.spec_rx.changed() => changed.is_ok(),
            _ = self.cancel.canceled() => false,
        }
    }
}

/// Active-member count the mesh should show once `action` lands.
fn expected_target_size(spec: &ClusterSpec, snapshot: &MembershipSnapshot, action: &Action) -> u32 {
    let actual = snapshot.active_count(&spec.version) as u32;
    match action {
        Action::AddMember { .. } => actual + 1,
        Action::RemoveMember { id } => {
            match snapshot.member(id) {
                // Removing a surplus member of the target version shrinks it.
                Some(m) if m.version == spec.version => actual.saturating_sub(1),
                // Removing a stale-version member leaves the target count as is.
                _ => actual,
            }
        }
        Action::NoOp | Action::Retry(_) => actual,
    }
}

fn bump(backoff: Duration, cap: Duration) -> Duration {
    (backoff * 2).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_mesh::{Member, MemberId, MemberState};

    fn connected(id: &str, version: &str) -> Member {
        Member {
            id: MemberId::from(id),
            version: version.to_string(),
            state: MemberState::Connected,
            observed_peers: Default::default(),
        }
    }

    #[test]
    fn expected_size_after_each_action() {
        let spec = ClusterSpec::new(ClusterId::new("ns", "c"), 3, "2.0.0");
        let snapshot = MembershipSnapshot::new(vec![
            connected("m-0", "2.0.0"),
            connected("m-1", "2.0.0"),
            connected("m-old", "1.4.0"),
        ]);

        let add = Action::AddMember {
            version: "2.0.0".into(),
        };
        assert_eq!(expected_target_size(&spec, &snapshot, &add), 3);

        let remove_new = Action::RemoveMember {
            id: MemberId::from("m-1"),
        };
        assert_eq!(expected_target_size(&spec, &snapshot, &remove_new), 1);

        let remove_old = Action::RemoveMember {
            id: MemberId::from("m-old"),
        };
        assert_eq!(expected_target_size(&spec, &snapshot, &remove_old), 2);
    }

    #[test]
    fn backoff_doubles_to_cap() {
        let cap = Duration::from_secs(30);
        let mut b = Duration::from_millis(500);
        let mut seen = Vec::new();
        for _ in 0..8 {
            seen.push(b);
            b = bump(b, cap);
        }
        assert_eq!(seen[1], Duration::from_secs(1));
        assert_eq!(seen[2], Duration::from_secs(2));
        assert_eq!(*seen.last().unwrap(), cap);
        assert_eq!(bump(cap, cap), cap);
    }
}
