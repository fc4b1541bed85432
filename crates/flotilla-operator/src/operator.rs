//! The operator surface: cluster directory and caller-facing API.
//!
//! This is the seam embedding services (and the end-to-end tests) talk to:
//! create a cluster, patch its spec, delete it wholesale, and
//! synchronously wait for the mesh to converge. Each registered cluster gets
//! exactly one [`ClusterWorker`]; the operator only routes desired-state
//! changes to it.

use crate::cancel::CancelToken;
use crate::config::OperatorConfig;
use crate::error::{OperatorError, Result};
use crate::executor::{ActionExecutor, MembershipSource};
use crate::sampler::RouteSampler;
use crate::verifier::MeshConvergenceVerifier;
use crate::worker::ClusterWorker;
use flotilla_mesh::{ClusterId, ClusterSpec, ConvergenceResult, MemberState};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Caller-side reference to a registered cluster.
#[derive(Debug, Clone)]
pub struct ClusterHandle {
    id: ClusterId,
}

impl ClusterHandle {
    pub fn id(&self) -> &ClusterId {
        &self.id
    }
}

struct ClusterEntry {
    spec_tx: watch::Sender<ClusterSpec>,
    cancel: CancelToken,
    worker: tokio::task::JoinHandle<()>,
}

/// The control plane for any number of clusters, reconciled in parallel by
/// independent per-cluster workers.
pub struct Operator<O> {
    orchestrator: Arc<O>,
    config: OperatorConfig,
    clusters: Mutex<HashMap<ClusterId, ClusterEntry>>,
    name_seq: AtomicU64,
}

impl<O> Operator<O>
where
    O: ActionExecutor + MembershipSource + RouteSampler + Send + Sync + 'static,
{
    pub fn new(orchestrator: Arc<O>, config: OperatorConfig) -> Self {
        Self {
            orchestrator,
            config,
            clusters: Mutex::new(HashMap::new()),
            name_seq: AtomicU64::new(0),
        }
    }

    /// Register a new cluster and start reconciling it toward `size` members
    /// at `version`. The cluster name is `name_prefix` plus a unique suffix.
    pub async fn create_cluster(
        &self,
        namespace: &str,
        name_prefix: &str,
        size: u32,
        version: &str,
    ) -> Result<ClusterHandle> {
        let seq = self.name_seq.fetch_add(1, Ordering::Relaxed);
        let id = ClusterId::new(namespace, format!("{name_prefix}{seq}"));
        let spec = ClusterSpec::new(id.clone(), size, version);
        spec.validate()?;

        self.orchestrator.patch_spec(&spec).await?;

        let (spec_tx, spec_rx) = watch::channel(spec);
        let cancel = CancelToken::new();
        let worker = ClusterWorker::new(
            id.clone(),
            Arc::clone(&self.orchestrator),
            self.config.clone(),
            spec_rx,
            cancel.clone(),
        )
        .spawn();

        info!(cluster = %id, size, version, "cluster created");
        self.clusters.lock().unwrap().insert(
            id.clone(),
            ClusterEntry {
                spec_tx,
                cancel,
                worker,
            },
        );
        Ok(ClusterHandle { id })
    }

    /// Replace a cluster's desired spec. Persists through the orchestrator
    /// first, then wakes the worker; conflicts surface to the caller
    /// unchanged.
    pub async fn patch_cluster(&self, handle: &ClusterHandle, new_spec: ClusterSpec) -> Result<()> {
        if new_spec.id != handle.id {
            return Err(OperatorError::UnknownCluster(new_spec.id));
        }
        new_spec.validate()?;

        self.orchestrator.patch_spec(&new_spec).await?;

        let clusters = self.clusters.lock().unwrap();
        let entry = clusters
            .get(&handle.id)
            .ok_or_else(|| OperatorError::UnknownCluster(handle.id.clone()))?;
        info!(cluster = %handle.id, size = new_spec.size, version = %new_spec.version, "cluster patched");
        entry
            .spec_tx
            .send(new_spec)
            .map_err(|_| OperatorError::UnknownCluster(handle.id.clone()))
    }

    /// Tear the cluster down wholesale.
    ///
    /// The worker is stopped first so no reconcile pass races the teardown;
    /// members are then removed without the incremental safety gate - the
    /// mesh is being destroyed, partitioning it is moot.
    pub async fn delete_cluster(&self, handle: ClusterHandle) -> Result<()> {
        let entry = self
            .clusters
            .lock()
            .unwrap()
            .remove(&handle.id)
            .ok_or_else(|| OperatorError::UnknownCluster(handle.id.clone()))?;

        entry.cancel.cancel();
        let _ = entry.worker.await;

        let snapshot = self.orchestrator.snapshot(&handle.id).await?;
        let mut first_err = None;
        for member in snapshot
            .members
            .iter()
            .filter(|m| m.state != MemberState::Removed)
        {
            if let Err(e) = self
                .orchestrator
                .remove_member(&handle.id, &member.id)
                .await
            {
                warn!(cluster = %handle.id, member = %member.id, error = %e, "teardown removal failed");
                first_err.get_or_insert(e);
            }
        }
        info!(cluster = %handle.id, "cluster deleted");
        match first_err {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Synchronously confirm the cluster has converged to a full mesh of
    /// `size` members at `version`, within `timeout`.
    ///
    /// Thin wrapper over [`MeshConvergenceVerifier`] for tests and
    /// operators; callers needing cancellation drive the verifier directly.
    pub async fn wait_until_full_mesh_with_version(
        &self,
        handle: &ClusterHandle,
        size: u32,
        version: &str,
        timeout: Duration,
    ) -> Result<ConvergenceResult> {
        {
            let clusters = self.clusters.lock().unwrap();
            if !clusters.contains_key(&handle.id) {
                return Err(OperatorError::UnknownCluster(handle.id.clone()));
            }
        }
        let verifier = MeshConvergenceVerifier::new(
            Arc::clone(&self.orchestrator),
            self.config.sample_interval,
        );
        verifier
            .wait_for_convergence(
                &handle.id,
                size,
                version,
                tokio::time::Instant::now() + timeout,
                &CancelToken::new(),
            )
            .await
    }

    /// Stop every worker. Used on operator shutdown; cluster members are
    /// left running for the next operator instance to adopt.
    pub async fn shutdown(&self) {
        let entries: Vec<ClusterEntry> = {
            let mut clusters = self.clusters.lock().unwrap();
            clusters.drain().map(|(_, e)| e).collect()
        };
        for entry in entries {
            entry.cancel.cancel();
            let _ = entry.worker.await;
        }
    }
}
