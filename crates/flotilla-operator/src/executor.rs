//! Orchestrator boundary.
//!
//! The control plane never touches processes or pods itself. It computes
//! actions and hands them to an [`ActionExecutor`], and re-derives what
//! actually exists through a [`MembershipSource`]. Both are fallible and
//! retryable: a failed call leaves state unchanged, and the next reconcile
//! pass observes whatever really happened.

use crate::error::Result;
use flotilla_mesh::{ClusterId, ClusterSpec, Member, MemberId, MembershipSnapshot};
use std::future::Future;

/// Executes membership actions against the underlying orchestrator.
///
/// Implementations own the actual provisioning/deprovisioning side effects;
/// the `Member` records remain the core's authoritative view.
pub trait ActionExecutor: Send + Sync {
    /// Provision one new member running `version`. Returns the member
    /// record in `Pending` state.
    fn add_member(
        &self,
        cluster: &ClusterId,
        version: &str,
    ) -> impl Future<Output = Result<Member>> + Send;

    /// Deprovision the given member.
    fn remove_member(
        &self,
        cluster: &ClusterId,
        id: &MemberId,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Persist a new desired spec at the orchestrator.
    /// Fails with [`OperatorError::Conflict`] on concurrent modification.
    ///
    /// [`OperatorError::Conflict`]: crate::error::OperatorError::Conflict
    fn patch_spec(&self, spec: &ClusterSpec) -> impl Future<Output = Result<()>> + Send;
}

/// Produces the latest membership snapshot for a cluster.
pub trait MembershipSource: Send + Sync {
    /// Take a fresh snapshot of all members. The returned value is immutable
    /// and monotonically timestamped; callers never mutate it.
    fn snapshot(
        &self,
        cluster: &ClusterId,
    ) -> impl Future<Output = Result<MembershipSnapshot>> + Send;
}
