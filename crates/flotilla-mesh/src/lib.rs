//! Membership reconciliation and mesh convergence for Flotilla clusters.
//!
//! A cluster of messaging-service members must stay a single connected mesh
//! through every resize. This crate holds the decision logic only: given the
//! declared spec and a point-in-time snapshot of the members, compute the one
//! safe step to take next, and decide from sampled route tables whether the
//! mesh has fully converged.
//!
//! # Design
//!
//! Everything here is a pure function over immutable values:
//!
//! - [`MembershipReconciler`] turns `(spec, snapshot)` into a single
//!   [`Action`] - add one member, remove one member, hold, or nothing.
//! - [`FullMesh`] is the convergence predicate over one round of
//!   [`RouteSample`]s.
//!
//! No sampling, polling, or process lifecycle lives here; the operator crate
//! drives these functions with real I/O. That split is what makes the safety
//! properties unit-testable without timers or a running cluster.

mod convergence;
mod error;
mod member;
mod reconcile;
mod snapshot;
mod spec;

pub use convergence::{ConvergenceResult, FullMesh, RouteSample};
pub use error::ReconcileError;
pub use member::{Member, MemberId, MemberState};
pub use reconcile::{Action, MembershipReconciler, RetryReason};
pub use snapshot::MembershipSnapshot;
pub use spec::{ClusterId, ClusterSpec};
