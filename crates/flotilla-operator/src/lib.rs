//! Flotilla operator - control plane for clustered messaging services.
//!
//! Keeps each registered cluster at its declared member count and version
//! while the members remain one connected mesh through every resize. The
//! decision logic lives in `flotilla-mesh`; this crate supplies the moving
//! parts around it:
//!
//! - **Boundary traits**: [`RouteSampler`], [`ActionExecutor`],
//!   [`MembershipSource`] - the seams to the real orchestrator.
//! - **[`MeshConvergenceVerifier`]**: cancellable polling until the mesh
//!   shows full mutual connectivity.
//! - **[`ClusterWorker`]**: the per-cluster reconcile loop; one writer per
//!   cluster, clusters in parallel.
//! - **[`Operator`]**: the caller-facing directory
//!   (create / patch / delete / wait-until-full-mesh).
//!
//! # Example
//!
//! ```no_run
//! use flotilla_operator::{Operator, OperatorConfig};
//! use flotilla_mesh::ClusterSpec;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run<O>(orchestrator: Arc<O>) -> flotilla_operator::Result<()>
//! # where O: flotilla_operator::ActionExecutor
//! #     + flotilla_operator::MembershipSource
//! #     + flotilla_operator::RouteSampler + Send + Sync + 'static {
//! let operator = Operator::new(orchestrator, OperatorConfig::default());
//! let cluster = operator.create_cluster("default", "msgs-", 3, "2.0.0").await?;
//! operator
//!     .wait_until_full_mesh_with_version(&cluster, 3, "2.0.0", Duration::from_secs(300))
//!     .await?;
//!
//! let spec = ClusterSpec::new(cluster.id().clone(), 5, "2.0.0");
//! operator.patch_cluster(&cluster, spec).await?;
//! operator
//!     .wait_until_full_mesh_with_version(&cluster, 5, "2.0.0", Duration::from_secs(300))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod executor;
pub mod operator;
pub mod sampler;
pub mod telemetry;
pub mod verifier;
pub mod worker;

pub use cancel::CancelToken;
pub use config::OperatorConfig;
pub use error::{OperatorError, Result};
pub use executor::{ActionExecutor, MembershipSource};
pub use operator::{ClusterHandle, Operator};
pub use sampler::{parse_route_payload, RouteSampler};
pub use verifier::MeshConvergenceVerifier;
pub use worker::ClusterWorker;
