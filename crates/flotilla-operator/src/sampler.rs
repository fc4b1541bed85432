//! Route sampling boundary.
//!
//! One member, one question: which peers do you currently route to, and what
//! version are you running? The trait is the seam for tests and for real
//! adapters; the serde wire model below is shared by any adapter that talks
//! to the members' HTTP monitoring endpoint.
//!
//! Sampling is read-only and failure-tolerant by contract: a failed sample
//! means "no data this round", never a state change.

use crate::error::Result;
use flotilla_mesh::{ClusterId, MemberId, RouteSample};
use serde::Deserialize;
use std::future::Future;

/// Queries a single member's monitoring endpoint.
pub trait RouteSampler: Send + Sync {
    /// Return the member's currently observed peer set and reported version.
    ///
    /// Errors are transient by definition ([`OperatorError::Sampling`] or
    /// [`OperatorError::Payload`]); callers treat them as "not yet
    /// converged" and retry on the next interval.
    ///
    /// [`OperatorError::Sampling`]: crate::error::OperatorError::Sampling
    /// [`OperatorError::Payload`]: crate::error::OperatorError::Payload
    fn sample_routes(
        &self,
        cluster: &ClusterId,
        member: &MemberId,
    ) -> impl Future<Output = Result<RouteSample>> + Send;
}

/// Route-table payload served by a member's monitoring endpoint.
#[derive(Debug, Deserialize)]
pub struct RoutezPayload {
    pub server_id: String,
    pub server_version: String,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

/// One established route to a peer.
#[derive(Debug, Deserialize)]
pub struct RouteEntry {
    pub remote_id: String,
}

/// Decode a monitoring payload into a [`RouteSample`].
pub fn parse_route_payload(bytes: &[u8]) -> Result<RouteSample> {
    let payload: RoutezPayload = serde_json::from_slice(bytes)?;
    Ok(RouteSample {
        peer_ids: payload
            .routes
            .into_iter()
            .map(|r| MemberId::new(r.remote_id))
            .collect(),
        version: payload.server_version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_route_payload() {
        let raw = br#"{
            "server_id": "m-0",
            "server_version": "2.0.0",
            "routes": [
                {"remote_id": "m-1", "ip": "10.0.0.2", "port": 6222},
                {"remote_id": "m-2", "ip": "10.0.0.3", "port": 6222}
            ]
        }"#;
        let sample = parse_route_payload(raw).unwrap();
        assert_eq!(sample.version, "2.0.0");
        assert_eq!(sample.peer_ids.len(), 2);
        assert!(sample.peer_ids.contains(&MemberId::from("m-1")));
        assert!(sample.peer_ids.contains(&MemberId::from("m-2")));
    }

    #[test]
    fn empty_routes_field_defaults() {
        let raw = br#"{"server_id": "m-0", "server_version": "2.0.0"}"#;
        let sample = parse_route_payload(raw).unwrap();
        assert!(sample.peer_ids.is_empty());
    }

    #[test]
    fn malformed_payload_is_a_payload_error() {
        let err = parse_route_payload(b"not json").unwrap_err();
        assert!(!err.is_terminal());
    }
}
