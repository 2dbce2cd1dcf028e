//! # Reconciler Types
//!
//! Shared context and the error taxonomy for the reconciliation loop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::controller::backoff::FibonacciBackoff;
use crate::controller::cluster::ClusterApi;
use crate::crd::CodecError;
use crate::provider::aws::client::IamError;
use crate::provider::Actuator;

/// Errors surfaced by a reconcile pass.
///
/// Everything is retryable except ownership conflicts: retrying those would
/// keep hammering a secret that belongs to a different request, so the
/// reconcile ends without a requeue and the failure is recorded in status.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// Kubernetes API failure (includes write conflicts and deadline expiry)
    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),

    /// Cloud IAM API failure
    #[error("cloud iam error: {0}")]
    Iam(#[from] IamError),

    /// Provider payload failed to encode or decode
    #[error("provider codec error: {0}")]
    Codec(#[from] CodecError),

    /// The destination secret is owned by a different CredentialsRequest
    #[error("secret {secret} is owned by credentials request {owner}")]
    OwnershipConflict { secret: String, owner: String },

    /// Anything else that aborts the reconcile
    #[error(transparent)]
    ReconciliationFailed(#[from] anyhow::Error),
}

impl ReconcilerError {
    /// Terminal errors are not retried; the framework is not asked to requeue
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::OwnershipConflict { .. })
    }
}

/// Whether a Kubernetes error is an optimistic-concurrency write conflict
pub fn is_write_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 409)
}

/// Shared reconciler context handed to every reconcile invocation.
///
/// Holds no per-request state beyond the error backoff bookkeeping; the
/// reconcile itself is a pure function of observed cluster and cloud state.
pub struct Reconciler {
    /// Kubernetes access
    pub cluster: Arc<dyn ClusterApi>,
    /// Provider-specific driver
    pub actuator: Arc<dyn Actuator>,
    /// Per-resource error backoff, keyed by `<namespace>/<name>`
    pub backoff_states: Mutex<HashMap<String, FibonacciBackoff>>,
}

impl Reconciler {
    /// Create a new reconciler context
    pub fn new(cluster: Arc<dyn ClusterApi>, actuator: Arc<dyn Actuator>) -> Self {
        Self {
            cluster,
            actuator,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    /// Drop the backoff state for a resource after a successful reconcile
    pub fn reset_backoff(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(resource_key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    #[test]
    fn test_ownership_conflict_is_terminal() {
        let err = ReconcilerError::OwnershipConflict {
            secret: "ns/secret".to_string(),
            owner: "ns/other".to_string(),
        };
        assert!(err.is_terminal());

        let err = ReconcilerError::Iam(IamError::NoSuchEntity);
        assert!(!err.is_terminal());
    }

    #[test]
    fn test_write_conflict_detection() {
        let conflict = kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "the object has been modified".to_string(),
            reason: "Conflict".to_string(),
            code: 409,
        });
        assert!(is_write_conflict(&conflict));

        let not_found = kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "not found".to_string(),
            reason: "NotFound".to_string(),
            code: 404,
        });
        assert!(!is_write_conflict(&not_found));
    }
}
