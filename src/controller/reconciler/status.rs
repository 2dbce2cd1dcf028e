//! # Status Management
//!
//! Writes the CredentialsRequest status subresource with reconciliation
//! results.
//!
//! The object is re-read immediately before every status write (the
//! reconcile may have mutated the live object) and the write is skipped when
//! nothing meaningful changed, to avoid feeding watch events back into the
//! queue.

use chrono::Utc;
use tracing::{debug, warn};

use crate::controller::reconciler::types::{is_write_conflict, Reconciler, ReconcilerError};
use crate::crd::{CredentialsRequest, CredentialsRequestStatus};

/// Outcome of a status write attempt
#[derive(Debug, PartialEq)]
pub enum StatusWrite {
    /// The status subresource was written
    Written,
    /// The stored status already matched; no write issued
    Skipped,
    /// Lost an optimistic-concurrency race; caller should retry soon
    Conflict,
    /// The request no longer exists
    Gone,
}

/// Status for a successfully converged request
pub fn provisioned_status(request: &CredentialsRequest) -> CredentialsRequestStatus {
    CredentialsRequestStatus {
        provisioned: true,
        last_sync_generation: request.metadata.generation.unwrap_or(0),
        last_sync_timestamp: Some(Utc::now().to_rfc3339()),
        provider_status: request
            .status
            .as_ref()
            .and_then(|status| status.provider_status.clone()),
    }
}

/// Status for a failed reconcile: provisioned drops to false while the last
/// successfully synced generation is left untouched.
pub fn failed_status(request: &CredentialsRequest) -> CredentialsRequestStatus {
    let mut status = request.status.clone().unwrap_or_default();
    status.provisioned = false;
    status
}

/// Re-read the request and write the desired status onto it
pub async fn update_request_status(
    ctx: &Reconciler,
    namespace: &str,
    name: &str,
    desired: CredentialsRequestStatus,
) -> Result<StatusWrite, ReconcilerError> {
    let Some(mut request) = ctx.cluster.get_credentials_request(namespace, name).await? else {
        debug!("Request disappeared before status write");
        return Ok(StatusWrite::Gone);
    };

    if let Some(current) = &request.status {
        if status_equivalent(current, &desired) {
            debug!("Skipping status update, nothing changed");
            return Ok(StatusWrite::Skipped);
        }
    }

    request.status = Some(desired);
    match ctx
        .cluster
        .update_credentials_request_status(&request)
        .await
    {
        Ok(()) => Ok(StatusWrite::Written),
        Err(err) if is_write_conflict(&err) => {
            warn!("Status write conflicted, will retry");
            Ok(StatusWrite::Conflict)
        }
        Err(err) => Err(err.into()),
    }
}

/// Whether two statuses are equivalent for write-suppression purposes.
/// The sync timestamp alone never justifies a write.
fn status_equivalent(current: &CredentialsRequestStatus, desired: &CredentialsRequestStatus) -> bool {
    current.provisioned == desired.provisioned
        && current.last_sync_generation == desired.last_sync_generation
        && current.provider_status == desired.provider_status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_equivalence_ignores_timestamp() {
        let current = CredentialsRequestStatus {
            provisioned: true,
            last_sync_generation: 3,
            last_sync_timestamp: Some("2018-12-05T10:00:00Z".to_string()),
            provider_status: None,
        };
        let mut desired = current.clone();
        desired.last_sync_timestamp = Some("2018-12-05T11:00:00Z".to_string());
        assert!(status_equivalent(&current, &desired));

        desired.provisioned = false;
        assert!(!status_equivalent(&current, &desired));
    }

    #[test]
    fn test_failed_status_preserves_generation() {
        let request = CredentialsRequest {
            metadata: Default::default(),
            spec: crate::crd::CredentialsRequestSpec {
                cluster_name: "c".to_string(),
                cluster_id: "id".to_string(),
                secret_ref: crate::crd::SecretRef {
                    namespace: "ns".to_string(),
                    name: "s".to_string(),
                },
                provider_spec: None,
            },
            status: Some(CredentialsRequestStatus {
                provisioned: true,
                last_sync_generation: 7,
                last_sync_timestamp: None,
                provider_status: None,
            }),
        };

        let failed = failed_status(&request);
        assert!(!failed.provisioned);
        assert_eq!(failed.last_sync_generation, 7);
    }
}
