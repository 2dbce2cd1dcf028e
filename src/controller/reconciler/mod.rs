//! # Reconciler
//!
//! Per-object state machine for CredentialsRequest resources.
//!
//! Each delivery classifies the request's lifecycle state and takes exactly
//! one action:
//!
//! - the request is gone: nothing to do
//! - no deletion pending, finalizer missing: attach the deprovision
//!   finalizer and stop (the write re-delivers the object)
//! - no deletion pending, finalizer present: converge the cloud principal
//!   and destination secret, then record status
//! - deletion pending, finalizer present: deprovision cloud-side artifacts,
//!   then release the finalizer
//! - deletion pending, finalizer absent: already finalized
//!
//! Every action is idempotent; partial progress is picked up by the next
//! delivery.

mod status;
mod types;

pub use types::{is_write_conflict, Reconciler, ReconcilerError};

use std::sync::Arc;
use std::time::{Duration, Instant};

use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, error, info, instrument};

use crate::constants::FINALIZER_DEPROVISION;
use crate::crd::CredentialsRequest;
use crate::observability::metrics;

use self::status::{failed_status, provisioned_status, update_request_status, StatusWrite};

/// Entry point invoked by the controller watch loop
#[instrument(skip_all, fields(request = %request.name_any()))]
pub async fn reconcile(
    request: Arc<CredentialsRequest>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let namespace = request.namespace().unwrap_or_else(|| "default".to_string());
    let name = request.name_any();

    metrics::increment_reconciliations();
    let start = Instant::now();
    let result = reconcile_request(&ctx, &namespace, &name).await;
    metrics::observe_reconcile_duration(start.elapsed().as_secs_f64());

    if result.is_ok() {
        ctx.reset_backoff(&format!("{namespace}/{name}"));
    }
    result
}

/// Reconcile one request identified by its object key.
///
/// Always starts from a fresh read; the watch cache may be stale.
pub async fn reconcile_request(
    ctx: &Reconciler,
    namespace: &str,
    name: &str,
) -> Result<Action, ReconcilerError> {
    let Some(request) = ctx.cluster.get_credentials_request(namespace, name).await? else {
        debug!("CredentialsRequest no longer exists, nothing to do");
        return Ok(Action::await_change());
    };

    if request.is_terminating() {
        return finalize_request(ctx, request).await;
    }

    if !request.has_deprovision_finalizer() {
        info!("Adding deprovision finalizer");
        let mut request = request;
        request
            .metadata
            .finalizers
            .get_or_insert_with(Vec::new)
            .push(FINALIZER_DEPROVISION.to_string());
        ctx.cluster.update_credentials_request(&request).await?;
        // Provisioning waits for the re-delivery triggered by this write.
        return Ok(Action::await_change());
    }

    sync_credentials(ctx, request).await
}

/// Converge the cloud principal and destination secret, then record status
async fn sync_credentials(
    ctx: &Reconciler,
    mut request: CredentialsRequest,
) -> Result<Action, ReconcilerError> {
    let namespace = request.namespace().unwrap_or_else(|| "default".to_string());
    let name = request.name_any();

    let outcome = converge(ctx, &mut request).await;
    match outcome {
        Ok(()) => {
            let desired = provisioned_status(&request);
            if update_request_status(ctx, &namespace, &name, desired).await?
                == StatusWrite::Conflict
            {
                // Lost the optimistic-concurrency race; retry shortly.
                return Ok(Action::requeue(Duration::from_secs(5)));
            }
            metrics::increment_credentials_provisioned();
            info!("✅ Credentials provisioned");
            Ok(Action::await_change())
        }
        Err(err) if err.is_terminal() => {
            error!(error = %err, "Reconcile failed terminally, not retrying");
            let _ = update_request_status(ctx, &namespace, &name, failed_status(&request)).await;
            Ok(Action::await_change())
        }
        Err(err) => {
            // Best-effort failure marker; the error itself drives the retry.
            let _ = update_request_status(ctx, &namespace, &name, failed_status(&request)).await;
            Err(err)
        }
    }
}

/// One existence probe, then the matching actuator operation
async fn converge(
    ctx: &Reconciler,
    request: &mut CredentialsRequest,
) -> Result<(), ReconcilerError> {
    if ctx.actuator.exists(request).await? {
        debug!("Principal exists, converging to spec");
        ctx.actuator.update(request).await
    } else {
        info!("Principal missing, provisioning from scratch");
        ctx.actuator.create(request).await
    }
}

/// Deprovision cloud-side artifacts and release the finalizer.
///
/// The finalizer is removed only after a fully successful delete, so an
/// interrupted cleanup is re-attempted on the next delivery.
async fn finalize_request(
    ctx: &Reconciler,
    request: CredentialsRequest,
) -> Result<Action, ReconcilerError> {
    if !request.has_deprovision_finalizer() {
        debug!("Deletion already finalized");
        return Ok(Action::await_change());
    }

    info!("Deletion requested, deprovisioning cloud credentials");
    ctx.actuator.delete(&request).await?;

    let mut request = request;
    if let Some(finalizers) = request.metadata.finalizers.as_mut() {
        finalizers.retain(|f| f != FINALIZER_DEPROVISION);
    }
    ctx.cluster.update_credentials_request(&request).await?;
    info!("Removed deprovision finalizer");
    Ok(Action::await_change())
}
