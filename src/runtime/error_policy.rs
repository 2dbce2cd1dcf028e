//! # Error Policy
//!
//! Maps reconciliation errors to requeue actions for the controller watch
//! loop.
//!
//! Backoff is Fibonacci and tracked per resource, so one persistently
//! failing request cannot starve the rest of the queue.

use std::sync::Arc;
use std::time::Duration;

use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{error, info, warn};

use crate::constants::DEFAULT_ERROR_REQUEUE_SECS;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::CredentialsRequest;
use crate::observability::metrics;

/// Handle a reconciliation error with per-resource Fibonacci backoff
pub fn error_policy(
    request: Arc<CredentialsRequest>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = request.name_any();
    let namespace = request.namespace().unwrap_or_else(|| "default".to_string());

    error!(
        request = %name,
        namespace = %namespace,
        error = %error,
        "Reconciliation error"
    );
    metrics::increment_reconciliation_errors();

    let resource_key = format!("{namespace}/{name}");
    let (backoff_seconds, error_count) = match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states
                .entry(resource_key)
                .or_insert_with(|| FibonacciBackoff::new(1, 10));
            let seconds = state.next_backoff_seconds();
            (seconds, state.error_count())
        }
        Err(err) => {
            warn!("Failed to lock backoff states: {err}, using default backoff");
            (DEFAULT_ERROR_REQUEUE_SECS, 0)
        }
    };

    info!(
        "🔄 Retrying with Fibonacci backoff: {}s (error count: {})",
        backoff_seconds, error_count
    );
    Action::requeue(Duration::from_secs(backoff_seconds))
}
