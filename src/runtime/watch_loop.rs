//! # Watch Loop
//!
//! Runs the controller against CredentialsRequest resources across all
//! namespaces. Per-key serialization, requeue scheduling, and shutdown
//! handling come from the kube runtime.

use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;
use kube::api::Api;
use kube::runtime::controller::Controller;
use kube::runtime::watcher;
use kube::Client;
use tracing::{debug, error, info};

use crate::controller::reconciler::{reconcile, Reconciler};
use crate::crd::CredentialsRequest;
use crate::runtime::error_policy::error_policy;

/// Run the controller watch loop until shutdown
pub async fn run_watch_loop(client: Client, reconciler: Arc<Reconciler>) -> Result<()> {
    let requests: Api<CredentialsRequest> = Api::all(client);

    info!("Starting CredentialsRequest controller");

    Controller::new(requests, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, reconciler)
        .for_each(|result| async move {
            match result {
                Ok(object) => debug!("Reconciled: {:?}", object),
                Err(err) => error!("Reconcile error: {:?}", err),
            }
        })
        .await;

    info!("Watch loop terminated");
    Ok(())
}
