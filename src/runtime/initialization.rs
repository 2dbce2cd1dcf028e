//! # Initialization
//!
//! Controller startup: rustls setup, tracing, metrics, probe server,
//! Kubernetes client, and the initial reconcile of existing resources.

use std::sync::Arc;

use anyhow::{Context, Result};
use kube::Client;
use tracing::{error, info, warn};

use crate::config::ControllerConfig;
use crate::constants;
use crate::controller::cluster::{ClusterApi, KubeCluster};
use crate::controller::reconciler::{reconcile_request, Reconciler};
use crate::observability;
use crate::provider::aws::AwsActuator;
use crate::runtime::server::{start_server, ServerState};

/// Initialization result containing everything the watch loop needs
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

/// Initialize the controller runtime
pub async fn initialize() -> Result<InitializationResult> {
    // rustls needs its crypto provider installed before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cred_minter=info".into()),
        )
        .init();

    info!("Starting credentials minting controller");

    let config = ControllerConfig::from_env();
    info!(
        root_secret = %format!("{}/{}", config.root_secret_namespace, config.root_secret_name),
        region = %config.aws_region,
        "Controller configuration loaded"
    );

    observability::metrics::register_metrics()?;

    // Start the HTTP server for metrics and probes, then wait for it to
    // bind so readiness probes pass immediately.
    let server_state = Arc::new(ServerState {
        is_ready: Arc::new(std::sync::atomic::AtomicBool::new(false)),
    });
    let server_state_clone = server_state.clone();
    let server_port = config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(err) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {err}");
        }
    });
    wait_for_server_ready(&server_state, &server_handle).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let cluster: Arc<dyn ClusterApi> =
        Arc::new(KubeCluster::new(client.clone(), config.remote_call_timeout()));
    let actuator = Arc::new(AwsActuator::new(cluster.clone(), config));
    let reconciler = Arc::new(Reconciler::new(cluster, actuator));

    // Reconcile resources that existed before the controller started; the
    // watch only delivers changes from now on.
    reconcile_existing_resources(&reconciler).await;

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let startup_timeout =
        std::time::Duration::from_secs(constants::DEFAULT_SERVER_STARTUP_TIMEOUT_SECS);
    let poll_interval =
        std::time::Duration::from_millis(constants::DEFAULT_SERVER_POLL_INTERVAL_MS);
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state
            .is_ready
            .load(std::sync::atomic::Ordering::Relaxed)
        {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}

/// Reconcile existing CredentialsRequest resources before starting the watch
async fn reconcile_existing_resources(reconciler: &Arc<Reconciler>) {
    match reconciler.cluster.list_credentials_requests().await {
        Ok(requests) => {
            info!(
                "CRD is queryable, found {} existing CredentialsRequest resources",
                requests.len()
            );
            for request in requests {
                let namespace = request
                    .metadata
                    .namespace
                    .as_deref()
                    .unwrap_or("default")
                    .to_string();
                let name = request
                    .metadata
                    .name
                    .as_deref()
                    .unwrap_or("unknown")
                    .to_string();

                info!(
                    request = %name,
                    namespace = %namespace,
                    "Reconciling existing resource"
                );
                if let Err(err) = reconcile_request(reconciler, &namespace, &name).await {
                    // Keep going; the watch loop retries failed resources
                    error!(
                        request = %name,
                        namespace = %namespace,
                        error = %err,
                        "Failed to reconcile existing resource"
                    );
                }
            }
        }
        Err(err) => {
            error!("CRD is not queryable; {err:?}. Is the CRD installed?");
            error!("Installation: kubectl apply -f config/crd/credentialsrequest.yaml");
            warn!("Continuing despite CRD queryability check failure - controller will retry");
        }
    }
}
