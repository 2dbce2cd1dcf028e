//! # Credentials Minting Controller
//!
//! A Kubernetes controller that watches CredentialsRequest resources and
//! materializes each one into a cloud IAM principal (user, inline policy,
//! access key) plus a platform secret holding the minted credential
//! material.
//!
//! ## Overview
//!
//! 1. **Watching CredentialsRequests** - across all namespaces
//! 2. **Finalizer management** - deletion is gated until cloud-side cleanup
//!    has succeeded
//! 3. **Convergence** - IAM user, inline policy, and access key are driven
//!    to the requested state on every delivery
//! 4. **Key rotation** - replacement keys are minted before stale ones are
//!    removed, honoring the cloud's one-way-secret constraint
//! 5. **Prometheus metrics and health probes** - HTTP endpoints for
//!    monitoring and orchestration

use anyhow::Result;

use cred_minter::runtime::initialization::initialize;
use cred_minter::runtime::watch_loop::run_watch_loop;

#[tokio::main]
async fn main() -> Result<()> {
    let init_result = initialize().await?;
    run_watch_loop(init_result.client, init_result.reconciler).await?;
    Ok(())
}
