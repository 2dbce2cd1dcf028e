//! # minterctl CLI
//!
//! Command-line interface for the credentials minting controller.
//!
//! ## Usage
//!
//! ```bash
//! # List all CredentialsRequest resources
//! minterctl list
//!
//! # Show status of a CredentialsRequest
//! minterctl status --namespace myproject --name openshift-component-a
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::api::{Api, ListParams};
use kube::Client;

use cred_minter::crd::CredentialsRequest;

/// Credentials Minting Controller CLI
#[derive(Parser)]
#[command(name = "minterctl")]
#[command(about = "Credentials Minting Controller CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes namespace (defaults to current context namespace)
    #[arg(short, long, global = true)]
    namespace: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all CredentialsRequest resources
    List {
        /// Namespace to list resources in (defaults to all namespaces)
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// Show status of a CredentialsRequest resource
    Status {
        /// Name of the CredentialsRequest resource
        #[arg(short = 'r', long)]
        name: String,

        /// Namespace of the CredentialsRequest resource
        #[arg(short, long)]
        namespace: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "minterctl=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;

    match cli.command {
        Commands::List { namespace } => list_command(client, namespace.or(cli.namespace)).await,
        Commands::Status { name, namespace } => {
            status_command(client, name, namespace.or(cli.namespace)).await
        }
    }
}

/// List all CredentialsRequest resources
async fn list_command(client: Client, namespace: Option<String>) -> Result<()> {
    let api: Api<CredentialsRequest> = if let Some(ns) = namespace {
        println!("Listing CredentialsRequest resources in namespace '{ns}'...");
        Api::namespaced(client, &ns)
    } else {
        println!("Listing CredentialsRequest resources in all namespaces...");
        Api::all(client)
    };

    let requests = api
        .list(&ListParams::default())
        .await
        .context("Failed to list CredentialsRequest resources")?;

    if requests.items.is_empty() {
        println!("No CredentialsRequest resources found.");
        return Ok(());
    }

    println!(
        "\n{:<35} {:<20} {:<12} {:<30}",
        "NAME", "NAMESPACE", "PROVISIONED", "SECRET"
    );
    println!("{}", "-".repeat(97));

    for request in requests.items {
        let name = request.metadata.name.as_deref().unwrap_or("<unknown>");
        let ns = request.metadata.namespace.as_deref().unwrap_or("<unknown>");
        let provisioned = if request.is_provisioned() { "True" } else { "False" };
        let secret = format!(
            "{}/{}",
            request.spec.secret_ref.namespace, request.spec.secret_ref.name
        );
        println!("{name:<35} {ns:<20} {provisioned:<12} {secret:<30}");
    }

    Ok(())
}

/// Show detailed status of a CredentialsRequest resource
async fn status_command(client: Client, name: String, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");

    println!("Status for CredentialsRequest '{ns}/{name}':\n");

    let api: Api<CredentialsRequest> = Api::namespaced(client, ns);
    let request = api
        .get(&name)
        .await
        .with_context(|| format!("Failed to get CredentialsRequest '{ns}/{name}'"))?;

    println!("Metadata:");
    println!(
        "  Name: {}",
        request.metadata.name.as_deref().unwrap_or("<unknown>")
    );
    println!(
        "  Namespace: {}",
        request.metadata.namespace.as_deref().unwrap_or("<unknown>")
    );
    if let Some(generation) = request.metadata.generation {
        println!("  Generation: {generation}");
    }
    if request.metadata.deletion_timestamp.is_some() {
        println!("  Deletion: pending (finalizer gated)");
    }

    println!("\nSpec:");
    println!("  Cluster Name: {}", request.spec.cluster_name);
    println!("  Cluster ID: {}", request.spec.cluster_id);
    println!(
        "  Secret: {}/{}",
        request.spec.secret_ref.namespace, request.spec.secret_ref.name
    );

    match &request.status {
        Some(status) => {
            println!("\nStatus:");
            println!("  Provisioned: {}", status.provisioned);
            println!("  Last Sync Generation: {}", status.last_sync_generation);
            if let Some(timestamp) = &status.last_sync_timestamp {
                println!("  Last Sync Time: {timestamp}");
            }
            if let Some(provider_status) = &status.provider_status {
                println!("  Provider Status: {provider_status}");
            }
        }
        None => {
            println!("\nStatus: No status available (resource may not have been reconciled yet)");
        }
    }

    Ok(())
}
