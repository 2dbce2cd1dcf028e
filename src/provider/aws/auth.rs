//! # Root Credentials
//!
//! Loads the controller's own AWS credentials from their well-known secret.
//! These are the credentials the controller uses to call the IAM API, not
//! the credentials it mints.

use anyhow::anyhow;
use tracing::debug;

use crate::config::ControllerConfig;
use crate::constants::{SECRET_DATA_ACCESS_KEY_ID, SECRET_DATA_SECRET_ACCESS_KEY};
use crate::controller::cluster::ClusterApi;
use crate::controller::reconciler::ReconcilerError;
use crate::controller::secrets::decode_credential_value;

/// The controller's root AWS credentials
#[derive(Clone)]
pub struct RootCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for RootCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootCredentials")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

/// Read the root credentials secret and decode its credential material.
///
/// The values carry the same double base64 encoding as the secrets the
/// controller writes.
pub async fn load_root_credentials(
    cluster: &dyn ClusterApi,
    config: &ControllerConfig,
) -> Result<RootCredentials, ReconcilerError> {
    let namespace = &config.root_secret_namespace;
    let name = &config.root_secret_name;

    let secret = cluster
        .get_secret(namespace, name)
        .await?
        .ok_or_else(|| anyhow!("root credentials secret {namespace}/{name} not found"))?;

    let data = secret
        .data
        .as_ref()
        .ok_or_else(|| anyhow!("root credentials secret {namespace}/{name} has no data"))?;

    let access_key_id = data
        .get(SECRET_DATA_ACCESS_KEY_ID)
        .and_then(decode_credential_value)
        .ok_or_else(|| {
            anyhow!("root credentials secret {namespace}/{name} is missing {SECRET_DATA_ACCESS_KEY_ID}")
        })?;

    let secret_access_key = data
        .get(SECRET_DATA_SECRET_ACCESS_KEY)
        .and_then(decode_credential_value)
        .ok_or_else(|| {
            anyhow!(
                "root credentials secret {namespace}/{name} is missing {SECRET_DATA_SECRET_ACCESS_KEY}"
            )
        })?;

    debug!(
        secret = %name,
        namespace = %namespace,
        "Loaded root AWS credentials"
    );

    Ok(RootCredentials {
        access_key_id,
        secret_access_key,
    })
}
