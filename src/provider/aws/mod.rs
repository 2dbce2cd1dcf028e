//! # AWS Actuator
//!
//! Drives an IAM user, its inline policy, and its access key to the state a
//! CredentialsRequest declares, and tears them down on deprovision.
//!
//! The access key reconciliation honors the cloud's one-way-secret
//! constraint: the secret half of a key is only revealed at creation time,
//! so rotation always creates the replacement key first, delivers it to the
//! destination secret second, and deletes stale keys last. A crash between
//! creation and delivery leaves an orphaned key that the next reconcile
//! detects (the secret references a key the cloud no longer lists) and
//! cleans up.

pub mod auth;
pub mod client;
pub mod policy;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::ControllerConfig;
use crate::constants::MAX_IAM_USER_NAME_LEN;
use crate::controller::cluster::ClusterApi;
use crate::controller::reconciler::ReconcilerError;
use crate::controller::secrets;
use crate::crd::{
    decode_provider_spec, decode_provider_status, encode_provider_status, AwsProviderSpec,
    AwsProviderStatus, CredentialsRequest,
};
use crate::observability::metrics;

use self::auth::RootCredentials;
use self::client::{AwsIamClient, IamClient, IamError};

/// Builds an [`IamClient`] from the controller's root credentials.
/// Injected so tests can substitute a mock.
pub type IamClientBuilder =
    Box<dyn Fn(&RootCredentials) -> Result<Arc<dyn IamClient>, ReconcilerError> + Send + Sync>;

/// AWS implementation of the [`Actuator`](crate::provider::Actuator) contract
pub struct AwsActuator {
    cluster: Arc<dyn ClusterApi>,
    config: ControllerConfig,
    iam_builder: IamClientBuilder,
}

impl AwsActuator {
    /// Create an actuator that talks to the real IAM API
    pub fn new(cluster: Arc<dyn ClusterApi>, config: ControllerConfig) -> Self {
        let region = config.aws_region.clone();
        let timeout = config.remote_call_timeout();
        let iam_builder: IamClientBuilder = Box::new(move |credentials: &RootCredentials| {
            Ok(Arc::new(AwsIamClient::new(
                &credentials.access_key_id,
                &credentials.secret_access_key,
                &region,
                timeout,
            )) as Arc<dyn IamClient>)
        });
        Self {
            cluster,
            config,
            iam_builder,
        }
    }

    /// Create an actuator with an injected IAM client builder
    pub fn with_client_builder(
        cluster: Arc<dyn ClusterApi>,
        config: ControllerConfig,
        iam_builder: IamClientBuilder,
    ) -> Self {
        Self {
            cluster,
            config,
            iam_builder,
        }
    }

    /// Read the root credentials and build an IAM client from them
    async fn iam_client(&self) -> Result<Arc<dyn IamClient>, ReconcilerError> {
        let credentials = auth::load_root_credentials(self.cluster.as_ref(), &self.config).await?;
        (self.iam_builder)(&credentials)
    }

    /// The IAM user name for a request.
    ///
    /// Once a user has been minted its name is recorded in the provider
    /// status and reused verbatim; until then the name is derived from the
    /// cluster and request names.
    fn user_name(&self, request: &CredentialsRequest) -> Result<String, ReconcilerError> {
        let status: AwsProviderStatus = decode_provider_status(
            request
                .status
                .as_ref()
                .and_then(|status| status.provider_status.as_ref()),
        )?;
        if !status.user.is_empty() {
            return Ok(status.user);
        }
        Ok(derived_user_name(
            &request.spec.cluster_name,
            request.metadata.name.as_deref().unwrap_or(""),
        ))
    }

    /// Shared convergence path for create and update.
    ///
    /// `create_user` is true when the existence probe found no principal;
    /// every other step is identical between the two operations.
    async fn sync(
        &self,
        request: &mut CredentialsRequest,
        create_user: bool,
    ) -> Result<(), ReconcilerError> {
        let provider_spec: AwsProviderSpec =
            decode_provider_spec(request.spec.provider_spec.as_ref())?;
        let user_name = self.user_name(request)?;
        let iam = self.iam_client().await?;

        if create_user {
            info!(user = %user_name, "Creating IAM user");
            // TODO: tag the user with the cluster ID so orphaned users from
            // deleted clusters can be swept.
            iam.create_user(&user_name).await?;
        }

        // Unconditional replace; the API treats PutUserPolicy as an
        // idempotent overwrite, which also corrects external drift.
        let document = policy::policy_document(&provider_spec.statement_entries)?;
        iam.put_user_policy(&user_name, &policy::policy_name(&user_name), &document)
            .await?;

        self.sync_access_key(iam.as_ref(), request, &user_name)
            .await?;

        let status = request.status.get_or_insert_with(Default::default);
        status.provider_status = Some(encode_provider_status(&AwsProviderStatus {
            user: user_name,
        })?);
        Ok(())
    }

    /// Reconcile the user's access keys against the destination secret.
    ///
    /// Post-condition on success: the user has exactly one active access key
    /// and the destination secret holds its full material.
    async fn sync_access_key(
        &self,
        iam: &dyn IamClient,
        request: &CredentialsRequest,
        user_name: &str,
    ) -> Result<(), ReconcilerError> {
        let stored = secrets::existing_access_key_id(self.cluster.as_ref(), request).await?;
        let active = iam.list_access_keys(user_name).await?;
        let stored_is_live = stored
            .as_ref()
            .map(|id| active.contains(id))
            .unwrap_or(false);

        if stored_is_live {
            // The secret already holds a live key; at most prune extras.
            for key_id in active.iter().filter(|id| Some(*id) != stored.as_ref()) {
                warn!(
                    user = %user_name,
                    access_key_id = %key_id,
                    "Deleting extra access key"
                );
                iam.delete_access_key(user_name, key_id).await?;
            }
            return Ok(());
        }

        // The secret is absent, unreadable, or references a key the cloud no
        // longer lists. Create first, deliver second, delete stale keys last.
        info!(user = %user_name, "Minting new access key");
        let pair = iam.create_access_key(user_name).await?;
        secrets::sync_secret(
            self.cluster.as_ref(),
            request,
            &pair.access_key_id,
            &pair.secret_access_key,
        )
        .await?;
        for key_id in active.iter().filter(|id| **id != pair.access_key_id) {
            warn!(
                user = %user_name,
                access_key_id = %key_id,
                "Deleting stale access key"
            );
            iam.delete_access_key(user_name, key_id).await?;
        }
        if !active.is_empty() {
            metrics::increment_access_keys_rotated();
        }
        Ok(())
    }
}

#[async_trait]
impl crate::provider::Actuator for AwsActuator {
    async fn exists(&self, request: &CredentialsRequest) -> Result<bool, ReconcilerError> {
        let user_name = self.user_name(request)?;
        let iam = self.iam_client().await?;
        match iam.get_user(&user_name).await {
            Ok(_) => Ok(true),
            Err(IamError::NoSuchEntity) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn create(&self, request: &mut CredentialsRequest) -> Result<(), ReconcilerError> {
        self.sync(request, true).await
    }

    async fn update(&self, request: &mut CredentialsRequest) -> Result<(), ReconcilerError> {
        self.sync(request, false).await
    }

    async fn delete(&self, request: &CredentialsRequest) -> Result<(), ReconcilerError> {
        let user_name = self.user_name(request)?;
        let iam = self.iam_client().await?;
        info!(user = %user_name, "Deprovisioning IAM user");

        // Every step tolerates NoSuchEntity so deletion is idempotent across
        // interrupted attempts.
        match iam.list_access_keys(&user_name).await {
            Ok(keys) => {
                for key_id in keys {
                    match iam.delete_access_key(&user_name, &key_id).await {
                        Ok(()) | Err(IamError::NoSuchEntity) => {}
                        Err(err) => return Err(err.into()),
                    }
                }
            }
            Err(IamError::NoSuchEntity) => {}
            Err(err) => return Err(err.into()),
        }

        match iam
            .delete_user_policy(&user_name, &policy::policy_name(&user_name))
            .await
        {
            Ok(()) | Err(IamError::NoSuchEntity) => {}
            Err(err) => return Err(err.into()),
        }

        match iam.delete_user(&user_name).await {
            Ok(()) | Err(IamError::NoSuchEntity) => {}
            Err(err) => return Err(err.into()),
        }

        Ok(())
    }
}

/// Derive the IAM user name for a request from its cluster and request
/// names, sanitized and truncated to the cloud's identifier constraints.
fn derived_user_name(cluster_name: &str, request_name: &str) -> String {
    let combined = format!("{cluster_name}-{request_name}");
    let sanitized: String = combined
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || "+=,.@_-".contains(c) {
                c
            } else {
                '-'
            }
        })
        .collect();
    sanitized.chars().take(MAX_IAM_USER_NAME_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_user_name_is_deterministic() {
        let first = derived_user_name("testcluster", "openshift-component-a");
        let second = derived_user_name("testcluster", "openshift-component-a");
        assert_eq!(first, second);
        assert_eq!(first, "testcluster-openshift-component-a");
    }

    #[test]
    fn test_derived_user_name_sanitizes_invalid_characters() {
        assert_eq!(
            derived_user_name("my cluster", "comp/one"),
            "my-cluster-comp-one"
        );
    }

    #[test]
    fn test_derived_user_name_truncates() {
        let long = "a".repeat(80);
        let name = derived_user_name(&long, "component");
        assert_eq!(name.len(), MAX_IAM_USER_NAME_LEN);
    }
}
