//! # AWS IAM Client
//!
//! Narrow facade over the IAM operations the actuator needs. The production
//! implementation wraps `aws-sdk-iam`; tests mock the trait.
//!
//! The single error code the rest of the controller cares about is
//! `NoSuchEntity`, surfaced as its own variant so callers can branch on
//! "principal does not exist" without string matching.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_iam::error::{ProvideErrorMetadata, SdkError};
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

/// Errors from the IAM API
#[derive(Debug, Error)]
pub enum IamError {
    /// The addressed user, policy, or access key does not exist
    #[error("no such entity")]
    NoSuchEntity,
    /// The call did not complete within the remote-call deadline
    #[error("iam api call exceeded its deadline")]
    Timeout,
    /// Any other IAM API failure
    #[error("iam api error: {0}")]
    Api(String),
}

/// An IAM user record
#[derive(Debug, Clone, PartialEq)]
pub struct IamUser {
    pub user_name: String,
    pub user_id: String,
}

/// A freshly minted access key pair.
///
/// The secret half is only revealed at creation time; it must be delivered
/// to the destination secret before anything else can fail.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessKeyPair {
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// IAM operations used by the actuator
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IamClient: Send + Sync {
    /// Fetch a user. Returns [`IamError::NoSuchEntity`] when it does not exist.
    async fn get_user(&self, user_name: &str) -> Result<IamUser, IamError>;

    /// Create a user
    async fn create_user(&self, user_name: &str) -> Result<IamUser, IamError>;

    /// Delete a user. The user must have no access keys or inline policies left.
    async fn delete_user(&self, user_name: &str) -> Result<(), IamError>;

    /// Attach or replace an inline policy on a user (idempotent replace)
    async fn put_user_policy(
        &self,
        user_name: &str,
        policy_name: &str,
        policy_document: &str,
    ) -> Result<(), IamError>;

    /// Remove an inline policy from a user
    async fn delete_user_policy(&self, user_name: &str, policy_name: &str)
        -> Result<(), IamError>;

    /// IDs of the user's active access keys
    async fn list_access_keys(&self, user_name: &str) -> Result<Vec<String>, IamError>;

    /// Mint a new access key for a user
    async fn create_access_key(&self, user_name: &str) -> Result<AccessKeyPair, IamError>;

    /// Delete an access key from a user
    async fn delete_access_key(&self, user_name: &str, access_key_id: &str)
        -> Result<(), IamError>;
}

/// Production [`IamClient`] backed by `aws-sdk-iam`
pub struct AwsIamClient {
    client: aws_sdk_iam::Client,
    timeout: Duration,
}

impl AwsIamClient {
    /// Build a client from explicit credentials (the controller's root
    /// credentials, read from their well-known secret).
    pub fn new(
        access_key_id: &str,
        secret_access_key: &str,
        region: &str,
        timeout: Duration,
    ) -> Self {
        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "cred-minter-root-secret",
        );
        let config = aws_sdk_iam::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .build();
        Self {
            client: aws_sdk_iam::Client::from_conf(config),
            timeout,
        }
    }

    /// Apply the remote-call deadline to an IAM call
    async fn with_deadline<T>(
        &self,
        fut: impl Future<Output = Result<T, IamError>> + Send,
    ) -> Result<T, IamError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| IamError::Timeout)?
    }
}

/// Map an SDK error onto the controller's taxonomy
fn classify<E>(err: SdkError<E>) -> IamError
where
    E: ProvideErrorMetadata + std::fmt::Debug,
{
    match err.code() {
        Some("NoSuchEntity") => IamError::NoSuchEntity,
        _ => IamError::Api(format!("{err:?}")),
    }
}

#[async_trait]
impl IamClient for AwsIamClient {
    async fn get_user(&self, user_name: &str) -> Result<IamUser, IamError> {
        let output = self
            .with_deadline(async {
                self.client
                    .get_user()
                    .user_name(user_name)
                    .send()
                    .await
                    .map_err(classify)
            })
            .await?;
        let user = output
            .user
            .ok_or_else(|| IamError::Api("GetUser response carried no user".to_string()))?;
        Ok(IamUser {
            user_name: user.user_name().to_string(),
            user_id: user.user_id().to_string(),
        })
    }

    async fn create_user(&self, user_name: &str) -> Result<IamUser, IamError> {
        let output = self
            .with_deadline(async {
                self.client
                    .create_user()
                    .user_name(user_name)
                    .send()
                    .await
                    .map_err(classify)
            })
            .await?;
        let user = output
            .user
            .ok_or_else(|| IamError::Api("CreateUser response carried no user".to_string()))?;
        Ok(IamUser {
            user_name: user.user_name().to_string(),
            user_id: user.user_id().to_string(),
        })
    }

    async fn delete_user(&self, user_name: &str) -> Result<(), IamError> {
        self.with_deadline(async {
            self.client
                .delete_user()
                .user_name(user_name)
                .send()
                .await
                .map_err(classify)
        })
        .await?;
        Ok(())
    }

    async fn put_user_policy(
        &self,
        user_name: &str,
        policy_name: &str,
        policy_document: &str,
    ) -> Result<(), IamError> {
        self.with_deadline(async {
            self.client
                .put_user_policy()
                .user_name(user_name)
                .policy_name(policy_name)
                .policy_document(policy_document)
                .send()
                .await
                .map_err(classify)
        })
        .await?;
        Ok(())
    }

    async fn delete_user_policy(
        &self,
        user_name: &str,
        policy_name: &str,
    ) -> Result<(), IamError> {
        self.with_deadline(async {
            self.client
                .delete_user_policy()
                .user_name(user_name)
                .policy_name(policy_name)
                .send()
                .await
                .map_err(classify)
        })
        .await?;
        Ok(())
    }

    async fn list_access_keys(&self, user_name: &str) -> Result<Vec<String>, IamError> {
        let output = self
            .with_deadline(async {
                self.client
                    .list_access_keys()
                    .user_name(user_name)
                    .send()
                    .await
                    .map_err(classify)
            })
            .await?;
        Ok(output
            .access_key_metadata()
            .iter()
            .filter_map(|metadata| metadata.access_key_id().map(ToString::to_string))
            .collect())
    }

    async fn create_access_key(&self, user_name: &str) -> Result<AccessKeyPair, IamError> {
        let output = self
            .with_deadline(async {
                self.client
                    .create_access_key()
                    .user_name(user_name)
                    .send()
                    .await
                    .map_err(classify)
            })
            .await?;
        let key = output.access_key.ok_or_else(|| {
            IamError::Api("CreateAccessKey response carried no access key".to_string())
        })?;
        Ok(AccessKeyPair {
            access_key_id: key.access_key_id().to_string(),
            secret_access_key: key.secret_access_key().to_string(),
        })
    }

    async fn delete_access_key(
        &self,
        user_name: &str,
        access_key_id: &str,
    ) -> Result<(), IamError> {
        self.with_deadline(async {
            self.client
                .delete_access_key()
                .user_name(user_name)
                .access_key_id(access_key_id)
                .send()
                .await
                .map_err(classify)
        })
        .await?;
        Ok(())
    }
}
