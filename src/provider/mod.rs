//! # Provider Actuators
//!
//! A provider actuator drives the cloud-side half of a CredentialsRequest:
//! it can tell whether the principal exists, provision it from scratch,
//! converge an existing principal to the requested state, and tear it down.
//!
//! The reconciler depends only on this capability set; provider specifics
//! (today, AWS) live behind it.

pub mod aws;

use async_trait::async_trait;

use crate::controller::reconciler::ReconcilerError;
use crate::crd::CredentialsRequest;

/// The four-operation contract every provider implements
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Whether the cloud principal for this request exists
    async fn exists(&self, request: &CredentialsRequest) -> Result<bool, ReconcilerError>;

    /// Provision the principal, policy, access key, and secret from scratch.
    /// Stamps the provider status payload on the request.
    async fn create(&self, request: &mut CredentialsRequest) -> Result<(), ReconcilerError>;

    /// Converge an existing principal and its satellites to the spec.
    /// Stamps the provider status payload on the request.
    async fn update(&self, request: &mut CredentialsRequest) -> Result<(), ReconcilerError>;

    /// Remove the principal and its cloud-side satellites
    async fn delete(&self, request: &CredentialsRequest) -> Result<(), ReconcilerError>;
}
