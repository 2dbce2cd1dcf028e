//! # Provider Payloads
//!
//! Typed forms of the opaque provider payloads carried inside a
//! CredentialsRequest. Only the AWS shapes exist today; other providers add
//! their own types here and the codec handles them identically.

use serde::{Deserialize, Serialize};

/// AWS-specific provider payload carried opaquely in `spec.providerSpec`.
///
/// Describes the IAM permissions the minted credentials must carry, as a
/// list of policy statement entries translated into an inline user policy.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsProviderSpec {
    /// Statement entries rendered into the user's inline policy document
    #[serde(default)]
    pub statement_entries: Vec<StatementEntry>,
}

/// One statement of the requested IAM policy
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementEntry {
    /// "Allow" or "Deny"
    pub effect: String,
    /// IAM action names, e.g. "s3:CreateBucket"
    pub action: Vec<String>,
    /// Resource the statement applies to, e.g. "*"
    pub resource: String,
}

/// AWS-specific status payload carried opaquely in `status.providerStatus`.
///
/// Records the IAM user the controller created so subsequent reconciles and
/// the deprovision path address the same principal.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsProviderStatus {
    /// Name of the IAM user minted for this request
    #[serde(default)]
    pub user: String,
}
