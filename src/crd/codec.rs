//! # Provider Payload Codec
//!
//! Bidirectional conversion between the opaque JSON payloads carried in a
//! CredentialsRequest and provider-typed records.
//!
//! The conversion is deterministic and round-trip exact; codec failures
//! abort the reconcile and surface as retryable errors.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors from encoding or decoding provider payloads
#[derive(Debug, Error)]
pub enum CodecError {
    /// The request carries no providerSpec payload at all
    #[error("request has no providerSpec payload")]
    MissingProviderSpec,
    /// The payload does not decode into the provider's typed form
    #[error("failed to encode or decode provider payload: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Decode the opaque `spec.providerSpec` payload into a provider-typed value
pub fn decode_provider_spec<T: DeserializeOwned>(raw: Option<&Value>) -> Result<T, CodecError> {
    let raw = raw.ok_or(CodecError::MissingProviderSpec)?;
    Ok(serde_json::from_value(raw.clone())?)
}

/// Decode the opaque `status.providerStatus` payload into a provider-typed
/// value, defaulting when no status has been recorded yet
pub fn decode_provider_status<T: DeserializeOwned + Default>(
    raw: Option<&Value>,
) -> Result<T, CodecError> {
    match raw {
        Some(raw) => Ok(serde_json::from_value(raw.clone())?),
        None => Ok(T::default()),
    }
}

/// Encode a provider-typed status record into its opaque form
pub fn encode_provider_status<T: Serialize>(status: &T) -> Result<Value, CodecError> {
    Ok(serde_json::to_value(status)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{AwsProviderSpec, AwsProviderStatus, StatementEntry};

    fn sample_spec() -> AwsProviderSpec {
        AwsProviderSpec {
            statement_entries: vec![StatementEntry {
                effect: "Allow".to_string(),
                action: vec!["s3:CreateBucket".to_string(), "s3:DeleteBucket".to_string()],
                resource: "*".to_string(),
            }],
        }
    }

    #[test]
    fn test_provider_spec_round_trip() {
        let spec = sample_spec();
        let encoded = serde_json::to_value(&spec).unwrap();
        let decoded: AwsProviderSpec = decode_provider_spec(Some(&encoded)).unwrap();
        assert_eq!(spec, decoded);
    }

    #[test]
    fn test_provider_status_round_trip() {
        let status = AwsProviderStatus {
            user: "mycluster-test-aws-user".to_string(),
        };
        let encoded = encode_provider_status(&status).unwrap();
        let decoded: AwsProviderStatus = decode_provider_status(Some(&encoded)).unwrap();
        assert_eq!(status, decoded);
    }

    #[test]
    fn test_missing_provider_spec_is_an_error() {
        let result: Result<AwsProviderSpec, _> = decode_provider_spec(None);
        assert!(matches!(result, Err(CodecError::MissingProviderSpec)));
    }

    #[test]
    fn test_missing_provider_status_defaults() {
        let decoded: AwsProviderStatus = decode_provider_status(None).unwrap();
        assert_eq!(decoded, AwsProviderStatus::default());
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let bogus = serde_json::json!({"statementEntries": "not-a-list"});
        let result: Result<AwsProviderSpec, _> = decode_provider_spec(Some(&bogus));
        assert!(matches!(result, Err(CodecError::Serde(_))));
    }
}
