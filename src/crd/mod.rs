//! # Custom Resource Definitions
//!
//! CRD types for the credentials minting controller.
//!
//! A `CredentialsRequest` declares a desired set of cloud credentials: the
//! permissions they should carry (as an opaque provider payload) and the
//! secret the minted credential material should be delivered to.

use kube::CustomResource;
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod codec;
mod provider;

pub use codec::{decode_provider_spec, decode_provider_status, encode_provider_status, CodecError};
pub use provider::{AwsProviderSpec, AwsProviderStatus, StatementEntry};

use crate::constants::FINALIZER_DEPROVISION;

/// CredentialsRequest Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: credminter.openshift.io/v1beta1
/// kind: CredentialsRequest
/// metadata:
///   name: openshift-image-registry
///   namespace: openshift-image-registry
/// spec:
///   clusterName: mycluster
///   clusterID: e415fe1c-f894-11e8-8eb2-f2801f1b9fd1
///   secretRef:
///     namespace: openshift-image-registry
///     name: installer-cloud-credentials
///   providerSpec:
///     statementEntries:
///       - effect: Allow
///         action: ["s3:CreateBucket", "s3:DeleteBucket"]
///         resource: "*"
/// ```
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "CredentialsRequest",
    group = "credminter.openshift.io",
    version = "v1beta1",
    namespaced,
    status = "CredentialsRequestStatus",
    shortname = "credreq",
    printcolumn = r#"{"name":"Provisioned", "type":"boolean", "jsonPath":".status.provisioned"}"#,
    printcolumn = r#"{"name":"Secret", "type":"string", "jsonPath":".spec.secretRef.name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsRequestSpec {
    /// Name of the cluster the credentials are minted for.
    /// Combined with the request name to derive the cloud principal name.
    pub cluster_name: String,
    /// Unique identifier of the cluster
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
    /// Destination secret for the minted credential material
    pub secret_ref: SecretRef,
    /// Opaque provider-specific payload describing the requested permissions.
    /// Decoded by the provider codec; the controller core never inspects it.
    #[serde(default)]
    #[schemars(schema_with = "opaque_object_schema")]
    pub provider_spec: Option<serde_json::Value>,
}

/// Reference to the namespace/name of the destination secret
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    /// Namespace of the destination secret
    pub namespace: String,
    /// Name of the destination secret
    pub name: String,
}

/// Status of the CredentialsRequest resource
///
/// Owned entirely by the controller.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsRequestStatus {
    /// True iff the last reconcile observed the cloud principal, a matching
    /// inline policy, and a secret holding a live access key
    #[serde(default)]
    pub provisioned: bool,
    /// Spec generation the status reflects
    #[serde(default)]
    pub last_sync_generation: i64,
    /// Timestamp of the last successful sync (RFC3339)
    #[serde(default)]
    pub last_sync_timestamp: Option<String>,
    /// Opaque provider-specific status payload (e.g. the created IAM user name)
    #[serde(default)]
    #[schemars(schema_with = "opaque_object_schema")]
    pub provider_status: Option<serde_json::Value>,
}

/// Schema for the opaque provider payloads
///
/// The payloads are heterogeneous across providers, so the CRD schema must
/// preserve unknown fields instead of constraining them.
fn opaque_object_schema(_gen: &mut SchemaGenerator) -> Schema {
    let schema_value = serde_json::json!({
        "type": "object",
        "x-kubernetes-preserve-unknown-fields": true,
        "nullable": true,
    });
    serde_json::from_value(schema_value).expect("Failed to create Schema for opaque provider payload")
}

impl CredentialsRequest {
    /// Whether the deprovision finalizer is present on this request
    pub fn has_deprovision_finalizer(&self) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .map(|finalizers| finalizers.iter().any(|f| f == FINALIZER_DEPROVISION))
            .unwrap_or(false)
    }

    /// Whether a deletion has been requested for this object
    pub fn is_terminating(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Provisioned flag from status, defaulting to false when status is unset
    pub fn is_provisioned(&self) -> bool {
        self.status.as_ref().map(|s| s.provisioned).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ObjectMeta;

    fn minimal_request() -> CredentialsRequest {
        CredentialsRequest {
            metadata: ObjectMeta {
                name: Some("component-a".to_string()),
                namespace: Some("myproject".to_string()),
                ..Default::default()
            },
            spec: CredentialsRequestSpec {
                cluster_name: "testcluster".to_string(),
                cluster_id: "e415fe1c-f894-11e8-8eb2-f2801f1b9fd1".to_string(),
                secret_ref: SecretRef {
                    namespace: "myproject".to_string(),
                    name: "test-secret".to_string(),
                },
                provider_spec: None,
            },
            status: None,
        }
    }

    #[test]
    fn test_finalizer_detection() {
        let mut cr = minimal_request();
        assert!(!cr.has_deprovision_finalizer());

        cr.metadata.finalizers = Some(vec![FINALIZER_DEPROVISION.to_string()]);
        assert!(cr.has_deprovision_finalizer());

        cr.metadata.finalizers = Some(vec!["something.else/finalizer".to_string()]);
        assert!(!cr.has_deprovision_finalizer());
    }

    #[test]
    fn test_provisioned_defaults_to_false() {
        let mut cr = minimal_request();
        assert!(!cr.is_provisioned());

        cr.status = Some(CredentialsRequestStatus {
            provisioned: true,
            ..Default::default()
        });
        assert!(cr.is_provisioned());
    }

    #[test]
    fn test_spec_serialization_casing() {
        let cr = minimal_request();
        let json = serde_json::to_value(&cr.spec).unwrap();
        assert!(json.get("clusterID").is_some());
        assert!(json.get("clusterName").is_some());
        assert!(json.get("secretRef").is_some());
    }
}
