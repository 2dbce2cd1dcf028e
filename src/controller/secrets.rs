//! # Target Secret Management
//!
//! Creates and updates the destination secret that mirrors a freshly minted
//! access key, and reads back the access key ID currently stored there.
//!
//! The ownership annotation is the single source of truth for which
//! CredentialsRequest a secret belongs to: a secret annotated for a different
//! request is never mutated.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::core::ObjectMeta;
use tracing::{info, warn};

use crate::constants::{
    ANNOTATION_CREDENTIALS_REQUEST, SECRET_DATA_ACCESS_KEY_ID, SECRET_DATA_SECRET_ACCESS_KEY,
};
use crate::controller::cluster::ClusterApi;
use crate::controller::reconciler::ReconcilerError;
use crate::crd::CredentialsRequest;

/// Ownership annotation value for a request: `<namespace>/<name>`
pub fn owner_annotation_value(request: &CredentialsRequest) -> String {
    format!(
        "{}/{}",
        request.metadata.namespace.as_deref().unwrap_or("default"),
        request.metadata.name.as_deref().unwrap_or("")
    )
}

/// Create or update the destination secret with freshly minted credentials.
///
/// Exactly one write is issued per successful call. Fails with
/// [`ReconcilerError::OwnershipConflict`] without mutating anything when the
/// secret is annotated for a different request.
pub async fn sync_secret(
    cluster: &dyn ClusterApi,
    request: &CredentialsRequest,
    access_key_id: &str,
    secret_access_key: &str,
) -> Result<(), ReconcilerError> {
    let secret_ref = &request.spec.secret_ref;
    let owner = owner_annotation_value(request);

    match cluster
        .get_secret(&secret_ref.namespace, &secret_ref.name)
        .await?
    {
        None => {
            info!(
                secret = %secret_ref.name,
                namespace = %secret_ref.namespace,
                "Creating secret with minted credentials"
            );
            let secret = Secret {
                metadata: ObjectMeta {
                    name: Some(secret_ref.name.clone()),
                    namespace: Some(secret_ref.namespace.clone()),
                    annotations: Some(BTreeMap::from([(
                        ANNOTATION_CREDENTIALS_REQUEST.to_string(),
                        owner,
                    )])),
                    ..Default::default()
                },
                data: Some(credential_data(access_key_id, secret_access_key)),
                type_: Some("Opaque".to_string()),
                ..Default::default()
            };
            cluster.create_secret(&secret).await?;
        }
        Some(mut secret) => {
            if let Some(current_owner) = secret
                .metadata
                .annotations
                .as_ref()
                .and_then(|annotations| annotations.get(ANNOTATION_CREDENTIALS_REQUEST))
            {
                if current_owner != &owner {
                    return Err(ReconcilerError::OwnershipConflict {
                        secret: format!("{}/{}", secret_ref.namespace, secret_ref.name),
                        owner: current_owner.clone(),
                    });
                }
            }

            info!(
                secret = %secret_ref.name,
                namespace = %secret_ref.namespace,
                "Updating secret with minted credentials"
            );
            secret
                .metadata
                .annotations
                .get_or_insert_with(BTreeMap::new)
                .insert(ANNOTATION_CREDENTIALS_REQUEST.to_string(), owner);
            secret.data = Some(credential_data(access_key_id, secret_access_key));
            cluster.update_secret(&secret).await?;
        }
    }

    Ok(())
}

/// Access key ID currently stored in the destination secret, or None when
/// the secret is absent or its contents cannot be decoded.
pub async fn existing_access_key_id(
    cluster: &dyn ClusterApi,
    request: &CredentialsRequest,
) -> Result<Option<String>, ReconcilerError> {
    let secret_ref = &request.spec.secret_ref;
    let Some(secret) = cluster
        .get_secret(&secret_ref.namespace, &secret_ref.name)
        .await?
    else {
        return Ok(None);
    };

    let Some(raw) = secret
        .data
        .as_ref()
        .and_then(|data| data.get(SECRET_DATA_ACCESS_KEY_ID))
    else {
        warn!(
            secret = %secret_ref.name,
            namespace = %secret_ref.namespace,
            "Secret exists but carries no access key ID"
        );
        return Ok(None);
    };

    match decode_credential_value(raw) {
        Some(access_key_id) => Ok(Some(access_key_id)),
        None => {
            warn!(
                secret = %secret_ref.name,
                namespace = %secret_ref.namespace,
                "Secret access key ID is not valid base64, treating as unreadable"
            );
            Ok(None)
        }
    }
}

/// Secret data for a credential pair.
///
/// Each credential string is base64-encoded before storage, on top of the
/// base64 the platform itself applies on the wire. Existing consumers decode
/// one layer, so this double encoding must be preserved.
fn credential_data(access_key_id: &str, secret_access_key: &str) -> BTreeMap<String, ByteString> {
    BTreeMap::from([
        (
            SECRET_DATA_ACCESS_KEY_ID.to_string(),
            encode_credential_value(access_key_id),
        ),
        (
            SECRET_DATA_SECRET_ACCESS_KEY.to_string(),
            encode_credential_value(secret_access_key),
        ),
    ])
}

fn encode_credential_value(value: &str) -> ByteString {
    ByteString(STANDARD.encode(value).into_bytes())
}

pub(crate) fn decode_credential_value(raw: &ByteString) -> Option<String> {
    let encoded = std::str::from_utf8(&raw.0).ok()?;
    let decoded = STANDARD.decode(encoded).ok()?;
    String::from_utf8(decoded).ok()
}
