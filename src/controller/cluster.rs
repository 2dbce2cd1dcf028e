//! # Cluster Access
//!
//! Narrow seam over the Kubernetes API exposing exactly the operations the
//! reconciler and actuator need: CredentialsRequest CRUD (including the
//! status subresource) and Secret CRUD.
//!
//! The production implementation wraps `kube::Client`; tests use an
//! in-memory fake. Every call carries the configured remote-call deadline.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use tracing::debug;

use crate::constants::FIELD_MANAGER;
use crate::crd::CredentialsRequest;

/// Capability surface over the orchestration platform
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Fetch a CredentialsRequest, returning None when it does not exist
    async fn get_credentials_request(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<CredentialsRequest>, kube::Error>;

    /// Replace a CredentialsRequest (metadata/spec, not status)
    async fn update_credentials_request(
        &self,
        request: &CredentialsRequest,
    ) -> Result<CredentialsRequest, kube::Error>;

    /// Write the status subresource of a CredentialsRequest
    async fn update_credentials_request_status(
        &self,
        request: &CredentialsRequest,
    ) -> Result<(), kube::Error>;

    /// List all CredentialsRequests across namespaces
    async fn list_credentials_requests(&self) -> Result<Vec<CredentialsRequest>, kube::Error>;

    /// Fetch a Secret, returning None when it does not exist
    async fn get_secret(&self, namespace: &str, name: &str)
        -> Result<Option<Secret>, kube::Error>;

    /// Create a Secret
    async fn create_secret(&self, secret: &Secret) -> Result<(), kube::Error>;

    /// Replace an existing Secret
    async fn update_secret(&self, secret: &Secret) -> Result<(), kube::Error>;
}

/// Production [`ClusterApi`] backed by `kube::Client`
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    timeout: Duration,
}

impl KubeCluster {
    /// Create a new cluster accessor with the given remote-call deadline
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn requests(&self, namespace: &str) -> Api<CredentialsRequest> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Apply the remote-call deadline to a Kubernetes API future.
    /// Elapsed deadlines surface as service errors, which the error taxonomy
    /// treats as transient.
    async fn with_deadline<T>(
        &self,
        fut: impl Future<Output = Result<T, kube::Error>> + Send,
    ) -> Result<T, kube::Error> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(elapsed) => Err(kube::Error::Service(Box::new(elapsed))),
        }
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn get_credentials_request(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<CredentialsRequest>, kube::Error> {
        self.with_deadline(self.requests(namespace).get_opt(name))
            .await
    }

    async fn update_credentials_request(
        &self,
        request: &CredentialsRequest,
    ) -> Result<CredentialsRequest, kube::Error> {
        let namespace = request.namespace().unwrap_or_else(|| "default".to_string());
        let name = request.name_any();
        debug!(request = %name, namespace = %namespace, "Updating CredentialsRequest");
        self.with_deadline(self.requests(&namespace).replace(
            &name,
            &PostParams::default(),
            request,
        ))
        .await
    }

    async fn update_credentials_request_status(
        &self,
        request: &CredentialsRequest,
    ) -> Result<(), kube::Error> {
        let namespace = request.namespace().unwrap_or_else(|| "default".to_string());
        let name = request.name_any();
        let patch = serde_json::json!({ "status": request.status });
        self.with_deadline(self.requests(&namespace).patch_status(
            &name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&patch),
        ))
        .await?;
        Ok(())
    }

    async fn list_credentials_requests(&self) -> Result<Vec<CredentialsRequest>, kube::Error> {
        let api: Api<CredentialsRequest> = Api::all(self.client.clone());
        let list = self
            .with_deadline(api.list(&kube::api::ListParams::default()))
            .await?;
        Ok(list.items)
    }

    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Secret>, kube::Error> {
        self.with_deadline(self.secrets(namespace).get_opt(name))
            .await
    }

    async fn create_secret(&self, secret: &Secret) -> Result<(), kube::Error> {
        let namespace = secret.namespace().unwrap_or_else(|| "default".to_string());
        self.with_deadline(
            self.secrets(&namespace)
                .create(&PostParams::default(), secret),
        )
        .await?;
        Ok(())
    }

    async fn update_secret(&self, secret: &Secret) -> Result<(), kube::Error> {
        let namespace = secret.namespace().unwrap_or_else(|| "default".to_string());
        let name = secret.name_any();
        self.with_deadline(
            self.secrets(&namespace)
                .replace(&name, &PostParams::default(), secret),
        )
        .await?;
        Ok(())
    }
}

/// In-memory [`ClusterApi`] for tests, the analog of a fake API server.
#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use kube::core::ErrorResponse;

    fn object_key(namespace: &str, name: &str) -> String {
        format!("{namespace}/{name}")
    }

    fn not_found(kind: &str, key: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{kind} \"{key}\" not found"),
            reason: "NotFound".to_string(),
            code: 404,
        })
    }

    fn already_exists(kind: &str, key: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{kind} \"{key}\" already exists"),
            reason: "AlreadyExists".to_string(),
            code: 409,
        })
    }

    #[derive(Default)]
    pub(crate) struct FakeCluster {
        requests: Mutex<HashMap<String, CredentialsRequest>>,
        secrets: Mutex<HashMap<String, Secret>>,
    }

    impl FakeCluster {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn add_request(&self, request: CredentialsRequest) {
            let key = object_key(
                request.metadata.namespace.as_deref().unwrap_or("default"),
                request.metadata.name.as_deref().unwrap_or(""),
            );
            self.requests.lock().unwrap().insert(key, request);
        }

        pub(crate) fn add_secret(&self, secret: Secret) {
            let key = object_key(
                secret.metadata.namespace.as_deref().unwrap_or("default"),
                secret.metadata.name.as_deref().unwrap_or(""),
            );
            self.secrets.lock().unwrap().insert(key, secret);
        }

        pub(crate) fn request(&self, namespace: &str, name: &str) -> Option<CredentialsRequest> {
            self.requests
                .lock()
                .unwrap()
                .get(&object_key(namespace, name))
                .cloned()
        }

        pub(crate) fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
            self.secrets
                .lock()
                .unwrap()
                .get(&object_key(namespace, name))
                .cloned()
        }
    }

    #[async_trait]
    impl ClusterApi for FakeCluster {
        async fn get_credentials_request(
            &self,
            namespace: &str,
            name: &str,
        ) -> Result<Option<CredentialsRequest>, kube::Error> {
            Ok(self.request(namespace, name))
        }

        async fn update_credentials_request(
            &self,
            request: &CredentialsRequest,
        ) -> Result<CredentialsRequest, kube::Error> {
            let key = object_key(
                request.metadata.namespace.as_deref().unwrap_or("default"),
                request.metadata.name.as_deref().unwrap_or(""),
            );
            let mut requests = self.requests.lock().unwrap();
            if !requests.contains_key(&key) {
                return Err(not_found("credentialsrequests.credminter.openshift.io", &key));
            }
            requests.insert(key, request.clone());
            Ok(request.clone())
        }

        async fn update_credentials_request_status(
            &self,
            request: &CredentialsRequest,
        ) -> Result<(), kube::Error> {
            let key = object_key(
                request.metadata.namespace.as_deref().unwrap_or("default"),
                request.metadata.name.as_deref().unwrap_or(""),
            );
            let mut requests = self.requests.lock().unwrap();
            match requests.get_mut(&key) {
                Some(stored) => {
                    stored.status = request.status.clone();
                    Ok(())
                }
                None => Err(not_found("credentialsrequests.credminter.openshift.io", &key)),
            }
        }

        async fn list_credentials_requests(&self) -> Result<Vec<CredentialsRequest>, kube::Error> {
            Ok(self.requests.lock().unwrap().values().cloned().collect())
        }

        async fn get_secret(
            &self,
            namespace: &str,
            name: &str,
        ) -> Result<Option<Secret>, kube::Error> {
            Ok(self.secret(namespace, name))
        }

        async fn create_secret(&self, secret: &Secret) -> Result<(), kube::Error> {
            let key = object_key(
                secret.metadata.namespace.as_deref().unwrap_or("default"),
                secret.metadata.name.as_deref().unwrap_or(""),
            );
            let mut secrets = self.secrets.lock().unwrap();
            if secrets.contains_key(&key) {
                return Err(already_exists("secrets", &key));
            }
            secrets.insert(key, secret.clone());
            Ok(())
        }

        async fn update_secret(&self, secret: &Secret) -> Result<(), kube::Error> {
            let key = object_key(
                secret.metadata.namespace.as_deref().unwrap_or("default"),
                secret.metadata.name.as_deref().unwrap_or(""),
            );
            let mut secrets = self.secrets.lock().unwrap();
            if !secrets.contains_key(&key) {
                return Err(not_found("secrets", &key));
            }
            secrets.insert(key, secret.clone());
            Ok(())
        }
    }
}
