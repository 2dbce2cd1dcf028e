//! # Constants
//!
//! Well-known strings and default values used throughout the controller.

/// Finalizer placed on every CredentialsRequest the controller manages.
/// Blocks deletion until cloud-side cleanup has succeeded.
pub const FINALIZER_DEPROVISION: &str = "credminter.openshift.io/deprovision";

/// Annotation stamped on target secrets linking them back to the owning
/// CredentialsRequest as `<namespace>/<name>`. A secret carrying this
/// annotation for a different request is never mutated.
pub const ANNOTATION_CREDENTIALS_REQUEST: &str = "credminter.openshift.io/credentials-request";

/// Secret data key holding the AWS access key ID.
pub const SECRET_DATA_ACCESS_KEY_ID: &str = "aws_access_key_id";

/// Secret data key holding the AWS secret access key.
pub const SECRET_DATA_SECRET_ACCESS_KEY: &str = "aws_secret_access_key";

/// Field manager identity used for Kubernetes writes.
pub const FIELD_MANAGER: &str = "cred-minter";

/// Namespace of the secret holding the controller's own AWS credentials.
pub const DEFAULT_ROOT_SECRET_NAMESPACE: &str = "kube-system";

/// Name of the secret holding the controller's own AWS credentials.
pub const DEFAULT_ROOT_SECRET_NAME: &str = "aws-creds";

/// AWS region used for the IAM endpoint. IAM is a global service but the
/// SDK still requires a signing region.
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Default HTTP port for metrics and health probes.
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Deadline applied to every remote call (Kubernetes and IAM) made from the
/// reconcile path, in seconds.
pub const DEFAULT_REMOTE_CALL_TIMEOUT_SECS: u64 = 30;

/// Fallback requeue delay when per-resource backoff state is unavailable.
pub const DEFAULT_ERROR_REQUEUE_SECS: u64 = 60;

/// How long to wait for the HTTP server to bind before giving up (seconds).
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Poll interval while waiting for the HTTP server to bind (milliseconds).
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 100;

/// IAM restricts user names to 64 characters.
pub const MAX_IAM_USER_NAME_LEN: usize = 64;
