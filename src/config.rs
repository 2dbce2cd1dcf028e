//! # Controller Configuration
//!
//! Controller-level configuration loaded from environment variables
//! (populated from a ConfigMap via `envFrom` in the deployment).
//!
//! All configuration has sensible defaults and can be overridden via
//! environment variables.

use crate::constants::*;

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Namespace of the root AWS credentials secret
    pub root_secret_namespace: String,
    /// Name of the root AWS credentials secret
    pub root_secret_name: String,
    /// AWS signing region for the IAM endpoint
    pub aws_region: String,
    /// HTTP server port for metrics and health probes
    pub metrics_port: u16,
    /// Deadline for every remote call made from the reconcile path (seconds)
    pub remote_call_timeout_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            root_secret_namespace: DEFAULT_ROOT_SECRET_NAMESPACE.to_string(),
            root_secret_name: DEFAULT_ROOT_SECRET_NAME.to_string(),
            aws_region: DEFAULT_AWS_REGION.to_string(),
            metrics_port: DEFAULT_METRICS_PORT,
            remote_call_timeout_secs: DEFAULT_REMOTE_CALL_TIMEOUT_SECS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            root_secret_namespace: env_var_or_default(
                "ROOT_SECRET_NAMESPACE",
                DEFAULT_ROOT_SECRET_NAMESPACE.to_string(),
            ),
            root_secret_name: env_var_or_default(
                "ROOT_SECRET_NAME",
                DEFAULT_ROOT_SECRET_NAME.to_string(),
            ),
            aws_region: env_var_or_default("AWS_REGION", DEFAULT_AWS_REGION.to_string()),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            remote_call_timeout_secs: env_var_or_default(
                "REMOTE_CALL_TIMEOUT_SECS",
                DEFAULT_REMOTE_CALL_TIMEOUT_SECS,
            ),
        }
    }

    /// Deadline for remote calls as a [`std::time::Duration`]
    pub fn remote_call_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.remote_call_timeout_secs)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.root_secret_namespace, "kube-system");
        assert_eq!(config.root_secret_name, "aws-creds");
        assert_eq!(config.aws_region, "us-east-1");
        assert_eq!(config.metrics_port, 8080);
        assert_eq!(config.remote_call_timeout().as_secs(), 30);
    }

    #[test]
    fn test_env_var_or_default_falls_back_on_unset() {
        let port: u16 = env_var_or_default("CRED_MINTER_TEST_UNSET_VAR", 1234u16);
        assert_eq!(port, 1234);
    }
}
