//! # Controller Metrics
//!
//! Prometheus metrics for reconciliations, provisioning, and key rotation.

use anyhow::Result;
use prometheus::{Histogram, IntCounter, Registry, TextEncoder};
use std::sync::LazyLock;

/// Global Prometheus metrics registry
static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cred_minter_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cred_minter_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static CREDENTIALS_PROVISIONED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cred_minter_credentials_provisioned_total",
        "Total number of successful credential provisions",
    )
    .expect("Failed to create CREDENTIALS_PROVISIONED_TOTAL metric - this should never happen")
});

static ACCESS_KEYS_ROTATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cred_minter_access_keys_rotated_total",
        "Total number of access keys rotated due to drift or orphaned keys",
    )
    .expect("Failed to create ACCESS_KEYS_ROTATED_TOTAL metric - this should never happen")
});

static RECONCILE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "cred_minter_reconcile_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILE_DURATION metric - this should never happen")
});

/// Register all metrics with the Prometheus registry.
///
/// Prometheus `Registry::register()` takes ownership, so the metrics are
/// cloned; they are internally reference counted.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CREDENTIALS_PROVISIONED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ACCESS_KEYS_ROTATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILE_DURATION.clone()))?;
    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn increment_credentials_provisioned() {
    CREDENTIALS_PROVISIONED_TOTAL.inc();
}

pub fn increment_access_keys_rotated() {
    ACCESS_KEYS_ROTATED_TOTAL.inc();
}

pub fn observe_reconcile_duration(seconds: f64) {
    RECONCILE_DURATION.observe(seconds);
}

/// Render the registry in the Prometheus text exposition format
pub fn render() -> String {
    TextEncoder::new()
        .encode_to_string(&REGISTRY.gather())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_and_render() {
        // Registration is global; a second call would be a duplicate error,
        // so only assert the first succeeds.
        register_metrics().unwrap();

        increment_reconciliations();
        increment_credentials_provisioned();
        observe_reconcile_duration(0.25);

        let rendered = render();
        assert!(rendered.contains("cred_minter_reconciliations_total"));
        assert!(rendered.contains("cred_minter_reconcile_duration_seconds"));
    }
}
