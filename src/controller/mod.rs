//! # Controller
//!
//! Reconciliation machinery for CredentialsRequest resources.

pub mod backoff;
pub mod cluster;
pub mod reconciler;
pub mod secrets;
