//! Shared ingress state (§4.F, §4.H step 6: the ingress is only constructed
//! when the configured backend supports mutation).

use std::sync::Arc;

use boxwarden_backend::{DiscoverBackend, MutationBackend};
use boxwarden_telemetry::Metrics;

/// HTTP basic-auth credentials checked by [`crate::auth::require_basic_auth`].
///
/// Credentials never appear in a log line (§4.F "Authentication").
#[derive(Clone)]
pub struct BasicAuthCredentials {
    pub(crate) username: String,
    pub(crate) password: String,
}

impl BasicAuthCredentials {
    /// Construct credentials from configuration values.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Dependencies shared across every RPC handler.
#[derive(Clone)]
pub struct IngressState {
    pub(crate) discover: Arc<dyn DiscoverBackend>,
    pub(crate) mutation: Arc<dyn MutationBackend>,
    pub(crate) target_label: String,
    pub(crate) destination_dir: String,
    pub(crate) metrics: Metrics,
    pub(crate) auth: BasicAuthCredentials,
}

impl IngressState {
    /// Construct the shared ingress state.
    #[must_use]
    pub fn new(
        discover: Arc<dyn DiscoverBackend>,
        mutation: Arc<dyn MutationBackend>,
        target_label: impl Into<String>,
        destination_dir: impl Into<String>,
        metrics: Metrics,
        auth: BasicAuthCredentials,
    ) -> Self {
        Self {
            discover,
            mutation,
            target_label: target_label.into(),
            destination_dir: destination_dir.into(),
            metrics,
            auth,
        }
    }
}
