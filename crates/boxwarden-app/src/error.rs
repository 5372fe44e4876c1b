//! Application-level error type surfaced by the boot sequence (§4.H).
//!
//! # Design
//! - Centralize startup errors so `main` has one place to map them to a
//!   process exit code (§6 "Exit codes").
//! - Carry the operation name and the underlying typed source rather than
//!   re-wrapping into a string.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration loading or validation failed.
    #[error("configuration operation '{operation}' failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        #[source]
        source: boxwarden_config::ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("telemetry operation '{operation}' failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source error.
        #[source]
        source: anyhow::Error,
    },
    /// Repository connection or schema initialisation failed.
    #[error("repository operation '{operation}' failed")]
    Repository {
        /// Operation identifier.
        operation: &'static str,
        /// Source repository error.
        #[source]
        source: boxwarden_data::DataError,
    },
    /// Backend client construction or authentication failed.
    #[error("backend operation '{operation}' failed")]
    Backend {
        /// Operation identifier.
        operation: &'static str,
        /// Source backend error.
        #[source]
        source: boxwarden_backend::BackendError,
    },
    /// The metrics scrape server failed to bind or serve.
    #[error("metrics server operation '{operation}' failed")]
    Metrics {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(operation: &'static str, source: boxwarden_config::ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn repository(operation: &'static str, source: boxwarden_data::DataError) -> Self {
        Self::Repository { operation, source }
    }

    pub(crate) const fn backend(operation: &'static str, source: boxwarden_backend::BackendError) -> Self {
        Self::Backend { operation, source }
    }

    pub(crate) const fn metrics(operation: &'static str, source: std::io::Error) -> Self {
        Self::Metrics { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config(
            "load",
            boxwarden_config::ConfigError::MissingField { field: "target_label" },
        );
        assert!(matches!(config, AppError::Config { .. }));

        let backend = AppError::backend(
            "authenticate",
            boxwarden_backend::BackendError::Authentication { operation: "authenticate" },
        );
        assert!(matches!(backend, AppError::Backend { .. }));
    }
}
