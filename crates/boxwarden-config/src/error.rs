//! Error types for configuration loading and validation (§4.I).

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field was absent after defaults, file, and environment
    /// layers were all applied.
    #[error("missing required configuration field '{field}'")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },
    /// Field contained a value that failed validation.
    #[error("invalid value for configuration field '{field}': {message}")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Human-readable reason for the failure.
        message: String,
    },
    /// The TOML file named by `BOXWARDEN_CONFIG`/`--config` could not be read.
    #[error("failed to read configuration file '{path}'")]
    Io {
        /// Path that could not be read.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The TOML file's contents did not parse.
    #[error("failed to parse configuration file '{path}'")]
    Parse {
        /// Path whose contents failed to parse.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
