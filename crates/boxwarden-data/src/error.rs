//! Error types for the state repository.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Result alias for repository operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised by the state repository.
#[derive(Debug)]
pub enum DataError {
    /// Schema creation failed.
    SchemaInit {
        /// Underlying SQL error.
        source: sqlx::Error,
    },
    /// A database operation failed.
    QueryFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying SQL error.
        source: sqlx::Error,
    },
    /// The repository could not be reached within the configured reachability
    /// probe budget (§4.A "Startup behaviour").
    Unreachable {
        /// Number of probe attempts made before giving up.
        attempts: u32,
        /// Underlying SQL error from the final attempt.
        source: sqlx::Error,
    },
}

impl Display for DataError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaInit { .. } => formatter.write_str("failed to initialise schema"),
            Self::QueryFailed { operation, .. } => {
                write!(formatter, "database operation '{operation}' failed")
            }
            Self::Unreachable { attempts, .. } => {
                write!(formatter, "repository unreachable after {attempts} probes")
            }
        }
    }
}

impl Error for DataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SchemaInit { source }
            | Self::QueryFailed { source, .. }
            | Self::Unreachable { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_error_display_and_source() {
        let schema = DataError::SchemaInit {
            source: sqlx::Error::RowNotFound,
        };
        assert_eq!(schema.to_string(), "failed to initialise schema");
        assert!(schema.source().is_some());

        let query = DataError::QueryFailed {
            operation: "claim_transfer",
            source: sqlx::Error::RowNotFound,
        };
        assert_eq!(query.to_string(), "database operation 'claim_transfer' failed");
        assert!(query.source().is_some());

        let unreachable = DataError::Unreachable {
            attempts: 3,
            source: sqlx::Error::RowNotFound,
        };
        assert_eq!(
            unreachable.to_string(),
            "repository unreachable after 3 probes"
        );
        assert!(unreachable.source().is_some());
    }
}
