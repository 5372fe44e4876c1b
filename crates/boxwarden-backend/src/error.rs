//! Error taxonomy for backend clients (§7 "Error handling design").

use std::error::Error;

use thiserror::Error;

/// Primary error type surfaced by every backend operation.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Payload malformed: bad base64, not bencode, wrong filename suffix,
    /// over the size cap, or the backend didn't create a transfer for it.
    #[error("invalid content for '{operation}': {reason}")]
    InvalidContent {
        /// Operation that rejected the content.
        operation: &'static str,
        /// Human-readable rejection reason.
        reason: String,
    },
    /// Transport failure or a 5xx response from the backend.
    #[error("network error during '{operation}'")]
    Network {
        /// Operation that failed.
        operation: &'static str,
        /// Underlying transport failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Named destination directory does not exist under the configured base.
    #[error("directory '{name}' not found under the configured base")]
    Directory {
        /// Directory name that could not be resolved.
        name: String,
    },
    /// The backend rejected credentials (401/403).
    #[error("authentication failed during '{operation}'")]
    Authentication {
        /// Operation that failed to authenticate.
        operation: &'static str,
    },
}

/// Convenience alias for backend operation results.
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_name_operation_and_reason() {
        let invalid = BackendError::InvalidContent {
            operation: "add_transfer_by_bytes",
            reason: "missing .torrent suffix".into(),
        };
        assert_eq!(
            invalid.to_string(),
            "invalid content for 'add_transfer_by_bytes': missing .torrent suffix"
        );

        let directory = BackendError::Directory {
            name: "tv-shows".into(),
        };
        assert_eq!(
            directory.to_string(),
            "directory 'tv-shows' not found under the configured base"
        );

        let auth = BackendError::Authentication {
            operation: "authenticate",
        };
        assert_eq!(auth.to_string(), "authentication failed during 'authenticate'");
    }

    #[test]
    fn network_error_carries_source() {
        let inner: Box<dyn Error + Send + Sync> = "connection reset".into();
        let network = BackendError::Network {
            operation: "grab_file",
            source: inner,
        };
        assert!(network.source().is_some());
    }
}
