//! Error taxonomy for media-manager history probes.

use std::error::Error;

use thiserror::Error;

/// Errors surfaced by [`crate::MediaManagerProbe::check_imported`].
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Transport failure or a non-2xx response from the history API.
    #[error("network error querying history (page {page})")]
    Network {
        /// Page that was being fetched when the request failed.
        page: u32,
        /// Underlying transport failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The response body did not match the expected history envelope shape.
    #[error("malformed history response on page {page}: {reason}")]
    MalformedResponse {
        /// Page that produced the malformed body.
        page: u32,
        /// Human-readable parse failure.
        reason: String,
    },
}

/// Convenience alias for probe operation results.
pub type ProbeResult<T> = Result<T, ProbeError>;
