//! Backend-agnostic transfer domain types (§3 "Transfer (in-memory)").

use serde::{Deserialize, Serialize};

/// A transfer as seen at the backend, independent of whether it came from
/// the Deluge or Put.io client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    /// Backend-assigned identifier.
    pub id: String,
    /// Human label.
    pub name: String,
    /// Category tag the operator uses to select work.
    pub label: String,
    /// Backend-specific grouping key the ingress uses to match in-progress
    /// transfers; absent on the seedbox backend.
    pub save_parent_id: Option<String>,
    /// Ordered file listing; empty while still queued at the backend.
    pub files: Vec<TransferFile>,
    /// Completion percentage, `0.0..=100.0`.
    pub progress_percent: f64,
    /// Collapsed lifecycle predicates plus the Transmission status code.
    pub status: TransferStatus,
    /// Advisory peer count, surfaced only in ingress responses.
    pub peers: Option<u32>,
    /// Advisory download rate in bytes per second.
    pub down_rate: Option<u64>,
    /// Advisory estimated time remaining in seconds.
    pub eta: Option<u64>,
}

impl Transfer {
    /// Whether this transfer is ready to hand to the downloader: visible,
    /// fully downloadable at the backend, and carries at least one file
    /// (§4.D step 2).
    #[must_use]
    pub fn is_claimable(&self) -> bool {
        self.status.available && self.status.downloadable && !self.files.is_empty()
    }
}

/// A single file within a [`Transfer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFile {
    /// Relative path of the file within the transfer.
    pub path: String,
    /// Total size of the file in bytes.
    pub size_bytes: u64,
}

/// Collapsed lifecycle state, shared across both backend implementations.
///
/// `transmission_code` follows the standard Transmission `torrent-get` status
/// enum (§6): `0` stopped, `1` check-wait, `2` checking, `3` download-wait,
/// `4` downloading, `5` seed-wait, `6` seeding. Queue/wait states collapse to
/// `3` when a backend has no finer-grained equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStatus {
    /// The transfer is recognisable as work (not merely a transient error).
    pub available: bool,
    /// All files exist and are complete at the backend.
    pub downloadable: bool,
    /// The backend is uploading to peers after completion.
    pub seeding: bool,
    /// Transmission-compatible status code for `torrent-get` responses.
    pub transmission_code: u8,
}

impl TransferStatus {
    /// Status for a transfer the backend is still assembling.
    #[must_use]
    pub const fn queued() -> Self {
        Self {
            available: true,
            downloadable: false,
            seeding: false,
            transmission_code: 3,
        }
    }

    /// Status for a transfer actively fetching data at the backend.
    #[must_use]
    pub const fn downloading() -> Self {
        Self {
            available: true,
            downloadable: false,
            seeding: false,
            transmission_code: 4,
        }
    }

    /// Status for a transfer that finished downloading and is ready to claim.
    #[must_use]
    pub const fn completed() -> Self {
        Self {
            available: true,
            downloadable: true,
            seeding: false,
            transmission_code: 6,
        }
    }

    /// Status for a transfer the backend reports as seeding.
    #[must_use]
    pub const fn seeding() -> Self {
        Self {
            available: true,
            downloadable: true,
            seeding: true,
            transmission_code: 6,
        }
    }

    /// Status for a transfer in an unrecognised or error state at the backend.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self {
            available: false,
            downloadable: false,
            seeding: false,
            transmission_code: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transfer(status: TransferStatus, files: Vec<TransferFile>) -> Transfer {
        Transfer {
            id: "t1".into(),
            name: "Sample".into(),
            label: "boxwarden".into(),
            save_parent_id: None,
            files,
            progress_percent: 100.0,
            status,
            peers: None,
            down_rate: None,
            eta: None,
        }
    }

    #[test]
    fn claimable_requires_downloadable_and_nonempty_files() {
        let file = TransferFile {
            path: "a.mkv".into(),
            size_bytes: 10,
        };

        assert!(sample_transfer(TransferStatus::completed(), vec![file.clone()]).is_claimable());
        assert!(!sample_transfer(TransferStatus::downloading(), vec![file.clone()]).is_claimable());
        assert!(!sample_transfer(TransferStatus::completed(), vec![]).is_claimable());
        assert!(!sample_transfer(TransferStatus::unavailable(), vec![file]).is_claimable());
    }
}
