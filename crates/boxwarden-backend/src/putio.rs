//! Cloud API backend (§4.B "Cloud API backend (Put.io)").
//!
//! Authenticates with a bearer token; directories are resolved by name
//! under a configured base directory to obtain the numeric ID uploads
//! require. Supports both discovery and mutation.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{BackendError, BackendResult};
use crate::model::{Transfer, TransferFile, TransferStatus};
use crate::torrent::{DEFAULT_MAX_TORRENT_BYTES, validate_torrent_bytes};
use crate::traits::{ByteStream, DiscoverBackend, MutationBackend};

const API_BASE: &str = "https://api.put.io/v2";

/// Connection parameters for the Put.io cloud API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PutioConfig {
    /// OAuth-style bearer token.
    pub token: String,
    /// Name of the directory (under the account root) uploads resolve into.
    pub base_dir: String,
}

/// Put.io REST client.
pub struct PutioBackend {
    client: reqwest::Client,
    config: PutioConfig,
}

#[derive(Deserialize)]
struct TransfersEnvelope {
    transfers: Vec<PutioTransfer>,
}

#[derive(Deserialize)]
struct FilesEnvelope {
    files: Vec<PutioFile>,
}

#[derive(Deserialize)]
struct PutioFile {
    id: i64,
    name: String,
    file_type: String,
    size: Option<u64>,
}

#[derive(Deserialize)]
struct PutioTransfer {
    id: i64,
    name: String,
    save_parent_id: Option<i64>,
    /// Id of the folder (multi-file) or plain file (single-file) Put.io
    /// created for this transfer once it has something downloadable.
    file_id: Option<i64>,
    /// Total transfer size in bytes, used as the fallback file size when
    /// `file_id` resolves to a single file rather than a folder.
    size: Option<u64>,
    status: String,
    percent_done: Option<f64>,
    down_speed: Option<u64>,
    peers_connected: Option<u32>,
    estimated_time: Option<u64>,
}

impl PutioTransfer {
    fn into_transfer(self, label: &str, files: Vec<TransferFile>) -> Transfer {
        let status = map_status(&self.status);
        Transfer {
            id: self.id.to_string(),
            name: self.name,
            label: label.to_string(),
            save_parent_id: self.save_parent_id.map(|id| id.to_string()),
            files,
            progress_percent: self.percent_done.unwrap_or(0.0),
            status,
            peers: self.peers_connected,
            down_rate: self.down_speed,
            eta: self.estimated_time,
        }
    }
}

fn map_status(native: &str) -> TransferStatus {
    match native {
        "WAITING" | "IN_QUEUE" | "PREPARING_DOWNLOAD" => TransferStatus::queued(),
        "DOWNLOADING" => TransferStatus::downloading(),
        "SEEDING" | "COMPLETING" => TransferStatus::seeding(),
        "COMPLETED" | "FINISHED" => TransferStatus::completed(),
        _ => TransferStatus::unavailable(),
    }
}

impl PutioBackend {
    /// Construct a client for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Network`] if the underlying HTTP client
    /// cannot be built.
    pub fn new(config: PutioConfig) -> BackendResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|source| BackendError::Network {
                operation: "build_client",
                source: Box::new(source),
            })?;
        Ok(Self { client, config })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.config.token)
    }

    async fn check_auth(&self, operation: &'static str, response: &reqwest::Response) -> BackendResult<()> {
        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(BackendError::Authentication { operation });
        }
        Ok(())
    }

    /// Resolve `base_dir`'s name to Put.io's numeric folder ID.
    async fn resolve_base_dir(&self) -> BackendResult<i64> {
        let response = self
            .authorized(self.client.get(format!("{API_BASE}/files/list")))
            .query(&[("parent_id", "0")])
            .send()
            .await
            .map_err(|source| BackendError::Network {
                operation: "resolve_base_dir",
                source: Box::new(source),
            })?;
        self.check_auth("resolve_base_dir", &response).await?;

        let parsed: FilesEnvelope = response.json().await.map_err(|source| BackendError::Network {
            operation: "resolve_base_dir",
            source: Box::new(source),
        })?;

        parsed
            .files
            .into_iter()
            .find(|file| file.file_type == "FOLDER" && file.name == self.config.base_dir)
            .map(|file| file.id)
            .ok_or_else(|| BackendError::Directory {
                name: self.config.base_dir.clone(),
            })
    }

    /// List the files a completed transfer produced, so the downloader has
    /// a real Put.io file id (and size) to fetch for each one. `file_id`
    /// names a folder when the transfer created more than one file, or a
    /// single plain file when it created exactly one; listing a plain
    /// file's children comes back empty, in which case `file_id` itself is
    /// the file to download and `fallback_size` (the transfer's total size)
    /// stands in for its size. Nested sub-folders are not recursed into.
    async fn resolve_transfer_files(&self, file_id: i64, fallback_size: u64) -> BackendResult<Vec<TransferFile>> {
        let response = self
            .authorized(self.client.get(format!("{API_BASE}/files/list")))
            .query(&[("parent_id", file_id.to_string())])
            .send()
            .await
            .map_err(|source| BackendError::Network {
                operation: "resolve_transfer_files",
                source: Box::new(source),
            })?;
        self.check_auth("resolve_transfer_files", &response).await?;

        let parsed: FilesEnvelope = response.json().await.map_err(|source| BackendError::Network {
            operation: "resolve_transfer_files",
            source: Box::new(source),
        })?;

        let files: Vec<TransferFile> = parsed
            .files
            .into_iter()
            .filter(|file| file.file_type != "FOLDER")
            .map(|file| TransferFile {
                path: file.id.to_string(),
                size_bytes: file.size.unwrap_or(0),
            })
            .collect();

        if files.is_empty() {
            return Ok(vec![TransferFile {
                path: file_id.to_string(),
                size_bytes: fallback_size,
            }]);
        }

        Ok(files)
    }
}

#[async_trait]
impl DiscoverBackend for PutioBackend {
    async fn authenticate(&self) -> BackendResult<()> {
        let response = self
            .authorized(self.client.get(format!("{API_BASE}/account/info")))
            .send()
            .await
            .map_err(|source| BackendError::Network {
                operation: "authenticate",
                source: Box::new(source),
            })?;
        self.check_auth("authenticate", &response).await
    }

    async fn get_tagged_transfers(&self, label: &str) -> BackendResult<Vec<Transfer>> {
        let base_dir_id = self.resolve_base_dir().await?;

        let response = self
            .authorized(self.client.get(format!("{API_BASE}/transfers/list")))
            .send()
            .await
            .map_err(|source| BackendError::Network {
                operation: "get_tagged_transfers",
                source: Box::new(source),
            })?;
        self.check_auth("get_tagged_transfers", &response).await?;

        let parsed: TransfersEnvelope =
            response.json().await.map_err(|source| BackendError::Network {
                operation: "get_tagged_transfers",
                source: Box::new(source),
            })?;

        let mut transfers = Vec::with_capacity(parsed.transfers.len());
        for transfer in parsed.transfers {
            if transfer.save_parent_id != Some(base_dir_id) {
                continue;
            }

            let downloadable = map_status(&transfer.status).downloadable;
            let files = match (downloadable, transfer.file_id) {
                (true, Some(file_id)) => {
                    let fallback_size = transfer.size.unwrap_or(0);
                    self.resolve_transfer_files(file_id, fallback_size).await?
                }
                _ => Vec::new(),
            };

            transfers.push(transfer.into_transfer(label, files));
        }

        Ok(transfers)
    }

    async fn grab_file(&self, _transfer: &Transfer, file: &TransferFile) -> BackendResult<ByteStream> {
        let response = self
            .authorized(self.client.get(format!("{API_BASE}/files/{}/download", file.path)))
            .send()
            .await
            .map_err(|source| BackendError::Network {
                operation: "grab_file",
                source: Box::new(source),
            })?;
        self.check_auth("grab_file", &response).await?;

        if !response.status().is_success() {
            return Err(BackendError::Network {
                operation: "grab_file",
                source: format!("backend returned {}", response.status()).into(),
            });
        }

        let mapped = futures_util::StreamExt::map(response.bytes_stream(), |item| {
            item.map_err(|source| BackendError::Network {
                operation: "grab_file",
                source: Box::new(source),
            })
        });
        Ok(Box::pin(mapped))
    }
}

#[async_trait]
impl MutationBackend for PutioBackend {
    async fn remove_transfer(&self, id: &str) -> BackendResult<()> {
        let response = self
            .authorized(self.client.post(format!("{API_BASE}/transfers/remove")))
            .form(&[("transfer_ids", id)])
            .send()
            .await
            .map_err(|source| BackendError::Network {
                operation: "remove_transfer",
                source: Box::new(source),
            })?;
        self.check_auth("remove_transfer", &response).await
    }

    async fn add_transfer_by_url(&self, url: &str, destination: &str) -> BackendResult<Transfer> {
        let parent_id = if destination == self.config.base_dir {
            self.resolve_base_dir().await?
        } else {
            return Err(BackendError::Directory {
                name: destination.to_string(),
            });
        };

        let response = self
            .authorized(self.client.post(format!("{API_BASE}/transfers/add")))
            .form(&[("url", url), ("save_parent_id", &parent_id.to_string())])
            .send()
            .await
            .map_err(|source| BackendError::Network {
                operation: "add_transfer_by_url",
                source: Box::new(source),
            })?;
        self.check_auth("add_transfer_by_url", &response).await?;

        if !response.status().is_success() {
            return Err(BackendError::InvalidContent {
                operation: "add_transfer_by_url",
                reason: format!("backend rejected the URL ({})", response.status()),
            });
        }

        let created: CreatedTransfer =
            response.json().await.map_err(|source| BackendError::Network {
                operation: "add_transfer_by_url",
                source: Box::new(source),
            })?;
        Ok(created.transfer.into_transfer(&self.config.base_dir, Vec::new()))
    }

    async fn add_transfer_by_bytes(
        &self,
        content: &[u8],
        filename: &str,
        destination: &str,
    ) -> BackendResult<Transfer> {
        validate_torrent_bytes(content, filename, DEFAULT_MAX_TORRENT_BYTES)?;

        let parent_id = if destination == self.config.base_dir {
            self.resolve_base_dir().await?
        } else {
            return Err(BackendError::Directory {
                name: destination.to_string(),
            });
        };

        let part = reqwest::multipart::Part::bytes(content.to_vec())
            .file_name(filename.to_string())
            .mime_str("application/x-bittorrent")
            .map_err(|source| BackendError::Network {
                operation: "add_transfer_by_bytes",
                source: Box::new(source),
            })?;
        let form = reqwest::multipart::Form::new()
            .text("save_parent_id", parent_id.to_string())
            .part("file", part);

        let response = self
            .authorized(self.client.post(format!("{API_BASE}/transfers/add")))
            .multipart(form)
            .send()
            .await
            .map_err(|source| BackendError::Network {
                operation: "add_transfer_by_bytes",
                source: Box::new(source),
            })?;
        self.check_auth("add_transfer_by_bytes", &response).await?;

        if !response.status().is_success() {
            return Err(BackendError::InvalidContent {
                operation: "add_transfer_by_bytes",
                reason: "backend did not create a transfer for this payload".into(),
            });
        }

        let created: CreatedTransfer =
            response.json().await.map_err(|source| BackendError::Network {
                operation: "add_transfer_by_bytes",
                source: Box::new(source),
            })?;
        Ok(created.transfer.into_transfer(&self.config.base_dir, Vec::new()))
    }
}

#[derive(Deserialize)]
struct CreatedTransfer {
    transfer: PutioTransfer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_status_covers_known_states() {
        assert!(map_status("DOWNLOADING").downloadable.eq(&false));
        assert!(map_status("COMPLETED").downloadable);
        assert!(map_status("SEEDING").seeding);
        assert!(!map_status("ERRORED").available);
    }

    #[test]
    fn into_transfer_carries_identity_and_advisory_fields() {
        let native = PutioTransfer {
            id: 42,
            name: "Movie.2020".into(),
            save_parent_id: Some(7),
            file_id: Some(99),
            size: Some(1_000),
            status: "COMPLETED".into(),
            percent_done: Some(100.0),
            down_speed: Some(0),
            peers_connected: Some(0),
            estimated_time: None,
        };

        let files = vec![TransferFile {
            path: "99".into(),
            size_bytes: 1_000,
        }];
        let transfer = native.into_transfer("boxwarden", files);
        assert_eq!(transfer.id, "42");
        assert_eq!(transfer.save_parent_id.as_deref(), Some("7"));
        assert!(transfer.status.downloadable);
        assert_eq!(transfer.files.len(), 1);
    }
}
