//! JSON-RPC seedbox backend (§4.B "JSON-RPC seedbox backend (Deluge)").
//!
//! Session is established via form login; every subsequent RPC call rides
//! on the session cookie `reqwest`'s cookie jar attaches automatically.
//! Discovery only — `MutationBackend` is intentionally not implemented here.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{BackendError, BackendResult};
use crate::model::{Transfer, TransferFile, TransferStatus};
use crate::traits::{ByteStream, DiscoverBackend};

/// Connection parameters for a Deluge Web UI / JSON-RPC endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DelugeConfig {
    /// Base URL of the seedbox (e.g. `https://seedbox.example.com:8112`).
    pub base_url: String,
    /// Path of the JSON-RPC endpoint under `base_url` (e.g. `/json`).
    pub api_url_path: String,
    /// Web UI username; Deluge's JSON-RPC auth takes only a password, but
    /// some seedbox front-ends gate the whole host behind HTTP basic auth
    /// keyed off this username.
    pub username: String,
    /// Web UI password, used for `auth.login`.
    pub password: String,
    /// Directory holding completed downloads, used to resolve file URLs
    /// for [`DiscoverBackend::grab_file`].
    pub completed_dir: String,
    /// Skip TLS peer verification (self-signed seedbox certificates).
    pub tls_insecure: bool,
}

/// Deluge JSON-RPC client.
pub struct DelugeBackend {
    client: reqwest::Client,
    config: DelugeConfig,
    rpc_url: String,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Value,
    error: Option<Value>,
}

impl DelugeBackend {
    /// Construct a client for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Network`] if the underlying HTTP client
    /// cannot be built (e.g. invalid TLS configuration).
    pub fn new(config: DelugeConfig) -> BackendResult<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(config.tls_insecure)
            .build()
            .map_err(|source| BackendError::Network {
                operation: "build_client",
                source: Box::new(source),
            })?;

        let rpc_url = format!(
            "{}{}",
            config.base_url.trim_end_matches('/'),
            config.api_url_path
        );

        Ok(Self {
            client,
            config,
            rpc_url,
        })
    }

    async fn call(&self, operation: &'static str, method: &str, params: Value) -> BackendResult<Value> {
        let body = json!({ "method": method, "params": params, "id": 1 });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|source| BackendError::Network {
                operation,
                source: Box::new(source),
            })?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(BackendError::Authentication { operation });
        }
        if response.status().is_server_error() {
            return Err(BackendError::Network {
                operation,
                source: format!("backend returned {}", response.status()).into(),
            });
        }

        let parsed: RpcResponse = response.json().await.map_err(|source| BackendError::Network {
            operation,
            source: Box::new(source),
        })?;

        if let Some(error) = parsed.error {
            if !error.is_null() {
                return Err(BackendError::Authentication { operation });
            }
        }

        Ok(parsed.result)
    }

    fn transfer_from_status(id: &str, value: &Value) -> Transfer {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(id)
            .to_string();
        let label = value
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let progress_percent = value.get("progress").and_then(Value::as_f64).unwrap_or(0.0);
        let state = value.get("state").and_then(Value::as_str).unwrap_or("");

        let status = match state {
            "Seeding" => TransferStatus::seeding(),
            "Downloading" => TransferStatus::downloading(),
            "Checking" | "Allocating" | "Queued" => TransferStatus::queued(),
            _ if (progress_percent - 100.0).abs() < f64::EPSILON => TransferStatus::completed(),
            _ => TransferStatus::unavailable(),
        };

        let files = value
            .get("files")
            .and_then(Value::as_array)
            .map(|files| {
                files
                    .iter()
                    .filter_map(|file| {
                        let path = file.get("path").and_then(Value::as_str)?.to_string();
                        let size_bytes = file.get("size").and_then(Value::as_u64).unwrap_or(0);
                        Some(TransferFile { path, size_bytes })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Transfer {
            id: id.to_string(),
            name,
            label,
            save_parent_id: None,
            files,
            progress_percent,
            status,
            peers: value
                .get("num_peers")
                .and_then(Value::as_u64)
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX)),
            down_rate: value.get("download_payload_rate").and_then(Value::as_u64),
            eta: value.get("eta").and_then(Value::as_u64),
        }
    }
}

#[async_trait]
impl DiscoverBackend for DelugeBackend {
    async fn authenticate(&self) -> BackendResult<()> {
        let result = self
            .call(
                "authenticate",
                "auth.login",
                json!([self.config.password]),
            )
            .await?;

        if result.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(BackendError::Authentication {
                operation: "authenticate",
            })
        }
    }

    async fn get_tagged_transfers(&self, label: &str) -> BackendResult<Vec<Transfer>> {
        let result = self
            .call(
                "get_tagged_transfers",
                "core.get_torrents_status",
                json!([{ "label": label }, []]),
            )
            .await?;

        let Some(map) = result.as_object() else {
            return Ok(Vec::new());
        };

        Ok(map
            .iter()
            .map(|(id, value)| Self::transfer_from_status(id, value))
            .collect())
    }

    async fn grab_file(
        &self,
        _transfer: &Transfer,
        file: &TransferFile,
    ) -> BackendResult<ByteStream> {
        let url = format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.completed_dir.trim_matches('/'),
            file.path.trim_start_matches('/')
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| BackendError::Network {
                operation: "grab_file",
                source: Box::new(source),
            })?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(BackendError::Authentication {
                operation: "grab_file",
            });
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transfer_from_status_maps_seeding_state() {
        let value = json!({
            "name": "Show.S01",
            "label": "boxwarden",
            "progress": 100.0,
            "state": "Seeding",
            "files": [{"path": "a.mkv", "size": 1024}],
        });

        let transfer = DelugeBackend::transfer_from_status("abc123", &value);
        assert_eq!(transfer.id, "abc123");
        assert_eq!(transfer.name, "Show.S01");
        assert!(transfer.status.seeding);
        assert!(transfer.status.downloadable);
        assert_eq!(transfer.files.len(), 1);
    }

    #[test]
    fn transfer_from_status_defaults_to_unavailable_for_unknown_state() {
        let value = json!({ "state": "Error", "progress": 12.5 });
        let transfer = DelugeBackend::transfer_from_status("xyz", &value);
        assert!(!transfer.status.available);
    }
}
