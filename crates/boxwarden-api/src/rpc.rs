//! Transmission-RPC method dispatch (§4.F).

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use boxwarden_backend::torrent::{DEFAULT_MAX_TORRENT_BYTES, validate_torrent_bytes};
use boxwarden_backend::{BackendError, Transfer};
use serde_json::{Value, json};
use sha1::{Digest, Sha1};

use crate::model::{
    RpcRequest, RpcResponse, SessionGetArguments, TorrentAddArguments, TorrentAddedSummary,
    TorrentGetArguments, TorrentGetRow, TorrentRemoveArguments,
};
use crate::state::IngressState;

/// Dispatch one decoded RPC request to the matching handler. Every branch
/// answers with a filled [`RpcResponse`]; none of them ever bubble an HTTP
/// error (§4.F: failures are reported in the envelope, not the status line).
pub(crate) async fn dispatch(state: &Arc<IngressState>, request: RpcRequest) -> RpcResponse {
    match request.method.as_str() {
        "torrent-add" => torrent_add(state, request.arguments, request.tag).await,
        "torrent-get" => torrent_get(state, request.arguments, request.tag).await,
        "torrent-remove" => torrent_remove(state, request.arguments, request.tag).await,
        "session-get" => session_get(request.tag),
        other => RpcResponse::failure(format!("unsupported method '{other}'"), request.tag),
    }
}

async fn torrent_add(state: &Arc<IngressState>, arguments: Value, tag: Option<i64>) -> RpcResponse {
    let Ok(arguments) = serde_json::from_value::<TorrentAddArguments>(arguments) else {
        return RpcResponse::failure("invalid torrent-add arguments", tag);
    };

    let outcome = if let Some(metainfo) = arguments.metainfo {
        add_by_metainfo(state, &metainfo).await
    } else if let Some(filename) = arguments.filename {
        let outcome = state
            .mutation
            .add_transfer_by_url(&filename, &state.destination_dir)
            .await;
        state
            .metrics
            .inc_torrent_add("magnet", if outcome.is_ok() { "ok" } else { "error" });
        outcome
    } else {
        state.metrics.inc_torrent_add("unknown", "error");
        return RpcResponse::failure("torrent-add requires 'metainfo' or 'filename'", tag);
    };

    match outcome {
        Ok(transfer) => {
            let summary = TorrentAddedSummary {
                id: 0,
                hash_string: transfer.id,
                name: transfer.name,
            };
            let arguments = json!({ "torrent-added": summary });
            RpcResponse::success(arguments, tag)
        }
        Err(error) => RpcResponse::failure(error.to_string(), tag),
    }
}

async fn add_by_metainfo(state: &Arc<IngressState>, metainfo: &str) -> Result<Transfer, BackendError> {
    let torrent_type = "metainfo";
    let decoded = STANDARD.decode(metainfo).map_err(|source| BackendError::InvalidContent {
        operation: "torrent-add",
        reason: format!("metainfo is not valid base64: {source}"),
    });
    let decoded = match decoded {
        Ok(bytes) => bytes,
        Err(error) => {
            state.metrics.inc_torrent_add(torrent_type, "error");
            return Err(error);
        }
    };

    if decoded.len() > DEFAULT_MAX_TORRENT_BYTES {
        state.metrics.inc_torrent_add(torrent_type, "error");
        return Err(BackendError::InvalidContent {
            operation: "torrent-add",
            reason: format!("decoded metainfo exceeds {DEFAULT_MAX_TORRENT_BYTES} byte cap"),
        });
    }

    let filename = format!("{}.torrent", hex_prefix(&decoded));
    if let Err(error) = validate_torrent_bytes(&decoded, &filename, DEFAULT_MAX_TORRENT_BYTES) {
        state.metrics.inc_torrent_add(torrent_type, "error");
        return Err(error);
    }

    let result = state
        .mutation
        .add_transfer_by_bytes(&decoded, &filename, &state.destination_dir)
        .await;
    state
        .metrics
        .inc_torrent_add(torrent_type, if result.is_ok() { "ok" } else { "error" });
    result
}

/// First 16 hex characters of the payload's SHA-1, per §4.F step 4.
fn hex_prefix(content: &[u8]) -> String {
    let digest = Sha1::digest(content);
    let full = format!("{digest:x}");
    full[..16].to_string()
}

async fn torrent_get(state: &Arc<IngressState>, arguments: Value, tag: Option<i64>) -> RpcResponse {
    let _ = serde_json::from_value::<TorrentGetArguments>(arguments);

    match state.discover.get_tagged_transfers(&state.target_label).await {
        Ok(transfers) => {
            let rows: Vec<TorrentGetRow> = transfers.iter().map(to_row).collect();
            RpcResponse::success(json!({ "torrents": rows }), tag)
        }
        Err(error) => RpcResponse::failure(error.to_string(), tag),
    }
}

fn to_row(transfer: &Transfer) -> TorrentGetRow {
    TorrentGetRow {
        id: 0,
        hash_string: transfer.id.clone(),
        name: transfer.name.clone(),
        status: transfer.status.transmission_code,
        percent_done: transfer.progress_percent / 100.0,
        rate_download: transfer.down_rate.unwrap_or(0),
        eta: transfer.eta.map_or(-1, |seconds| i64::try_from(seconds).unwrap_or(i64::MAX)),
        peers_getting_from_us: transfer.peers.unwrap_or(0),
        labels: vec![transfer.label.clone()],
    }
}

async fn torrent_remove(state: &Arc<IngressState>, arguments: Value, tag: Option<i64>) -> RpcResponse {
    let arguments: TorrentRemoveArguments = serde_json::from_value(arguments).unwrap_or_default();

    for id in &arguments.ids {
        if let Err(error) = state.mutation.remove_transfer(id).await {
            tracing::warn!(transfer_id = %id, %error, "torrent-remove failed for one id");
        }
    }

    RpcResponse::success(Value::Null, tag)
}

fn session_get(tag: Option<i64>) -> RpcResponse {
    let arguments = serde_json::to_value(SessionGetArguments::default()).unwrap_or(Value::Null);
    RpcResponse::success(arguments, tag)
}

#[cfg(test)]
mod tests {
    use boxwarden_backend::{BackendResult, ByteStream, DiscoverBackend, MutationBackend, TransferFile, TransferStatus};
    use boxwarden_telemetry::Metrics;

    use super::*;
    use crate::state::BasicAuthCredentials;

    struct StubBackend;

    #[async_trait::async_trait]
    impl DiscoverBackend for StubBackend {
        async fn authenticate(&self) -> BackendResult<()> {
            Ok(())
        }
        async fn get_tagged_transfers(&self, _label: &str) -> BackendResult<Vec<Transfer>> {
            Ok(vec![Transfer {
                id: "t1".into(),
                name: "Demo".into(),
                label: "boxwarden".into(),
                save_parent_id: None,
                files: vec![TransferFile {
                    path: "a.mkv".into(),
                    size_bytes: 10,
                }],
                progress_percent: 42.0,
                status: TransferStatus::downloading(),
                peers: Some(3),
                down_rate: Some(1024),
                eta: Some(60),
            }])
        }
        async fn grab_file(&self, _transfer: &Transfer, _file: &TransferFile) -> BackendResult<ByteStream> {
            unimplemented!()
        }
    }

    #[async_trait::async_trait]
    impl MutationBackend for StubBackend {
        async fn remove_transfer(&self, _id: &str) -> BackendResult<()> {
            Ok(())
        }
        async fn add_transfer_by_url(&self, url: &str, _destination: &str) -> BackendResult<Transfer> {
            Ok(Transfer {
                id: "t2".into(),
                name: url.to_string(),
                label: "boxwarden".into(),
                save_parent_id: None,
                files: Vec::new(),
                progress_percent: 0.0,
                status: TransferStatus::queued(),
                peers: None,
                down_rate: None,
                eta: None,
            })
        }
        async fn add_transfer_by_bytes(&self, _content: &[u8], _filename: &str, _destination: &str) -> BackendResult<Transfer> {
            Ok(Transfer {
                id: "t3".into(),
                name: "from-bytes".into(),
                label: "boxwarden".into(),
                save_parent_id: None,
                files: Vec::new(),
                progress_percent: 0.0,
                status: TransferStatus::queued(),
                peers: None,
                down_rate: None,
                eta: None,
            })
        }
    }

    fn state() -> Arc<IngressState> {
        Arc::new(IngressState::new(
            Arc::new(StubBackend),
            Arc::new(StubBackend),
            "boxwarden",
            "downloads",
            Metrics::new().expect("metrics"),
            BasicAuthCredentials::new("op", "secret"),
        ))
    }

    #[tokio::test]
    async fn torrent_add_by_filename_reports_success() {
        let state = state();
        let response = dispatch(
            &state,
            RpcRequest {
                method: "torrent-add".into(),
                arguments: json!({ "filename": "magnet:?xt=urn:btih:deadbeef" }),
                tag: Some(7),
            },
        )
        .await;
        assert_eq!(response.result, "success");
        assert_eq!(response.tag, Some(7));
    }

    #[tokio::test]
    async fn torrent_add_without_fields_fails_with_200_shaped_envelope() {
        let state = state();
        let response = dispatch(
            &state,
            RpcRequest {
                method: "torrent-add".into(),
                arguments: json!({}),
                tag: None,
            },
        )
        .await;
        assert_ne!(response.result, "success");
    }

    #[tokio::test]
    async fn torrent_get_maps_status_and_labels() {
        let state = state();
        let response = dispatch(
            &state,
            RpcRequest {
                method: "torrent-get".into(),
                arguments: Value::Null,
                tag: None,
            },
        )
        .await;
        assert_eq!(response.result, "success");
        let torrents = response.arguments.get("torrents").expect("torrents array");
        assert_eq!(torrents[0]["status"], 4);
        assert_eq!(torrents[0]["labels"][0], "boxwarden");
    }

    #[tokio::test]
    async fn session_get_reports_version() {
        let response = dispatch(
            &state(),
            RpcRequest {
                method: "session-get".into(),
                arguments: Value::Null,
                tag: None,
            },
        )
        .await;
        assert_eq!(response.result, "success");
        assert!(response.arguments.get("rpc-version").is_some());
    }
}
