//! Transmission-RPC wire types (§4.F, §6 "HTTP ingress").

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// RPC version this ingress claims compatibility with (Transmission 2.94-era).
pub(crate) const RPC_VERSION: u32 = 17;

/// Version string reported by `session-get`.
pub(crate) const SERVER_VERSION: &str = "2.94 (boxwarden)";

/// A decoded request envelope. `arguments` is left as a raw [`Value`] and
/// parsed per-method, since each Transmission method has its own argument
/// shape and unknown methods must still round-trip `tag`.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// Transmission method name, e.g. `"torrent-add"`.
    pub method: String,
    /// Method-specific arguments; absent for argument-less methods.
    #[serde(default)]
    pub arguments: Value,
    /// Opaque client-supplied correlation id, echoed back verbatim.
    #[serde(default)]
    pub tag: Option<i64>,
}

/// A response envelope. `result` is `"success"` or a short failure reason
/// (§4.F: the ingress always answers HTTP 200, even on method failure).
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// `"success"` or a human-readable failure reason.
    pub result: String,
    /// Method-specific response payload.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub arguments: Value,
    /// Echoes the request's `tag`, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<i64>,
}

impl RpcResponse {
    /// Build a success envelope carrying `arguments`.
    #[must_use]
    pub fn success(arguments: Value, tag: Option<i64>) -> Self {
        Self {
            result: "success".to_string(),
            arguments,
            tag,
        }
    }

    /// Build a failure envelope. Still served with HTTP 200 (§4.F).
    #[must_use]
    pub fn failure(reason: impl Into<String>, tag: Option<i64>) -> Self {
        Self {
            result: reason.into(),
            arguments: Value::Null,
            tag,
        }
    }
}

/// Arguments accepted by `torrent-add`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct TorrentAddArguments {
    /// Base64 of a `.torrent` file's bytes. Wins over `filename` when both
    /// are present (§4.F "Priority rule").
    pub(crate) metainfo: Option<String>,
    /// A magnet URI or HTTP(S) URL.
    pub(crate) filename: Option<String>,
}

/// The `torrent-added` summary nested under `torrent-add`'s response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TorrentAddedSummary {
    /// Transmission-style synthetic numeric id; always `0` here since
    /// transfers are identified by backend-native string ids, not Transmission
    /// session-local integers (see the open question in `DESIGN.md`).
    pub(crate) id: u32,
    /// Backend-native transfer id, reused as Transmission's `hashString`.
    pub(crate) hash_string: String,
    /// Human-readable transfer name.
    pub(crate) name: String,
}

/// Arguments accepted by `torrent-get`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct TorrentGetArguments {
    /// Present for API compatibility; every tagged transfer is always
    /// returned regardless of this field (§4.F: enumeration is unconditional).
    #[serde(default)]
    pub(crate) ids: Option<Vec<Value>>,
}

/// One row of `torrent-get`'s `torrents` array.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TorrentGetRow {
    /// Always `0`; see [`TorrentAddedSummary::id`].
    pub(crate) id: u32,
    /// Backend-native transfer id.
    pub(crate) hash_string: String,
    /// Transfer name.
    pub(crate) name: String,
    /// Transmission `torrent-get` status code, `0..=6`.
    pub(crate) status: u8,
    /// Completion percentage as a `0.0..=1.0` fraction (Transmission convention).
    pub(crate) percent_done: f64,
    /// Advisory download rate in bytes per second.
    pub(crate) rate_download: u64,
    /// Advisory seconds remaining, `-1` when unknown.
    pub(crate) eta: i64,
    /// Advisory peer count currently serving us data.
    pub(crate) peers_getting_from_us: u32,
    /// Category labels; always present, empty when none apply.
    pub(crate) labels: Vec<String>,
}

/// Arguments accepted by `torrent-remove`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct TorrentRemoveArguments {
    /// Backend-native transfer ids to remove.
    #[serde(default)]
    pub(crate) ids: Vec<String>,
}

/// Response payload for `session-get`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct SessionGetArguments {
    /// Transmission daemon version string.
    pub(crate) version: &'static str,
    /// Transmission RPC protocol version.
    pub(crate) rpc_version: u32,
}

impl Default for SessionGetArguments {
    fn default() -> Self {
        Self {
            version: SERVER_VERSION,
            rpc_version: RPC_VERSION,
        }
    }
}
