//! Discovery and mutation capability traits implemented by each backend
//! (§4.B "Backend Client (abstract)").

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;

use crate::error::BackendResult;
use crate::model::{Transfer, TransferFile};

/// A streamed byte response, tolerant of transport failure at any point
/// (errors surface as `Result::Err` items, never a panic on an absent body).
pub type ByteStream = Pin<Box<dyn Stream<Item = BackendResult<Bytes>> + Send>>;

/// Read-only capability: enumerate and fetch transfer content.
#[async_trait]
pub trait DiscoverBackend: Send + Sync {
    /// Establish session/credentials. Idempotent; must be called once before
    /// any other operation.
    async fn authenticate(&self) -> BackendResult<()>;

    /// Enumerate every transfer tagged with `label`, including ones still
    /// in progress at the backend.
    async fn get_tagged_transfers(&self, label: &str) -> BackendResult<Vec<Transfer>>;

    /// Open a byte-accurate stream over a single file's contents.
    async fn grab_file(&self, transfer: &Transfer, file: &TransferFile) -> BackendResult<ByteStream>;
}

/// Write capability: submit new transfers and retire finished ones.
#[async_trait]
pub trait MutationBackend: Send + Sync {
    /// Remove a transfer from backend storage once seeding is no longer
    /// desired.
    async fn remove_transfer(&self, id: &str) -> BackendResult<()>;

    /// Submit a magnet URI or HTTP URL.
    async fn add_transfer_by_url(&self, url: &str, destination: &str) -> BackendResult<Transfer>;

    /// Submit a `.torrent` metainfo payload. `filename` must end in
    /// `.torrent` (case-insensitive); `content` is capped at the backend's
    /// configured size limit (default 10 MiB).
    async fn add_transfer_by_bytes(
        &self,
        content: &[u8],
        filename: &str,
        destination: &str,
    ) -> BackendResult<Transfer>;
}
