#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Seedbox and cloud backend clients shared across the Boxwarden pipeline
//! (§4.B "Backend Client (abstract)").
//!
//! Two concrete backends implement [`traits::DiscoverBackend`] (and, for
//! Put.io, [`traits::MutationBackend`]): [`deluge::DelugeBackend`] for a
//! JSON-RPC seedbox and [`putio::PutioBackend`] for the Put.io cloud API.
//! [`instrumented::Instrumented`] wraps either one with tracing spans and
//! Prometheus counters without altering their error types.

pub mod deluge;
pub mod error;
pub mod instrumented;
pub mod model;
pub mod putio;
pub mod torrent;
pub mod traits;

pub use deluge::{DelugeBackend, DelugeConfig};
pub use error::{BackendError, BackendResult};
pub use instrumented::Instrumented;
pub use model::{Transfer, TransferFile, TransferStatus};
pub use putio::{PutioBackend, PutioConfig};
pub use traits::{ByteStream, DiscoverBackend, MutationBackend};
