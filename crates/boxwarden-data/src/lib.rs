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

//! Durable claim repository for Boxwarden: a single SQLite-backed `downloads`
//! table that lets every running instance safely claim a transfer exactly
//! once (§4.A "State Repository").

pub mod error;
pub mod instance;
pub mod repository;

pub use error::{DataError, Result as DataResult};
pub use instance::InstanceId;
pub use repository::{DownloadRecord, DownloadStatus, PoolConfig, Repository};
