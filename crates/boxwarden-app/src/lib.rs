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
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Supervisor wiring for the transfer-orchestration pipeline (§4.H): starts
//! configuration, telemetry, the repository, the backend client, the
//! downloader pipeline, and (when supported) the Transmission-RPC ingress,
//! in order, and tears them down in roughly reverse order on shutdown.
//!
//! Layout: `bootstrap.rs` (the ordered sequence), `error.rs` (`AppError`).

/// Application bootstrap and lifecycle wiring.
pub mod bootstrap;
/// Application-level error type.
pub mod error;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
