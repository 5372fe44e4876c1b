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

//! The concurrent transfer pipeline (§4.D, §4.E, §4.G): the orchestrator
//! claims work, the downloader fetches files and watches for import/seeding,
//! and the notification sink reacts to the lifecycle events both publish.
//!
//! [`catalog::TransferCatalog`] is the mediator between the downloader and
//! the sink: the sink only ever sees a bare transfer id on the event bus, so
//! it asks the catalog (populated by the downloader) for the full
//! [`boxwarden_backend::Transfer`] before asking the downloader to start a
//! watcher.

pub mod catalog;
pub mod downloader;
pub mod notifier;
pub mod orchestrator;
mod supervise;

pub use catalog::TransferCatalog;
pub use downloader::Downloader;
pub use notifier::NotificationSink;
pub use orchestrator::Orchestrator;
pub use supervise::supervise;
