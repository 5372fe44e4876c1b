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

//! Client for the downstream media manager's history API (§4.C
//! "Media-Manager Probe"), used to confirm that a downloaded transfer's
//! files were picked up and imported by the media manager.

mod error;
mod model;
mod probe;

pub use error::{ProbeError, ProbeResult};
pub use probe::{MediaManagerConfig, MediaManagerProbe, ProbeSet};
