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

//! Layered application configuration (§4.I): compiled-in defaults, an
//! optional TOML file, then `BOXWARDEN_`-prefixed environment variables.
//!
//! Layout: `model.rs` (the resolved [`Config`]), `defaults.rs` (compiled-in
//! values), `loader.rs` (the merge pipeline), `validate.rs` (per-field parsing
//! and validation), `error.rs` (`ConfigError`).

mod defaults;
mod error;
mod loader;
mod model;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::load;
pub use model::{BackendConfig, Config, DatabaseConfig, IngressConfig};
