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

//! Transmission-RPC-compatible HTTP ingress (§4.F, §6): a single endpoint
//! that *arr tools and Transmission-speaking clients use to add transfers
//! and watch them progress. Mounted by the supervisor only when the
//! configured backend implements mutation.

mod auth;
mod model;
mod rpc;
mod state;

pub mod router;

pub use model::{RpcRequest, RpcResponse};
pub use router::IngressServer;
pub use state::{BasicAuthCredentials, IngressState};
