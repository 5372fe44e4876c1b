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

//! Binary entrypoint that wires the Boxwarden services together and runs
//! the pipeline until graceful shutdown.

use anyhow::Result;
use boxwarden_app::run_app;

/// Bootstraps the Boxwarden application and blocks until graceful shutdown.
#[tokio::main]
async fn main() -> Result<()> {
    run_app().await?;
    Ok(())
}
