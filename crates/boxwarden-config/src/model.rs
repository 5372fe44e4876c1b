//! Typed configuration surface (§4.I, §6 "Configuration surface").
//!
//! # Design
//! - Pure data carriers; loading and validation live in `loader.rs`/`validate.rs`.
//! - Backend and media-manager sub-configs are reused directly from the
//!   crates that consume them (`boxwarden_backend`, `boxwarden_media_probe`)
//!   rather than duplicated here.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use boxwarden_backend::{DelugeConfig, PutioConfig};
use boxwarden_media_probe::MediaManagerConfig;

/// Fully resolved, validated application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Which backend to construct and its connection parameters.
    pub backend: BackendConfig,
    /// Label used to enumerate "ours" transfers on the backend.
    pub target_label: String,
    /// Local directory downloaded files are written under.
    pub download_dir: PathBuf,
    /// Orchestrator tick and watcher poll interval. Default 10 minutes.
    pub polling_interval: Duration,
    /// Recognised but not acted upon by this binary; retention of finished
    /// local files is out of core scope and left to an external sweeper.
    /// Default 10 minutes.
    pub cleanup_interval: Duration,
    /// Recognised for the same reason as `cleanup_interval`. Default 24 hours.
    pub keep_downloaded_for: Duration,
    /// Width of the downloader's file-level concurrency semaphore. Default 5.
    pub max_parallel: usize,
    /// Durable state store connection parameters.
    pub database: DatabaseConfig,
    /// Zero or more media managers whose history API confirms imports.
    pub media_managers: Vec<MediaManagerConfig>,
    /// Optional webhook URL the notification sink posts lifecycle messages to.
    pub webhook_url: Option<String>,
    /// Transmission-RPC ingress configuration.
    pub ingress: IngressConfig,
    /// Bind address for the Prometheus scrape endpoint. Absent disables the
    /// endpoint without disabling in-process metric collection (§4.J).
    pub metrics_bind_addr: Option<SocketAddr>,
    /// Deadline for ordered shutdown to complete (§4.H). Default 30s.
    pub shutdown_timeout: Duration,
}

/// Backend selection and its connection parameters (§6 "backend_kind").
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// JSON-RPC seedbox backend (discovery only).
    Deluge(DelugeConfig),
    /// Cloud API backend (discovery and mutation).
    Putio(PutioConfig),
}

impl BackendConfig {
    /// Short identifier used in log lines and metric labels.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Deluge(_) => "deluge",
            Self::Putio(_) => "putio",
        }
    }
}

/// Durable state store connection bounds (§6 "db_path, db_max_open_conns,
/// db_max_idle_conns").
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
    /// Maximum open connections.
    pub max_open_conns: u32,
    /// Maximum idle connections.
    pub max_idle_conns: u32,
}

/// Transmission-RPC ingress configuration (§6 "Ingress username/password,
/// bind address, timeouts").
#[derive(Debug, Clone)]
pub struct IngressConfig {
    /// Basic-auth username required of callers.
    pub username: String,
    /// Basic-auth password required of callers.
    pub password: String,
    /// Address the ingress server binds to.
    pub bind_addr: SocketAddr,
    /// Per-request timeout. Stands in for the configured read/write/idle
    /// timeouts; see the open question recorded in `DESIGN.md`.
    pub request_timeout: Duration,
}
