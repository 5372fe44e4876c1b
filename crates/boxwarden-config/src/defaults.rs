//! Compiled-in configuration defaults (§4.I, §6 "Configuration surface").
//!
//! # Design
//! - Centralize every default so the precedence chain (defaults → file →
//!   env) has one place to start from.
//! - Keep time-based defaults explicit for auditability.

use std::time::Duration;

/// `polling_interval` default.
pub(crate) const POLLING_INTERVAL: Duration = Duration::from_secs(10 * 60);
/// `cleanup_interval` default.
pub(crate) const CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);
/// `keep_downloaded_for` default.
pub(crate) const KEEP_DOWNLOADED_FOR: Duration = Duration::from_secs(24 * 60 * 60);
/// `max_parallel` default.
pub(crate) const MAX_PARALLEL: usize = 5;
/// `db_max_open_conns` default, mirrored from `boxwarden_data::PoolConfig::new`.
pub(crate) const DB_MAX_OPEN_CONNS: u32 = 25;
/// `db_max_idle_conns` default, mirrored from `boxwarden_data::PoolConfig::new`.
pub(crate) const DB_MAX_IDLE_CONNS: u32 = 5;
/// Default ingress bind address.
pub(crate) const INGRESS_BIND_ADDR: &str = "0.0.0.0:9091";
/// Default ingress per-request timeout, standing in for the read/write/idle
/// trio (see the open question recorded in `DESIGN.md`).
pub(crate) const INGRESS_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Default shutdown deadline (§4.H "Ordered shutdown").
pub(crate) const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
