//! Layered configuration loading (§4.I): compiled-in defaults, an optional
//! TOML file, then `BOXWARDEN_`-prefixed environment variables, in
//! increasing precedence.
//!
//! # Design
//! - Merging happens on an all-`Option` mirror of [`Config`]; only the final
//!   conversion step applies defaults and runs validation, so parsing and
//!   validation stay separate passes (§4.I).
//! - List-valued fields (`media_managers`) are TOML/defaults-only: the
//!   environment layer only overrides scalar fields, matching the two
//!   scalar examples named in the configuration surface (`BOXWARDEN_TARGET_LABEL`,
//!   `BOXWARDEN_MAX_PARALLEL`).

use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use boxwarden_backend::{DelugeConfig, PutioConfig};
use boxwarden_media_probe::MediaManagerConfig;
use serde::Deserialize;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{BackendConfig, Config, DatabaseConfig, IngressConfig};
use crate::validate::{parse_bool, parse_duration, parse_socket_addr, parse_u32, parse_usize, require_non_empty};

const CONFIG_PATH_ENV: &str = "BOXWARDEN_CONFIG";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    backend_kind: Option<String>,
    seedbox_base_url: Option<String>,
    seedbox_api_url_path: Option<String>,
    seedbox_username: Option<String>,
    seedbox_password: Option<String>,
    seedbox_completed_dir: Option<String>,
    seedbox_tls_insecure: Option<bool>,
    cloud_token: Option<String>,
    cloud_base_dir: Option<String>,
    target_label: Option<String>,
    download_dir: Option<String>,
    polling_interval: Option<String>,
    cleanup_interval: Option<String>,
    keep_downloaded_for: Option<String>,
    max_parallel: Option<usize>,
    db_path: Option<String>,
    db_max_open_conns: Option<u32>,
    db_max_idle_conns: Option<u32>,
    media_managers: Option<Vec<MediaManagerConfig>>,
    webhook_url: Option<String>,
    ingress_username: Option<String>,
    ingress_password: Option<String>,
    ingress_bind_addr: Option<String>,
    ingress_request_timeout: Option<String>,
    metrics_bind_addr: Option<String>,
    shutdown_timeout: Option<String>,
}

impl RawConfig {
    /// `overlay`'s present fields win; everything else falls back to `self`.
    fn merged_with(self, overlay: Self) -> Self {
        Self {
            backend_kind: overlay.backend_kind.or(self.backend_kind),
            seedbox_base_url: overlay.seedbox_base_url.or(self.seedbox_base_url),
            seedbox_api_url_path: overlay.seedbox_api_url_path.or(self.seedbox_api_url_path),
            seedbox_username: overlay.seedbox_username.or(self.seedbox_username),
            seedbox_password: overlay.seedbox_password.or(self.seedbox_password),
            seedbox_completed_dir: overlay.seedbox_completed_dir.or(self.seedbox_completed_dir),
            seedbox_tls_insecure: overlay.seedbox_tls_insecure.or(self.seedbox_tls_insecure),
            cloud_token: overlay.cloud_token.or(self.cloud_token),
            cloud_base_dir: overlay.cloud_base_dir.or(self.cloud_base_dir),
            target_label: overlay.target_label.or(self.target_label),
            download_dir: overlay.download_dir.or(self.download_dir),
            polling_interval: overlay.polling_interval.or(self.polling_interval),
            cleanup_interval: overlay.cleanup_interval.or(self.cleanup_interval),
            keep_downloaded_for: overlay.keep_downloaded_for.or(self.keep_downloaded_for),
            max_parallel: overlay.max_parallel.or(self.max_parallel),
            db_path: overlay.db_path.or(self.db_path),
            db_max_open_conns: overlay.db_max_open_conns.or(self.db_max_open_conns),
            db_max_idle_conns: overlay.db_max_idle_conns.or(self.db_max_idle_conns),
            media_managers: overlay.media_managers.or(self.media_managers),
            webhook_url: overlay.webhook_url.or(self.webhook_url),
            ingress_username: overlay.ingress_username.or(self.ingress_username),
            ingress_password: overlay.ingress_password.or(self.ingress_password),
            ingress_bind_addr: overlay.ingress_bind_addr.or(self.ingress_bind_addr),
            ingress_request_timeout: overlay.ingress_request_timeout.or(self.ingress_request_timeout),
            metrics_bind_addr: overlay.metrics_bind_addr.or(self.metrics_bind_addr),
            shutdown_timeout: overlay.shutdown_timeout.or(self.shutdown_timeout),
        }
    }
}

/// Load and validate the application configuration.
///
/// `cli_path` takes precedence over `BOXWARDEN_CONFIG` for locating an
/// optional TOML file; environment variables are applied last regardless of
/// whether a file was found.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read or parsed, a required
/// field is missing, or a present field fails validation.
pub fn load(cli_path: Option<&Path>) -> ConfigResult<Config> {
    let file_layer = match resolve_config_path(cli_path) {
        Some(path) => read_toml(&path)?,
        None => RawConfig::default(),
    };
    let env_layer = read_env()?;
    let raw = file_layer.merged_with(env_layer);
    build(raw)
}

fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    cli_path.map(Path::to_path_buf).or_else(|| env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
}

fn read_toml(path: &Path) -> ConfigResult<RawConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn read_env() -> ConfigResult<RawConfig> {
    Ok(RawConfig {
        backend_kind: env_var("BOXWARDEN_BACKEND_KIND"),
        seedbox_base_url: env_var("BOXWARDEN_SEEDBOX_BASE_URL"),
        seedbox_api_url_path: env_var("BOXWARDEN_SEEDBOX_API_URL_PATH"),
        seedbox_username: env_var("BOXWARDEN_SEEDBOX_USERNAME"),
        seedbox_password: env_var("BOXWARDEN_SEEDBOX_PASSWORD"),
        seedbox_completed_dir: env_var("BOXWARDEN_SEEDBOX_COMPLETED_DIR"),
        seedbox_tls_insecure: env_bool("seedbox_tls_insecure", "BOXWARDEN_SEEDBOX_TLS_INSECURE")?,
        cloud_token: env_var("BOXWARDEN_CLOUD_TOKEN"),
        cloud_base_dir: env_var("BOXWARDEN_CLOUD_BASE_DIR"),
        target_label: env_var("BOXWARDEN_TARGET_LABEL"),
        download_dir: env_var("BOXWARDEN_DOWNLOAD_DIR"),
        polling_interval: env_var("BOXWARDEN_POLLING_INTERVAL"),
        cleanup_interval: env_var("BOXWARDEN_CLEANUP_INTERVAL"),
        keep_downloaded_for: env_var("BOXWARDEN_KEEP_DOWNLOADED_FOR"),
        max_parallel: env_usize("max_parallel", "BOXWARDEN_MAX_PARALLEL")?,
        db_path: env_var("BOXWARDEN_DB_PATH"),
        db_max_open_conns: env_u32("db_max_open_conns", "BOXWARDEN_DB_MAX_OPEN_CONNS")?,
        db_max_idle_conns: env_u32("db_max_idle_conns", "BOXWARDEN_DB_MAX_IDLE_CONNS")?,
        media_managers: None,
        webhook_url: env_var("BOXWARDEN_WEBHOOK_URL"),
        ingress_username: env_var("BOXWARDEN_INGRESS_USERNAME"),
        ingress_password: env_var("BOXWARDEN_INGRESS_PASSWORD"),
        ingress_bind_addr: env_var("BOXWARDEN_INGRESS_BIND_ADDR"),
        ingress_request_timeout: env_var("BOXWARDEN_INGRESS_REQUEST_TIMEOUT"),
        metrics_bind_addr: env_var("BOXWARDEN_METRICS_BIND_ADDR"),
        shutdown_timeout: env_var("BOXWARDEN_SHUTDOWN_TIMEOUT"),
    })
}

fn env_var(name: &'static str) -> Option<String> {
    env::var(name).ok()
}

fn env_bool(field: &'static str, name: &'static str) -> ConfigResult<Option<bool>> {
    env_var(name).map(|value| parse_bool(field, &value)).transpose()
}

fn env_usize(field: &'static str, name: &'static str) -> ConfigResult<Option<usize>> {
    env_var(name).map(|value| parse_usize(field, &value)).transpose()
}

fn env_u32(field: &'static str, name: &'static str) -> ConfigResult<Option<u32>> {
    env_var(name).map(|value| parse_u32(field, &value)).transpose()
}

fn build(raw: RawConfig) -> ConfigResult<Config> {
    let backend = build_backend(&raw)?;
    let target_label = require_non_empty("target_label", raw.target_label)?;
    let download_dir = require_non_empty("download_dir", raw.download_dir)?.into();

    let polling_interval = optional_duration("polling_interval", raw.polling_interval, defaults::POLLING_INTERVAL)?;
    let cleanup_interval = optional_duration("cleanup_interval", raw.cleanup_interval, defaults::CLEANUP_INTERVAL)?;
    let keep_downloaded_for =
        optional_duration("keep_downloaded_for", raw.keep_downloaded_for, defaults::KEEP_DOWNLOADED_FOR)?;
    let max_parallel = crate::validate::validate_max_parallel(raw.max_parallel.unwrap_or(defaults::MAX_PARALLEL))?;

    let database = DatabaseConfig {
        path: require_non_empty("db_path", raw.db_path)?.into(),
        max_open_conns: raw.db_max_open_conns.unwrap_or(defaults::DB_MAX_OPEN_CONNS),
        max_idle_conns: raw.db_max_idle_conns.unwrap_or(defaults::DB_MAX_IDLE_CONNS),
    };

    let ingress = IngressConfig {
        username: require_non_empty("ingress_username", raw.ingress_username)?,
        password: require_non_empty("ingress_password", raw.ingress_password)?,
        bind_addr: optional_socket_addr("ingress_bind_addr", raw.ingress_bind_addr, defaults::INGRESS_BIND_ADDR)?,
        request_timeout: optional_duration(
            "ingress_request_timeout",
            raw.ingress_request_timeout,
            defaults::INGRESS_REQUEST_TIMEOUT,
        )?,
    };

    let metrics_bind_addr = raw
        .metrics_bind_addr
        .map(|value| parse_socket_addr("metrics_bind_addr", &value))
        .transpose()?;

    let shutdown_timeout = optional_duration("shutdown_timeout", raw.shutdown_timeout, defaults::SHUTDOWN_TIMEOUT)?;

    Ok(Config {
        backend,
        target_label,
        download_dir,
        polling_interval,
        cleanup_interval,
        keep_downloaded_for,
        max_parallel,
        database,
        media_managers: raw.media_managers.unwrap_or_default(),
        webhook_url: raw.webhook_url,
        ingress,
        metrics_bind_addr,
        shutdown_timeout,
    })
}

fn build_backend(raw: &RawConfig) -> ConfigResult<BackendConfig> {
    match raw.backend_kind.as_deref() {
        Some("deluge") => Ok(BackendConfig::Deluge(DelugeConfig {
            base_url: require_non_empty("seedbox_base_url", raw.seedbox_base_url.clone())?,
            api_url_path: require_non_empty("seedbox_api_url_path", raw.seedbox_api_url_path.clone())?,
            username: require_non_empty("seedbox_username", raw.seedbox_username.clone())?,
            password: require_non_empty("seedbox_password", raw.seedbox_password.clone())?,
            completed_dir: require_non_empty("seedbox_completed_dir", raw.seedbox_completed_dir.clone())?,
            tls_insecure: raw.seedbox_tls_insecure.unwrap_or(false),
        })),
        Some("putio") => Ok(BackendConfig::Putio(PutioConfig {
            token: require_non_empty("cloud_token", raw.cloud_token.clone())?,
            base_dir: require_non_empty("cloud_base_dir", raw.cloud_base_dir.clone())?,
        })),
        Some(other) => Err(ConfigError::InvalidField {
            field: "backend_kind",
            message: format!("'{other}' is not one of 'deluge' or 'putio'"),
        }),
        None => Err(ConfigError::MissingField { field: "backend_kind" }),
    }
}

fn optional_duration(
    field: &'static str,
    value: Option<String>,
    default: std::time::Duration,
) -> ConfigResult<std::time::Duration> {
    value.map_or(Ok(default), |value| parse_duration(field, &value))
}

fn optional_socket_addr(field: &'static str, value: Option<String>, default: &str) -> ConfigResult<SocketAddr> {
    parse_socket_addr(field, value.as_deref().unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_raw() -> RawConfig {
        RawConfig {
            backend_kind: Some("deluge".to_string()),
            seedbox_base_url: Some("https://seedbox.example.com".to_string()),
            seedbox_api_url_path: Some("/json".to_string()),
            seedbox_username: Some("user".to_string()),
            seedbox_password: Some("pass".to_string()),
            seedbox_completed_dir: Some("/downloads".to_string()),
            target_label: Some("boxwarden".to_string()),
            download_dir: Some("/data/downloads".to_string()),
            db_path: Some("/data/boxwarden.sqlite3".to_string()),
            ingress_username: Some("op".to_string()),
            ingress_password: Some("secret".to_string()),
            ..RawConfig::default()
        }
    }

    #[test]
    fn builds_with_defaults_applied() {
        let config = build(base_raw()).expect("config");
        assert_eq!(config.max_parallel, defaults::MAX_PARALLEL);
        assert_eq!(config.polling_interval, defaults::POLLING_INTERVAL);
        assert_eq!(config.ingress.bind_addr.to_string(), defaults::INGRESS_BIND_ADDR);
        assert_eq!(config.backend.kind(), "deluge");
    }

    #[test]
    fn missing_target_label_is_fatal() {
        let mut raw = base_raw();
        raw.target_label = None;
        let err = build(raw).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "target_label" }));
    }

    #[test]
    fn zero_max_parallel_is_fatal() {
        let mut raw = base_raw();
        raw.max_parallel = Some(0);
        let err = build(raw).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { field: "max_parallel", .. }));
    }

    #[test]
    fn unknown_backend_kind_is_fatal() {
        let mut raw = base_raw();
        raw.backend_kind = Some("bittorrent".to_string());
        let err = build(raw).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { field: "backend_kind", .. }));
    }

    #[test]
    fn env_layer_overrides_file_layer() {
        let file_layer = base_raw();
        let overlay = RawConfig {
            target_label: Some("from-env".to_string()),
            ..RawConfig::default()
        };
        let merged = file_layer.merged_with(overlay);
        assert_eq!(merged.target_label.as_deref(), Some("from-env"));
        assert_eq!(merged.seedbox_base_url.as_deref(), Some("https://seedbox.example.com"));
    }
}
