//! End-to-end exercise of the defaults → file → env precedence chain (§4.I).

use std::io::Write;

use boxwarden_config::{BackendConfig, ConfigError};
use serial_test::serial;
use tempfile::NamedTempFile;

fn write_toml(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write toml");
    file
}

#[test]
#[serial]
fn loads_from_toml_file_with_defaults_filled_in() {
    let file = write_toml(
        r#"
        backend_kind = "putio"
        cloud_token = "tok"
        cloud_base_dir = "boxwarden"
        target_label = "boxwarden"
        download_dir = "/data/downloads"
        db_path = "/data/boxwarden.sqlite3"
        ingress_username = "op"
        ingress_password = "secret"
        "#,
    );

    let config = boxwarden_config::load(Some(file.path())).expect("config loads");
    assert!(matches!(config.backend, BackendConfig::Putio(_)));
    assert_eq!(config.target_label, "boxwarden");
    assert_eq!(config.max_parallel, 5);
    assert_eq!(config.ingress.bind_addr.to_string(), "0.0.0.0:9091");
}

#[test]
#[serial]
fn env_var_overrides_file_value() {
    let file = write_toml(
        r#"
        backend_kind = "putio"
        cloud_token = "tok"
        cloud_base_dir = "boxwarden"
        target_label = "file-label"
        download_dir = "/data/downloads"
        db_path = "/data/boxwarden.sqlite3"
        ingress_username = "op"
        ingress_password = "secret"
        max_parallel = 3
        "#,
    );

    unsafe {
        std::env::set_var("BOXWARDEN_TARGET_LABEL", "env-label");
    }
    let config = boxwarden_config::load(Some(file.path())).expect("config loads");
    unsafe {
        std::env::remove_var("BOXWARDEN_TARGET_LABEL");
    }

    assert_eq!(config.target_label, "env-label");
    assert_eq!(config.max_parallel, 3);
}

#[test]
#[serial]
fn missing_required_field_is_a_fatal_config_error() {
    let file = write_toml(
        r#"
        backend_kind = "putio"
        cloud_token = "tok"
        cloud_base_dir = "boxwarden"
        download_dir = "/data/downloads"
        db_path = "/data/boxwarden.sqlite3"
        ingress_username = "op"
        ingress_password = "secret"
        "#,
    );

    let err = boxwarden_config::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, ConfigError::MissingField { field: "target_label" }));
}
