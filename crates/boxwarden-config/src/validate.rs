//! Per-field validation and string parsing, kept separate from merging so
//! error messages always name the offending field (§4.I "Validation is a
//! distinct pass from parsing").

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ConfigError;

/// Require a non-empty string, naming `field` on failure.
pub(crate) fn require_non_empty(field: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingField { field }),
    }
}

/// `max_parallel` must be positive; a width of zero would deadlock the
/// downloader's semaphore permanently.
pub(crate) fn validate_max_parallel(value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidField {
            field: "max_parallel",
            message: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

/// Parse a duration string of the form `<number><unit>` where unit is one of
/// `s`, `m`, `h`, `d` (e.g. `"10m"`, `"24h"`).
pub(crate) fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    let (digits, unit) = value.split_at(value.len().saturating_sub(1));
    let invalid = || ConfigError::InvalidField {
        field,
        message: format!("'{value}' is not a valid duration (expected e.g. '10m', '24h')"),
    };

    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    let seconds = match unit {
        "s" => amount,
        "m" => amount.checked_mul(60).ok_or_else(invalid)?,
        "h" => amount.checked_mul(3_600).ok_or_else(invalid)?,
        "d" => amount.checked_mul(86_400).ok_or_else(invalid)?,
        _ => return Err(invalid()),
    };
    Ok(Duration::from_secs(seconds))
}

/// Parse a `host:port` socket address, naming `field` on failure.
pub(crate) fn parse_socket_addr(field: &'static str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidField {
        field,
        message: format!("'{value}' is not a valid socket address"),
    })
}

/// Parse a `usize`, naming `field` on failure.
pub(crate) fn parse_usize(field: &'static str, value: &str) -> Result<usize, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidField {
        field,
        message: format!("'{value}' is not a valid non-negative integer"),
    })
}

/// Parse a `u32`, naming `field` on failure.
pub(crate) fn parse_u32(field: &'static str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidField {
        field,
        message: format!("'{value}' is not a valid non-negative integer"),
    })
}

/// Parse a `bool` from the common truthy/falsy string spellings used by
/// environment variables.
pub(crate) fn parse_bool(field: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidField {
            field,
            message: format!("'{value}' is not a valid boolean"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_max_parallel() {
        let err = validate_max_parallel(0).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { field: "max_parallel", .. }));
    }

    #[test]
    fn allows_positive_max_parallel() {
        assert_eq!(validate_max_parallel(5).unwrap(), 5);
    }

    #[test]
    fn parses_minutes_and_hours() {
        assert_eq!(parse_duration("polling_interval", "10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("keep_downloaded_for", "24h").unwrap(), Duration::from_secs(86_400));
    }

    #[test]
    fn rejects_unitless_duration() {
        assert!(parse_duration("polling_interval", "10").is_err());
    }

    #[test]
    fn parses_socket_addr() {
        assert!(parse_socket_addr("ingress_bind_addr", "0.0.0.0:9091").is_ok());
        assert!(parse_socket_addr("ingress_bind_addr", "not-an-addr").is_err());
    }
}
