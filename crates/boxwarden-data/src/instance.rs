//! Process-wide instance identity used as the repository's `locked_by` token.

use rand::Rng;
use rand::distr::Alphanumeric;

/// Identifier naming a single running process, generated once at startup and
/// held for the process lifetime (§4.A "Instance identity").
///
/// This is deliberately opaque: it is compared only for equality against the
/// `locked_by` column and never parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceId(String);

impl InstanceId {
    /// Wrap an explicit identifier, bypassing random generation. Intended for
    /// tests and for operators pinning an identity across restarts.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh random identifier for this process.
    #[must_use]
    pub fn generate() -> Self {
        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        Self(format!("boxwarden-{suffix}"))
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct_and_prefixed() {
        let a = InstanceId::generate();
        let b = InstanceId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("boxwarden-"));
    }

    #[test]
    fn explicit_ids_round_trip() {
        let id = InstanceId::new("fixed-id");
        assert_eq!(id.as_str(), "fixed-id");
        assert_eq!(id.to_string(), "fixed-id");
    }
}
