//! Engine configuration

use std::time::Duration;

use flashdeck_core::{DeckError, Result, Visibility};
use serde::{Deserialize, Serialize};

/// Flashcard engine configuration.
///
/// Parsed from TOML with [`EngineConfig::from_toml_str`]; every field is
/// optional in the file and falls back to [`EngineConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interval between auth signal samples, in milliseconds
    pub auth_poll_interval_ms: u64,

    /// How long to wait for the first private snapshot after sign-in before
    /// clearing the loading state, in milliseconds
    pub private_snapshot_timeout_ms: u64,

    /// Prefix of every engine-owned local storage key
    pub storage_namespace: String,

    /// Visibility filter applied when the engine opens
    pub default_visibility: Visibility,

    /// Merge progress left behind by the retired single-purpose apps
    pub legacy_progress_merge: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auth_poll_interval_ms: 1_000,
            private_snapshot_timeout_ms: 3_000,
            storage_namespace: "flashcards".to_string(),
            default_visibility: Visibility::All,
            legacy_progress_merge: true,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.auth_poll_interval_ms == 0 {
            return Err(DeckError::config("auth_poll_interval_ms must be positive"));
        }
        if self.private_snapshot_timeout_ms == 0 {
            return Err(DeckError::config(
                "private_snapshot_timeout_ms must be positive",
            ));
        }
        let namespace = self.storage_namespace.trim_matches('/');
        if namespace.is_empty() {
            return Err(DeckError::config("storage_namespace cannot be empty"));
        }
        if namespace.split('/').any(|part| part.is_empty() || part == "..") {
            return Err(DeckError::config(format!(
                "storage_namespace is not a valid key prefix: {}",
                self.storage_namespace
            )));
        }
        Ok(())
    }

    /// Auth signal sampling interval.
    pub fn auth_poll_interval(&self) -> Duration {
        Duration::from_millis(self.auth_poll_interval_ms)
    }

    /// Private snapshot stop-waiting timeout.
    pub fn private_snapshot_timeout(&self) -> Duration {
        Duration::from_millis(self.private_snapshot_timeout_ms)
    }

    /// Set the auth sampling interval.
    #[must_use]
    pub fn with_auth_poll_interval(mut self, interval: Duration) -> Self {
        self.auth_poll_interval_ms = duration_ms(interval);
        self
    }

    /// Set the private snapshot timeout.
    #[must_use]
    pub fn with_private_snapshot_timeout(mut self, timeout: Duration) -> Self {
        self.private_snapshot_timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the storage namespace.
    #[must_use]
    pub fn with_storage_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.storage_namespace = namespace.into();
        self
    }

    /// Set the initial visibility filter.
    #[must_use]
    pub fn with_default_visibility(mut self, visibility: Visibility) -> Self {
        self.default_visibility = visibility;
        self
    }

    /// Enable or disable the legacy progress merge.
    #[must_use]
    pub fn with_legacy_progress_merge(mut self, enabled: bool) -> Self {
        self.legacy_progress_merge = enabled;
        self
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            auth_poll_interval_ms = 250
            default_visibility = "privateOnly"
            "#,
        )
        .unwrap();
        assert_eq!(config.auth_poll_interval(), Duration::from_millis(250));
        assert_eq!(config.default_visibility, Visibility::PrivateOnly);
        assert_eq!(config.storage_namespace, "flashcards");
        assert!(config.legacy_progress_merge);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = EngineConfig::from_toml_str("auth_poll_interval_ms = 0").unwrap_err();
        assert!(matches!(err, DeckError::Config { .. }));
    }

    #[test]
    fn bad_namespaces_are_rejected() {
        for namespace in ["", "/", "a//b", "../up"] {
            let config = EngineConfig::default().with_storage_namespace(namespace);
            assert!(config.validate().is_err(), "{namespace:?} accepted");
        }
        let nested = EngineConfig::default().with_storage_namespace("dash/flashcards");
        assert!(nested.validate().is_ok());
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = EngineConfig::from_toml_str("auth_poll_interval_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, DeckError::Config { .. }));
    }
}
