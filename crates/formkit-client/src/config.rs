//! Client configuration
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables (`FORMKIT_API_URL`, `FORMKIT_STORAGE_PATH`,
//! `FORMKIT_AUTOSAVE_MS`, `FORMKIT_TIMEOUT_SECS`).

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default API base URL
pub const DEFAULT_API_URL: &str = "http://localhost:8080/form";

/// Default autosave quiet period in milliseconds
pub const DEFAULT_AUTOSAVE_MS: u64 = 1000;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the Form/Submission Service
    pub api_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Builder autosave quiet period in milliseconds
    pub autosave_delay_ms: u64,
    /// File holding durable client state (submission ids, cached answers)
    pub storage_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With API base URL
    #[inline]
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// With autosave quiet period
    #[inline]
    #[must_use]
    pub fn with_autosave_delay_ms(mut self, ms: u64) -> Self {
        self.autosave_delay_ms = ms;
        self
    }

    /// With storage file
    #[inline]
    #[must_use]
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Autosave quiet period
    #[inline]
    #[must_use]
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Request timeout
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse from TOML text; missing keys keep their defaults
    ///
    /// # Errors
    /// - `ConfigError::Parse` for malformed TOML or wrong value types
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::Parse` if it is not valid
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply overrides from the process environment
    ///
    /// # Errors
    /// - `ConfigError::Invalid` for unparsable numeric overrides
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup
    ///
    /// # Errors
    /// - `ConfigError::Invalid` for unparsable numeric overrides
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FORMKIT_API_URL") {
            self.api_url = url;
        }
        if let Some(path) = lookup("FORMKIT_STORAGE_PATH") {
            self.storage_path = Some(PathBuf::from(path));
        }
        if let Some(ms) = lookup("FORMKIT_AUTOSAVE_MS") {
            self.autosave_delay_ms = ms
                .parse()
                .map_err(|_| ConfigError::invalid("FORMKIT_AUTOSAVE_MS", format!("not a number: {ms}")))?;
        }
        if let Some(secs) = lookup("FORMKIT_TIMEOUT_SECS") {
            self.request_timeout_secs = secs
                .parse()
                .map_err(|_| ConfigError::invalid("FORMKIT_TIMEOUT_SECS", format!("not a number: {secs}")))?;
        }
        Ok(self)
    }

    /// Check values are usable
    ///
    /// # Errors
    /// - `ConfigError::Invalid` naming the first bad key
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "api_url",
                format!("expected an http(s) URL, got {:?}", self.api_url),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid("request_timeout_secs", "must be positive"));
        }
        if self.autosave_delay_ms == 0 {
            return Err(ConfigError::invalid("autosave_delay_ms", "must be positive"));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 30,
            autosave_delay_ms: DEFAULT_AUTOSAVE_MS,
            storage_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = ClientConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.autosave_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ClientConfig::from_toml_str(r#"api_url = "https://forms.example.com""#).unwrap();
        assert_eq!(config.api_url, "https://forms.example.com");
        assert_eq!(config.autosave_delay_ms, DEFAULT_AUTOSAVE_MS);
    }

    #[test]
    fn malformed_toml_is_rejected() {
        let err = ClientConfig::from_toml_str("autosave_delay_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "autosave_delay_ms = 2000").unwrap();
        writeln!(file, "storage_path = \"/tmp/formkit.json\"").unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.autosave_delay_ms, 2000);
        assert_eq!(config.storage_path, Some(PathBuf::from("/tmp/formkit.json")));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = ClientConfig::load(Path::new("/nonexistent/formkit.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("FORMKIT_API_URL", "https://override.example.com"),
            ("FORMKIT_AUTOSAVE_MS", "1500"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::new()
            .apply_overrides(|k| vars.get(k).map(|v| (*v).to_string()))
            .unwrap();
        assert_eq!(config.api_url, "https://override.example.com");
        assert_eq!(config.autosave_delay_ms, 1500);
    }

    #[test]
    fn bad_override_is_invalid() {
        let err = ClientConfig::new()
            .apply_overrides(|k| (k == "FORMKIT_TIMEOUT_SECS").then(|| "ten".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "FORMKIT_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(ClientConfig::new().with_api_url("ftp://x").validate().is_err());
        assert!(ClientConfig::new().with_autosave_delay_ms(0).validate().is_err());
        assert!(ClientConfig::new().with_request_timeout_secs(0).validate().is_err());
    }
}
