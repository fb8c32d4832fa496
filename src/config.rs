//! Client configuration
//!
//! A `ClientConfig` can be built directly, from environment variables with the
//! `ERPX_` prefix, or from a TOML file with `[profile.<name>]` sections:
//!
//! ```toml
//! [profile.default]
//! url = "https://erp.example.com"
//! db = "production"
//! api_key = "..."
//!
//! [profile.staging]
//! url = "https://staging.example.com"
//! db = "staging"
//! username = "integration"
//! password = "..."
//! timeout = 60
//! ```
//!
//! Explicitly supplied overrides always win field-by-field; unset override
//! fields fall back to the file/environment value, not to the default.

use crate::error::{ErpxError, Result};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default per-call timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default delay before the first retry, in seconds.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 1;

/// Prefix for environment-based configuration (`ERPX_URL`, `ERPX_DB`, ...).
pub const ENV_PREFIX: &str = "ERPX_";

/// Connection settings for a [`crate::Client`].
///
/// Immutable once the client is constructed; per-call credential overrides go
/// through [`crate::client::AuthOverrides`] instead.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the server, without the `/xmlrpc/2/...` suffixes.
    pub url: String,

    /// Default database name.
    pub db: Option<String>,

    /// Username for password authentication.
    pub username: Option<String>,

    /// Password for password authentication.
    pub password: Option<String>,

    /// API key; when present it takes precedence over username/password.
    pub api_key: Option<String>,

    /// Fixed per-call timeout applied at transport construction.
    pub timeout: Duration,

    /// Number of additional attempts for transport/protocol failures.
    /// Zero keeps the single-attempt, fail-fast behavior.
    pub max_retries: u32,

    /// Base delay between retries; doubled on each attempt.
    pub retry_delay: Duration,
}

impl ClientConfig {
    /// Create a configuration for the given base URL with default settings.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            db: None,
            username: None,
            password: None,
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: 0,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        }
    }

    pub fn with_db(mut self, db: &str) -> Self {
        self.db = Some(db.to_string());
        self
    }

    pub fn with_username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Build a configuration from `ERPX_*` environment variables.
    ///
    /// Recognized variables: `ERPX_URL`, `ERPX_DB`, `ERPX_USERNAME`,
    /// `ERPX_PASSWORD`, `ERPX_API_KEY`, `ERPX_TIMEOUT`, `ERPX_MAX_RETRIES`,
    /// `ERPX_RETRY_DELAY` (the numeric ones in whole seconds / counts).
    pub fn from_env(overrides: ConfigOverrides) -> Result<Self> {
        let var = |suffix: &str| std::env::var(format!("{ENV_PREFIX}{suffix}")).ok();

        let url = overrides
            .url
            .clone()
            .or_else(|| var("URL"))
            .ok_or_else(|| ErpxError::Config("ERPX_URL is not set and no url override was given".to_string()))?;

        let mut config = Self::new(&url);
        config.db = var("DB");
        config.username = var("USERNAME");
        config.password = var("PASSWORD");
        config.api_key = var("API_KEY");

        if let Some(raw) = var("TIMEOUT") {
            config.timeout = Duration::from_secs(parse_env_number("ERPX_TIMEOUT", &raw)?);
        }
        if let Some(raw) = var("MAX_RETRIES") {
            config.max_retries = parse_env_number("ERPX_MAX_RETRIES", &raw)? as u32;
        }
        if let Some(raw) = var("RETRY_DELAY") {
            config.retry_delay = Duration::from_secs(parse_env_number("ERPX_RETRY_DELAY", &raw)?);
        }

        Ok(config.apply(overrides))
    }

    /// Build a configuration from a `[profile.<name>]` section of a TOML file.
    pub fn from_file(path: &Path, profile: &str, overrides: ConfigOverrides) -> Result<Self> {
        if !path.exists() {
            return Err(ErpxError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        let root = toml::from_str::<toml::Value>(&contents).map_err(|e| {
            ErpxError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        let section = root
            .get("profile")
            .and_then(|v| v.as_table())
            .and_then(|profiles| profiles.get(profile))
            .and_then(|v| v.as_table())
            .ok_or_else(|| {
                ErpxError::Config(format!(
                    "Profile '{}' not found in {}",
                    profile,
                    path.display()
                ))
            })?;

        let get_str = |key: &str| -> Result<Option<String>> {
            match section.get(key) {
                None => Ok(None),
                Some(toml::Value::String(s)) => Ok(Some(s.clone())),
                Some(_) => Err(ErpxError::Config(format!(
                    "Profile '{profile}' field '{key}' is not a string"
                ))),
            }
        };
        let get_int = |key: &str| -> Result<Option<u64>> {
            match section.get(key) {
                None => Ok(None),
                Some(toml::Value::Integer(n)) if *n >= 0 => Ok(Some(*n as u64)),
                Some(_) => Err(ErpxError::Config(format!(
                    "Profile '{profile}' field '{key}' is not a non-negative integer"
                ))),
            }
        };

        let url = overrides.url.clone().or(get_str("url")?).ok_or_else(|| {
            ErpxError::Config(format!("Profile '{profile}' is missing the 'url' field"))
        })?;

        let mut config = Self::new(&url);
        config.db = get_str("db")?;
        config.username = get_str("username")?;
        config.password = get_str("password")?;
        config.api_key = get_str("api_key")?;

        if let Some(secs) = get_int("timeout")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(n) = get_int("max_retries")? {
            config.max_retries = n as u32;
        }
        if let Some(secs) = get_int("retry_delay")? {
            config.retry_delay = Duration::from_secs(secs);
        }

        Ok(config.apply(overrides))
    }

    /// Apply explicit overrides field-by-field.
    fn apply(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(url) = overrides.url {
            self.url = url.trim_end_matches('/').to_string();
        }
        if let Some(db) = overrides.db {
            self.db = Some(db);
        }
        if let Some(username) = overrides.username {
            self.username = Some(username);
        }
        if let Some(password) = overrides.password {
            self.password = Some(password);
        }
        if let Some(api_key) = overrides.api_key {
            self.api_key = Some(api_key);
        }
        if let Some(timeout) = overrides.timeout {
            self.timeout = timeout;
        }
        if let Some(max_retries) = overrides.max_retries {
            self.max_retries = max_retries;
        }
        if let Some(retry_delay) = overrides.retry_delay {
            self.retry_delay = retry_delay;
        }
        self
    }
}

fn parse_env_number(name: &str, raw: &str) -> Result<u64> {
    raw.parse::<u64>()
        .map_err(|_| ErpxError::Config(format!("{name} is not a valid number: '{raw}'")))
}

/// Explicit construction-time overrides for file/environment configuration.
///
/// Fields left `None` fall through to the underlying source.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub url: Option<String>,
    pub db: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
    pub retry_delay: Option<Duration>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn with_db(mut self, db: &str) -> Self {
        self.db = Some(db.to_string());
        self
    }

    pub fn with_username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = Some(retry_delay);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_trailing_slashes() {
        let config = ClientConfig::new("https://erp.example.com///");
        assert_eq!(config.url, "https://erp.example.com");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn overrides_win_field_by_field() {
        let base = ClientConfig::new("https://erp.example.com")
            .with_db("production")
            .with_username("alice");

        let merged = base.apply(
            ConfigOverrides::new()
                .with_db("staging")
                .with_max_retries(2),
        );

        assert_eq!(merged.db.as_deref(), Some("staging"));
        // Unset override fields keep the underlying value, not the default.
        assert_eq!(merged.username.as_deref(), Some("alice"));
        assert_eq!(merged.max_retries, 2);
    }

    #[test]
    fn override_url_is_normalized() {
        let merged = ClientConfig::new("https://a.example.com")
            .apply(ConfigOverrides::new().with_url("https://b.example.com/"));
        assert_eq!(merged.url, "https://b.example.com");
    }

    #[test]
    fn builder_sets_credentials() {
        let config = ClientConfig::new("https://erp.example.com")
            .with_api_key("key-123")
            .with_retry_delay(Duration::from_millis(250));
        assert_eq!(config.api_key.as_deref(), Some("key-123"));
        assert_eq!(config.retry_delay, Duration::from_millis(250));
    }
}
