//! Configuration file parser for ~/.config/gleaner/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as a warning, since they are
//! usually typos.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::feed::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, REFRESH_CAP, SUBSCRIBE_CAP};

/// Environment variable holding the scheduled-refresh secret.
pub const CRON_SECRET_ENV: &str = "CRON_SECRET";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Which [`FeedStore`](crate::storage::FeedStore) backs the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Sqlite,
    Json,
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// `cron_secret` is masked in `Debug` output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Owner id for interactive commands (add, list, mark read).
    pub user: String,

    pub storage: StorageKind,

    /// SQLite file. Defaults to `gleaner.db` in the config directory.
    pub database_path: Option<PathBuf>,

    /// JSON snapshot file. Defaults to `gleaner.json` in the config directory.
    pub json_path: Option<PathBuf>,

    /// Per-request timeout for discovery scrapes and feed fetches.
    pub request_timeout_secs: u64,

    pub user_agent: String,

    /// Maximum new articles stored per feed in one refresh cycle.
    pub refresh_cap: usize,

    /// Maximum articles stored when a feed is first added.
    pub subscribe_cap: usize,

    /// Interval for `watch`. 0 = no scheduled loop.
    pub refresh_interval_minutes: u64,

    /// Shared secret for scheduled refreshes (alternative to CRON_SECRET env var).
    /// Env var takes precedence over config file.
    pub cron_secret: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: "local".to_string(),
            storage: StorageKind::Sqlite,
            database_path: None,
            json_path: None,
            request_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            refresh_cap: REFRESH_CAP,
            subscribe_cap: SUBSCRIBE_CAP,
            refresh_interval_minutes: 0,
            cron_secret: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("user", &self.user)
            .field("storage", &self.storage)
            .field("database_path", &self.database_path)
            .field("json_path", &self.json_path)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("refresh_cap", &self.refresh_cap)
            .field("subscribe_cap", &self.subscribe_cap)
            .field("refresh_interval_minutes", &self.refresh_interval_minutes)
            .field(
                "cron_secret",
                &self.cron_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

const KNOWN_KEYS: [&str; 10] = [
    "user",
    "storage",
    "database_path",
    "json_path",
    "request_timeout_secs",
    "user_agent",
    "refresh_cap",
    "subscribe_cap",
    "refresh_interval_minutes",
    "cron_secret",
];

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Longest `watch` interval accepted (one week).
    pub const MAX_REFRESH_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        if config.refresh_interval_minutes > Self::MAX_REFRESH_INTERVAL_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "refresh_interval_minutes is {} (max {})",
                config.refresh_interval_minutes,
                Self::MAX_REFRESH_INTERVAL_MINUTES
            )));
        }
        tracing::info!(
            user = %config.user,
            storage = ?config.storage,
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Period of the `watch` loop, `None` when it is disabled.
    pub fn refresh_interval(&self) -> Option<Duration> {
        match self.refresh_interval_minutes {
            0 => None,
            minutes => Some(Duration::from_secs(minutes.saturating_mul(60))),
        }
    }

    /// The scheduled-refresh secret, from `CRON_SECRET` or the config file.
    pub fn cron_secret(&self) -> Option<SecretString> {
        resolve_secret(
            std::env::var(CRON_SECRET_ENV).ok(),
            self.cron_secret.as_deref(),
        )
    }
}

/// Env value wins over the file value; blank values count as unset.
fn resolve_secret(env: Option<String>, file: Option<&str>) -> Option<SecretString> {
    env.filter(|s| !s.trim().is_empty())
        .or_else(|| file.filter(|s| !s.trim().is_empty()).map(str::to_string))
        .map(SecretString::from)
}

// ============================================================================
// Tests
// ============================================================================
