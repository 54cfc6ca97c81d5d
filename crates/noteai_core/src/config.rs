//! Runtime configuration for the versioning core.
//!
//! # Responsibility
//! - Deserialize TOML configuration with defaults for every field.
//! - Validate values before any component is built from them.
//!
//! # Invariants
//! - `retention_limit >= 1` and `debounce_window_ms >= 1`.
//! - `pending_ttl_ms >= debounce_window_ms`, so a pending save can outlive
//!   its own debounce window.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_RETENTION_LIMIT: usize = 50;
pub const DEFAULT_DEBOUNCE_WINDOW_MS: u64 = 5_000;
pub const DEFAULT_PENDING_TTL_MS: u64 = 60_000;

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config syntax: {err}"),
            Self::Invalid(message) => write!(f, "invalid config value: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub versioning: VersioningConfig,
    pub logging: LoggingConfig,
}

/// Version store and auto-save tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VersioningConfig {
    /// Snapshots kept per note.
    pub retention_limit: usize,
    /// Quiet period before a pending auto-save commits.
    pub debounce_window_ms: u64,
    /// Maximum age of a pending auto-save when its timer fires.
    pub pending_ttl_ms: u64,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            retention_limit: DEFAULT_RETENTION_LIMIT,
            debounce_window_ms: DEFAULT_DEBOUNCE_WINDOW_MS,
            pending_ttl_ms: DEFAULT_PENDING_TTL_MS,
        }
    }
}

impl VersioningConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retention_limit == 0 {
            return Err(ConfigError::Invalid(
                "versioning.retention_limit must be at least 1".to_string(),
            ));
        }
        if self.debounce_window_ms == 0 {
            return Err(ConfigError::Invalid(
                "versioning.debounce_window_ms must be at least 1".to_string(),
            ));
        }
        if self.pending_ttl_ms < self.debounce_window_ms {
            return Err(ConfigError::Invalid(format!(
                "versioning.pending_ttl_ms ({}) must not be shorter than debounce_window_ms ({})",
                self.pending_ttl_ms, self.debounce_window_ms
            )));
        }
        Ok(())
    }

    pub fn retention(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.retention_limit).ok_or_else(|| {
            ConfigError::Invalid("versioning.retention_limit must be at least 1".to_string())
        })
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    pub fn pending_ttl(&self) -> Duration {
        Duration::from_millis(self.pending_ttl_ms)
    }
}

/// File logging settings; see `logging::init_logging`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            dir: None,
        }
    }
}

impl AppConfig {
    /// Parses and validates TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.versioning.validate()
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, DEFAULT_PENDING_TTL_MS, DEFAULT_RETENTION_LIMIT};
    use std::time::Duration;

    #[test]
    fn empty_text_yields_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.versioning.retention_limit, DEFAULT_RETENTION_LIMIT);
        assert_eq!(config.versioning.debounce_window(), Duration::from_secs(5));
        assert_eq!(config.versioning.pending_ttl_ms, DEFAULT_PENDING_TTL_MS);
        assert_eq!(config.logging.dir, None);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml_str(
            "[versioning]\nretention_limit = 3\n\n[logging]\nlevel = \"warn\"\n",
        )
        .unwrap();
        assert_eq!(config.versioning.retention().unwrap().get(), 3);
        assert_eq!(config.versioning.debounce_window_ms, 5_000);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn zero_retention_is_rejected() {
        let err = AppConfig::from_toml_str("[versioning]\nretention_limit = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn ttl_shorter_than_debounce_is_rejected() {
        let err = AppConfig::from_toml_str(
            "[versioning]\ndebounce_window_ms = 2000\npending_ttl_ms = 1000\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("pending_ttl_ms"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = AppConfig::from_toml_str("[versioning]\nretention = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
