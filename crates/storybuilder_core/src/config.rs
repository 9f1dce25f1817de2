//! Runtime configuration resolved from environment variables.
//!
//! # Responsibility
//! - Resolve storage location, storage key and logging settings in one place.
//!
//! # Invariants
//! - Blank values are treated as unset.
//! - `log_level` is always a normalized level name.

use crate::logging::{default_log_level, normalize_level, LoggingError};
use crate::repo::story_repo::DEFAULT_STORAGE_KEY;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "STORYBUILDER_DB_PATH";
pub const ENV_STORAGE_KEY: &str = "STORYBUILDER_STORAGE_KEY";
pub const ENV_LOG_LEVEL: &str = "STORYBUILDER_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "STORYBUILDER_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "storybuilder.sqlite3";

#[derive(Debug)]
pub enum ConfigError {
    InvalidLogLevel(LoggingError),
    RelativeLogDir(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLogLevel(err) => write!(f, "{ENV_LOG_LEVEL}: {err}"),
            Self::RelativeLogDir(path) => write!(
                f,
                "{ENV_LOG_DIR} must be an absolute path, got `{}`",
                path.display()
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidLogLevel(err) => Some(err),
            Self::RelativeLogDir(_) => None,
        }
    }
}

/// Resolved core settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite file backing the key-value store.
    pub db_path: PathBuf,
    /// Key the story collection is persisted under.
    pub storage_key: String,
    pub log_level: &'static str,
    /// File logging is disabled when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Resolves configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(key) = read(ENV_STORAGE_KEY) {
            config.storage_key = key;
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = normalize_level(&level).map_err(ConfigError::InvalidLogLevel)?;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            let dir = PathBuf::from(dir);
            if !dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir));
            }
            config.log_dir = Some(dir);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, ENV_DB_PATH, ENV_LOG_DIR, ENV_LOG_LEVEL, ENV_STORAGE_KEY};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = CoreConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.storage_key, "SavedStories");
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn overrides_are_applied_and_blank_values_ignored() {
        let log_dir = std::env::temp_dir().join("storybuilder-logs");
        let log_dir_str = log_dir.to_str().expect("temp dir should be valid UTF-8");
        let config = CoreConfig::from_lookup(lookup_from(&[
            (ENV_DB_PATH, "/tmp/custom.sqlite3"),
            (ENV_STORAGE_KEY, "   "),
            (ENV_LOG_LEVEL, "WARNING"),
            (ENV_LOG_DIR, log_dir_str),
        ]))
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/custom.sqlite3"));
        assert_eq!(config.storage_key, "SavedStories");
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(log_dir));
    }

    #[test]
    fn invalid_level_and_relative_log_dir_are_rejected() {
        let err = CoreConfig::from_lookup(lookup_from(&[(ENV_LOG_LEVEL, "loud")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel(_)));

        let err = CoreConfig::from_lookup(lookup_from(&[(ENV_LOG_DIR, "logs")])).unwrap_err();
        assert!(matches!(err, ConfigError::RelativeLogDir(_)));
    }
}
