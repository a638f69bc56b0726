//! Runtime configuration for habit core.
//!
//! # Responsibility
//! - Hold database, logging, and streak policy settings in one place.
//! - Apply `HABITS_*` environment overrides on top of defaults.
//!
//! # Invariants
//! - Invalid override values are rejected, never silently ignored.

use crate::db::DEFAULT_BUSY_TIMEOUT;
use crate::logging::default_log_level;
use crate::model::streak::StreakPolicy;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "HABITS_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "HABITS_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "HABITS_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "HABITS_BUSY_TIMEOUT_MS";
pub const ENV_STREAK_POLICY: &str = "HABITS_STREAK_POLICY";

const DEFAULT_DB_FILE_NAME: &str = "habits.sqlite3";

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid value `{}` for {}; expected {}",
            self.value, self.key, self.expected
        )
    }
}

impl Error for ConfigError {}

/// Settings consumed by front ends when wiring up the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// File logging is disabled when `None`.
    pub log_dir: Option<PathBuf>,
    pub busy_timeout: Duration,
    pub streak_policy: StreakPolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            streak_policy: StreakPolicy::default(),
        }
    }
}

impl CoreConfig {
    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by values from `lookup`, keyed by `HABITS_*` names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let read = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(value);
        }
        if let Some(value) = read(ENV_LOG_LEVEL) {
            config.log_level = value;
        }
        if let Some(value) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = read(ENV_BUSY_TIMEOUT_MS) {
            let millis = value.parse::<u64>().map_err(|_| ConfigError {
                key: ENV_BUSY_TIMEOUT_MS,
                value: value.clone(),
                expected: "a non-negative integer of milliseconds",
            })?;
            config.busy_timeout = Duration::from_millis(millis);
        }
        if let Some(value) = read(ENV_STREAK_POLICY) {
            config.streak_policy = StreakPolicy::parse(&value).ok_or(ConfigError {
                key: ENV_STREAK_POLICY,
                value,
                expected: "continue|reset",
            })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, ENV_BUSY_TIMEOUT_MS, ENV_DB_PATH, ENV_STREAK_POLICY};
    use crate::model::streak::StreakPolicy;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_lookup_yields_defaults() {
        let config = CoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.streak_policy, StreakPolicy::ContinueAcrossGaps);
    }

    #[test]
    fn overrides_are_applied() {
        let config = CoreConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "/tmp/h.db"),
            (ENV_BUSY_TIMEOUT_MS, " 250 "),
            (ENV_STREAK_POLICY, "reset"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/h.db"));
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.streak_policy, StreakPolicy::ResetOnGap);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = CoreConfig::from_lookup(lookup(&[(ENV_BUSY_TIMEOUT_MS, "soon")])).unwrap_err();
        assert_eq!(err.key, ENV_BUSY_TIMEOUT_MS);

        let err = CoreConfig::from_lookup(lookup(&[(ENV_STREAK_POLICY, "maybe")])).unwrap_err();
        assert!(err.to_string().contains("continue|reset"));
    }
}
