use vocab_core::model::{
    DEFAULT_DISTRACTOR_COUNT, DEFAULT_MEMORIZATION_THRESHOLD, DEFAULT_SESSION_BATCH_SIZE,
    DEFAULT_STALE_RESET_DAYS, LearningSettings,
};

use crate::error::ConfigError;

pub const DB_URL_VAR: &str = "VOCAB_DB_URL";
pub const SESSION_BATCH_SIZE_VAR: &str = "VOCAB_SESSION_BATCH_SIZE";
pub const MEMORIZATION_THRESHOLD_VAR: &str = "VOCAB_MEMORIZATION_THRESHOLD";
pub const STALE_RESET_DAYS_VAR: &str = "VOCAB_STALE_RESET_DAYS";
pub const DISTRACTOR_COUNT_VAR: &str = "VOCAB_DISTRACTOR_COUNT";

pub const DEFAULT_DB_URL: &str = "sqlite:vocab.sqlite3";

/// Runtime configuration: where the database lives and the learning tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_url: String,
    pub settings: LearningSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_string(),
            settings: LearningSettings::default(),
        }
    }
}

impl AppConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set but malformed, or when the
    /// resulting settings fail validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads configuration through `lookup`, which returns `None` for unset variables.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_url = match lookup(DB_URL_VAR) {
            Some(url) if url.trim().is_empty() => {
                return Err(ConfigError::Empty { var: DB_URL_VAR });
            }
            Some(url) => url,
            None => DEFAULT_DB_URL.to_string(),
        };

        let number = |var: &'static str, default: u32| -> Result<u32, ConfigError> {
            match lookup(var) {
                None => Ok(default),
                Some(raw) => raw
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
            }
        };

        let settings = LearningSettings::new(
            number(SESSION_BATCH_SIZE_VAR, DEFAULT_SESSION_BATCH_SIZE)?,
            number(MEMORIZATION_THRESHOLD_VAR, DEFAULT_MEMORIZATION_THRESHOLD)?,
            number(STALE_RESET_DAYS_VAR, DEFAULT_STALE_RESET_DAYS)?,
            number(DISTRACTOR_COUNT_VAR, DEFAULT_DISTRACTOR_COUNT)?,
        )?;

        Ok(Self { db_url, settings })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use vocab_core::model::SettingsError;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn unset_variables_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_lookup(env(&[
            (DB_URL_VAR, "sqlite::memory:"),
            (SESSION_BATCH_SIZE_VAR, " 10 "),
            (MEMORIZATION_THRESHOLD_VAR, "3"),
        ]))
        .unwrap();
        assert_eq!(config.db_url, "sqlite::memory:");
        assert_eq!(config.settings.session_batch_size(), 10);
        assert_eq!(config.settings.memorization_threshold(), 3);
        assert_eq!(config.settings.stale_reset_days(), DEFAULT_STALE_RESET_DAYS);
    }

    #[test]
    fn malformed_numbers_are_reported() {
        let err = AppConfig::from_lookup(env(&[(STALE_RESET_DAYS_VAR, "five")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidNumber { var: STALE_RESET_DAYS_VAR, .. }
        ));
    }

    #[test]
    fn zero_values_fail_validation() {
        let err = AppConfig::from_lookup(env(&[(SESSION_BATCH_SIZE_VAR, "0")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Settings(SettingsError::InvalidSessionBatchSize)
        ));
    }

    #[test]
    fn blank_db_url_is_rejected() {
        let err = AppConfig::from_lookup(env(&[(DB_URL_VAR, "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Empty { .. }));
    }
}
