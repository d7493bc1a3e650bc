//! Configuration system for lingo.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{LingoError, LingoResult};
use crate::types::{DEFAULT_EASE_FACTOR, DEFAULT_INTERVAL_DAYS};

/// Tuning constants for the SM-2 style scheduler.
///
/// The defaults are the production values; changing them changes every
/// learner's schedule, so only tests and experiments should override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Hard lower bound on the ease factor.
    pub ease_floor: f64,
    /// Ease factor of new and reset cards.
    pub initial_ease: f64,
    /// Interval of new and reset cards, and the interval after a lapse.
    pub initial_interval_days: f64,
    /// Lower bound on any computed interval.
    pub min_interval_days: f64,
    /// Ease penalty for `again`.
    pub again_ease_penalty: f64,
    /// Ease penalty for `hard`.
    pub hard_ease_penalty: f64,
    /// Ease bonus for `good`.
    pub good_ease_bonus: f64,
    /// Ease bonus for `easy`.
    pub easy_ease_bonus: f64,
    /// Interval multiplier for `hard`.
    pub hard_interval_multiplier: f64,
    /// Extra interval multiplier for `easy`, applied on top of the ease factor.
    pub easy_interval_bonus: f64,
    /// Number of most recent reviews considered for mastery.
    pub mastery_window: usize,
    /// Highest mastery level.
    pub max_mastery: u8,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            ease_floor: 1.3,
            initial_ease: DEFAULT_EASE_FACTOR,
            initial_interval_days: DEFAULT_INTERVAL_DAYS,
            min_interval_days: 1.0,
            again_ease_penalty: 0.2,
            hard_ease_penalty: 0.15,
            good_ease_bonus: 0.1,
            easy_ease_bonus: 0.15,
            hard_interval_multiplier: 0.8,
            easy_interval_bonus: 1.3,
            mastery_window: 5,
            max_mastery: 5,
        }
    }
}

impl SchedulerConfig {
    /// Check that the constants keep the scheduler's invariants intact.
    pub fn validate(&self) -> LingoResult<()> {
        if !(self.ease_floor > 0.0) {
            return Err(LingoError::Configuration(format!(
                "ease_floor must be positive, got {}",
                self.ease_floor
            )));
        }
        if self.initial_ease < self.ease_floor {
            return Err(LingoError::Configuration(format!(
                "initial_ease ({}) must not be below ease_floor ({})",
                self.initial_ease, self.ease_floor
            )));
        }
        if !(self.min_interval_days > 0.0) {
            return Err(LingoError::Configuration(format!(
                "min_interval_days must be positive, got {}",
                self.min_interval_days
            )));
        }
        if self.initial_interval_days < self.min_interval_days {
            return Err(LingoError::Configuration(format!(
                "initial_interval_days ({}) must not be below min_interval_days ({})",
                self.initial_interval_days, self.min_interval_days
            )));
        }
        if self.mastery_window == 0 {
            return Err(LingoError::Configuration(
                "mastery_window must be at least 1".to_string(),
            ));
        }
        // A good review multiplies by the ease, which is never below the floor
        if self.hard_interval_multiplier > self.ease_floor {
            return Err(LingoError::Configuration(format!(
                "hard_interval_multiplier ({}) must not exceed ease_floor ({}), \
                 or a hard review could outgrow a good one",
                self.hard_interval_multiplier, self.ease_floor
            )));
        }
        if self.easy_interval_bonus < 1.0 {
            return Err(LingoError::Configuration(format!(
                "easy_interval_bonus ({}) must be at least 1.0, \
                 or an easy review could fall short of a good one",
                self.easy_interval_bonus
            )));
        }
        Ok(())
    }
}

/// Review store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database.
    pub db_path: PathBuf,
    /// Keep the database in memory instead of on disk.
    pub in_memory: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let lingo_dir = dirs::home_dir()
            .map(|h| h.join(".lingo"))
            .unwrap_or_else(|| PathBuf::from(".lingo"));

        Self {
            db_path: lingo_dir.join("flashcards.db"),
            in_memory: false,
        }
    }
}

/// Main lingo configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LingoConfig {
    /// Scheduler constants.
    pub scheduler: SchedulerConfig,
    /// Review store settings.
    pub store: StoreConfig,
}

impl LingoConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> LingoResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| LingoError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| LingoError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| LingoError::Configuration(e.to_string()))?,
            _ => {
                return Err(LingoError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };

        config.scheduler.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("LINGO_DB_PATH") {
            config.store.db_path = PathBuf::from(path);
        }
        if let Some(floor) = env_parse::<f64>("LINGO_EASE_FLOOR") {
            config.scheduler.ease_floor = floor;
        }
        if let Some(ease) = env_parse::<f64>("LINGO_INITIAL_EASE") {
            config.scheduler.initial_ease = ease;
        }
        if let Some(window) = env_parse::<usize>("LINGO_MASTERY_WINDOW") {
            config.scheduler.mastery_window = window;
        }

        config
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> LingoConfigBuilder {
        LingoConfigBuilder::default()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Builder for LingoConfig.
#[derive(Default)]
pub struct LingoConfigBuilder {
    config: LingoConfig,
}

impl LingoConfigBuilder {
    /// Set scheduler configuration.
    pub fn scheduler(mut self, config: SchedulerConfig) -> Self {
        self.config.scheduler = config;
        self
    }

    /// Set database path.
    pub fn db_path(mut self, path: PathBuf) -> Self {
        self.config.store.db_path = path;
        self.config.store.in_memory = false;
        self
    }

    /// Use an in-memory database.
    pub fn in_memory(mut self) -> Self {
        self.config.store.in_memory = true;
        self
    }

    /// Build the configuration, validating scheduler constants.
    pub fn build(self) -> LingoResult<LingoConfig> {
        self.config.scheduler.validate()?;
        Ok(self.config)
    }
}
