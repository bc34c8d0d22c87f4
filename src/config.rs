//! Configuration management
//!
//! TOML configuration with environment variable overrides and sensible
//! defaults. Every field is optional in the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::facet::FacetCountMode;
use crate::types::Metric;

/// Environment variable naming a configuration file
pub const CONFIG_ENV: &str = "FIO_ANALYTICS_CONFIG";

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "fio-analytics.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Engine behavior
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Logging
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Engine behavior
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalyticsConfig {
    /// Which records a facet's own options are counted from
    #[serde(default)]
    pub facet_count_mode: FacetCountMode,

    /// Metric used when a command does not name one
    #[serde(default = "default_metric")]
    pub default_metric: Metric,

    /// Number of (dataset, filter state) results kept in memory
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Restrict trends to the last N days (unset = full history)
    #[serde(default)]
    pub trend_window_days: Option<u32>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonitoringConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones
    #[serde(default)]
    pub structured_logging: bool,
}

// Default value functions
fn default_metric() -> Metric { Metric::Iops }
fn default_cache_capacity() -> usize { 64 }
fn default_log_level() -> String { "info".to_string() }

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            facet_count_mode: FacetCountMode::default(),
            default_metric: default_metric(),
            cache_capacity: default_cache_capacity(),
            trend_window_days: None,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            structured_logging: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Load from a file, apply environment overrides and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the configuration source and load it
    ///
    /// Priority:
    /// 1. `explicit` path (command line)
    /// 2. `FIO_ANALYTICS_CONFIG` environment variable
    /// 3. `fio-analytics.toml` in the working directory
    /// 4. Defaults
    ///
    /// Returns the file that was used, if any.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let candidate = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(|| {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                local.exists().then_some(local)
            });

        match candidate {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => Ok((Self::from_env()?, None)),
        }
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(level) = std::env::var("FIO_ANALYTICS_LOG_LEVEL") {
            self.monitoring.log_level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.monitoring.log_level = level;
        }

        if let Ok(metric) = std::env::var("FIO_ANALYTICS_DEFAULT_METRIC") {
            self.analytics.default_metric = metric.parse()?;
        }
        if let Ok(capacity) = std::env::var("FIO_ANALYTICS_CACHE_CAPACITY") {
            self.analytics.cache_capacity = capacity.parse().map_err(|_| {
                Error::Configuration(format!("Invalid cache capacity: {}", capacity))
            })?;
        }
        if let Ok(mode) = std::env::var("FIO_ANALYTICS_FACET_COUNT_MODE") {
            self.analytics.facet_count_mode = mode.parse()?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.analytics.cache_capacity == 0 {
            return Err(Error::Configuration(
                "Cache capacity must be > 0".to_string(),
            ));
        }
        if self.analytics.trend_window_days == Some(0) {
            return Err(Error::Configuration(
                "Trend window must be at least one day".to_string(),
            ));
        }
        if self.monitoring.log_level.trim().is_empty() {
            return Err(Error::Configuration("Log level cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
