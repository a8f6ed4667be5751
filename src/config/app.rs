//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! rating engine, including TOML/environment loading and validation.

use crate::config::rating::{RatingAlgorithmKind, RatingSettings};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: RatingSettings,
    pub processing: ProcessingSettings,
    pub storage: StorageSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Chronological processing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingSettings {
    /// Games between progress sink updates
    pub progress_interval: u64,
    /// Maximum operations per ranking batch commit
    pub batch_write_limit: usize,
    /// Decimal digits kept when comparing mu for ranks
    pub rank_precision_digits: u32,
    /// Index of the first season to load, 0 = earliest season
    pub start_index: usize,
}

/// Document store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// JSON document store file used by the command line runner
    pub data_file: PathBuf,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "league-ratings".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            progress_interval: 100,
            batch_write_limit: 500,
            rank_precision_digits: 6,
            start_index: 0,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("league-data.json"),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }

        // Rating settings
        if let Ok(algorithm) = env::var("RATING_ALGORITHM") {
            config.rating.algorithm = algorithm.parse::<RatingAlgorithmKind>()?;
        }
        if let Ok(enabled) = env::var("DECAY_ENABLED") {
            config.rating.decay.enabled = enabled
                .parse()
                .map_err(|_| anyhow!("Invalid DECAY_ENABLED value: {}", enabled))?;
        }
        if let Ok(factor) = env::var("DECAY_FACTOR") {
            config.rating.decay.factor = factor
                .parse()
                .map_err(|_| anyhow!("Invalid DECAY_FACTOR value: {}", factor))?;
        }
        if let Ok(k_factor) = env::var("ELO_K_FACTOR") {
            config.rating.elo.k_factor = k_factor
                .parse()
                .map_err(|_| anyhow!("Invalid ELO_K_FACTOR value: {}", k_factor))?;
        }

        // Processing settings
        if let Ok(interval) = env::var("PROGRESS_INTERVAL") {
            config.processing.progress_interval = interval
                .parse()
                .map_err(|_| anyhow!("Invalid PROGRESS_INTERVAL value: {}", interval))?;
        }
        if let Ok(limit) = env::var("BATCH_WRITE_LIMIT") {
            config.processing.batch_write_limit = limit
                .parse()
                .map_err(|_| anyhow!("Invalid BATCH_WRITE_LIMIT value: {}", limit))?;
        }
        if let Ok(start) = env::var("START_INDEX") {
            config.processing.start_index = start
                .parse()
                .map_err(|_| anyhow!("Invalid START_INDEX value: {}", start))?;
        }

        // Storage settings
        if let Ok(path) = env::var("DATA_FILE") {
            config.storage.data_file = PathBuf::from(path);
        }

        validate_config(&config)?;
        Ok(config)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    config.rating.validate()?;

    // Validate processing settings
    if config.processing.progress_interval == 0 {
        return Err(anyhow!("Progress interval must be greater than 0"));
    }
    if config.processing.batch_write_limit == 0 {
        return Err(anyhow!("Batch write limit must be greater than 0"));
    }
    if config.processing.rank_precision_digits > 12 {
        return Err(anyhow!("Rank precision cannot exceed 12 digits"));
    }

    if config.storage.data_file.as_os_str().is_empty() {
        return Err(anyhow!("Data file path cannot be empty"));
    }

    Ok(())
}
