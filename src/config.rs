//! Engine configuration: commission rate and round timing windows.
//!
//! Provides defaults, TOML file loading, environment variable overrides
//! and validation. A config is fixed at engine construction and never
//! mutated afterward.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Fixed parameters of a game-house deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// House commission, integer percent of each settled pool.
    pub commission_rate: u8,
    /// Entry window for pooled rounds (jackpot, roulette, wheel), seconds.
    pub entry_window_secs: u64,
    /// Refund deadline for under-filled duel lobbies, seconds.
    pub duel_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            commission_rate: 10,
            entry_window_secs: 60,
            duel_timeout_secs: 300,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Configuration loader with environment variable support.
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path.
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables.
    pub fn load(&self) -> Result<EngineConfig, ConfigError> {
        let mut config = if let Some(ref path) = self.config_path {
            Self::load_from_file(path)?
        } else {
            EngineConfig::default()
        };

        Self::apply_env_overrides(&mut config)?;
        Self::validate(&config)?;

        Ok(config)
    }

    fn load_from_file(path: &str) -> Result<EngineConfig, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to parse TOML: {}", e)))
    }

    fn apply_env_overrides(config: &mut EngineConfig) -> Result<(), ConfigError> {
        if let Ok(value) = env::var("FORTUNA_COMMISSION_RATE") {
            config.commission_rate = Self::parse_env("FORTUNA_COMMISSION_RATE", &value)?;
        }
        if let Ok(value) = env::var("FORTUNA_ENTRY_WINDOW_SECS") {
            config.entry_window_secs = Self::parse_env("FORTUNA_ENTRY_WINDOW_SECS", &value)?;
        }
        if let Ok(value) = env::var("FORTUNA_DUEL_TIMEOUT_SECS") {
            config.duel_timeout_secs = Self::parse_env("FORTUNA_DUEL_TIMEOUT_SECS", &value)?;
        }
        Ok(())
    }

    fn parse_env<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
        value.parse().map_err(|_| ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "not a valid number".to_string(),
        })
    }

    /// Validate a configuration before use.
    pub fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
        if config.commission_rate > 100 {
            return Err(ConfigError::InvalidValue {
                field: "commission_rate".to_string(),
                value: config.commission_rate.to_string(),
                reason: "must be a percentage between 0 and 100".to_string(),
            });
        }
        if config.entry_window_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "entry_window_secs".to_string(),
                value: "0".to_string(),
                reason: "rounds must stay open for a non-zero window".to_string(),
            });
        }
        if config.duel_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "duel_timeout_secs".to_string(),
                value: "0".to_string(),
                reason: "the refund deadline must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
