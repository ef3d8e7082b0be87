//! Main application configuration
//!
//! This module defines the configuration structures for the rating ledger,
//! including TOML and environment variable loading and validation.

use crate::config::rating::RatingConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: RatingConfig,
    pub engine: EngineSettings,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Whether Game Intake checks competition membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EligibilityPolicy {
    Enforce,
    Ignore,
}

impl FromStr for EligibilityPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "enforce" => Ok(EligibilityPolicy::Enforce),
            "ignore" => Ok(EligibilityPolicy::Ignore),
            other => Err(anyhow!("Invalid eligibility policy: {}", other)),
        }
    }
}

/// Engine behaviour settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub eligibility: EligibilityPolicy,
    /// Attempts at the announce transaction when team creation conflicts
    pub max_resolve_attempts: u32,
    /// Default page size of latest games
    pub latest_games_limit: usize,
    /// Default window of the recent-games summary
    pub recent_games_count: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "rating-ledger".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            eligibility: EligibilityPolicy::Enforce,
            max_resolve_attempts: 3,
            latest_games_limit: 20,
            recent_games_count: 10,
        }
    }
}

/// Parse an environment variable if it is set
fn env_value<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("Invalid {} value: {}", key, raw)),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse TOML configuration")
    }

    /// Override fields from `LEDGER_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(name) = env_value("LEDGER_SERVICE_NAME")? {
            self.service.name = name;
        }
        if let Some(log_level) = env_value("LEDGER_LOG_LEVEL")? {
            self.service.log_level = log_level;
        }

        if let Some(mu) = env_value("LEDGER_INITIAL_MU")? {
            self.rating.initial_mu = mu;
        }
        if let Some(sigma) = env_value("LEDGER_INITIAL_SIGMA")? {
            self.rating.initial_sigma = sigma;
        }
        if let Some(beta) = env_value("LEDGER_BETA")? {
            self.rating.beta = beta;
        }
        if let Some(tau) = env_value("LEDGER_TAU")? {
            self.rating.tau = tau;
        }
        if let Some(draw) = env_value("LEDGER_DRAW_PROBABILITY")? {
            self.rating.draw_probability = draw;
        }

        if let Some(policy) = env_value("LEDGER_ELIGIBILITY")? {
            self.engine.eligibility = policy;
        }
        if let Some(attempts) = env_value("LEDGER_MAX_RESOLVE_ATTEMPTS")? {
            self.engine.max_resolve_attempts = attempts;
        }
        if let Some(limit) = env_value("LEDGER_LATEST_GAMES_LIMIT")? {
            self.engine.latest_games_limit = limit;
        }
        if let Some(count) = env_value("LEDGER_RECENT_GAMES_COUNT")? {
            self.engine.recent_games_count = count;
        }

        Ok(())
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }

    config.rating.validate()?;

    if config.engine.max_resolve_attempts == 0 {
        return Err(anyhow!("Max resolve attempts must be greater than 0"));
    }
    if config.engine.latest_games_limit == 0 {
        return Err(anyhow!("Latest games limit must be greater than 0"));
    }

    Ok(())
}
