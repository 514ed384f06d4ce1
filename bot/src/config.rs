use anyhow::{Context, Result};
use antaria_types::casino::{self, CasinoConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

/// Longest long-poll Telegram accepts.
const MAX_POLL_TIMEOUT_SECS: u64 = 50;

/// Bot configuration, loaded from YAML.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub casino: CasinoConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BotConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_deposit_instructions")]
    pub deposit_instructions: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            poll_timeout_secs: default_poll_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            deposit_instructions: default_deposit_instructions(),
            log_level: default_log_level(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("antaria.db")
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    30
}

fn default_deposit_instructions() -> String {
    "Deposits are credited by an admin. Message the operator with your user id.".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} is out of range: {value} (expected {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
    #[error("{field} must be > 0")]
    InvalidNonZero { field: &'static str },
    #[error("invalid casino config: {0}")]
    Casino(#[from] casino::ConfigError),
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(raw).context("decode yaml")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.log_level()?;
        let poll = self.bot.poll_timeout_secs;
        if poll == 0 || poll > MAX_POLL_TIMEOUT_SECS {
            return Err(ConfigError::OutOfRange {
                field: "poll_timeout_secs",
                value: poll,
                min: 1,
                max: MAX_POLL_TIMEOUT_SECS,
            });
        }
        if self.bot.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidNonZero {
                field: "sweep_interval_secs",
            });
        }
        self.casino.validate()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<Level, ConfigError> {
        self.bot
            .log_level
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel {
                value: self.bot.log_level.clone(),
            })
    }
}
