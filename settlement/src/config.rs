//! Configuration for the settlement service

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settlement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Genesis state and global economic parameters
    pub ledger: ledger_core::Config,

    /// Engagement configuration
    pub engagement: EngagementConfig,

    /// Logging configuration
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "content-settlement".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            ledger: ledger_core::Config::default(),
            engagement: EngagementConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Engagement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    /// Accept report-or-upvote messages that revoke an earlier action
    pub allow_report_revoke: bool,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            allow_report_revoke: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,

    /// Emit JSON lines instead of plain text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text, then apply environment overrides
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `SETTLEMENT_*` and `LEDGER_*` overrides
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(level) = std::env::var("SETTLEMENT_LOG_LEVEL") {
            self.log.level = level;
        }
        if let Ok(allow) = std::env::var("SETTLEMENT_ALLOW_REVOKE") {
            self.engagement.allow_report_revoke = allow.parse().map_err(|_| {
                Error::Config(format!(
                    "SETTLEMENT_ALLOW_REVOKE must be true or false, got {:?}",
                    allow
                ))
            })?;
        }
        self.ledger
            .apply_env()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(())
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.log.level.trim().is_empty() {
            return Err(Error::Config("log.level must not be empty".to_string()));
        }
        Ok(())
    }
}
