//! Configuration for the ledger

use crate::{
    coin::{Coin, Rate},
    types::{Account, AccountKey, GlobalParams},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ledger configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Creation time stamped on genesis accounts
    pub genesis_time: DateTime<Utc>,

    /// Protocol-wide economic parameters
    pub global: GlobalParams,

    /// Accounts present at genesis
    pub genesis_accounts: Vec<GenesisAccount>,
}

/// Account present at genesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    /// Account name
    pub username: String,

    /// Savings balance in tokens
    #[serde(default = "zero_tokens")]
    pub saving: String,

    /// Checking balance in tokens
    #[serde(default = "zero_tokens")]
    pub checking: String,
}

fn zero_tokens() -> String {
    "0".to_string()
}

impl GenesisAccount {
    /// Build the account record
    pub fn to_account(&self, created_at: DateTime<Utc>) -> crate::Result<Account> {
        Ok(Account {
            username: AccountKey::new(self.username.clone()),
            saving: Coin::from_token_str(&self.saving)?,
            checking: Coin::from_token_str(&self.checking)?,
            created_at,
            donation_relationships: BTreeMap::new(),
        })
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from TOML text
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from environment variables
    pub fn apply_env(&mut self) -> crate::Result<()> {
        if let Ok(rate) = std::env::var("LEDGER_FRICTION_RATE") {
            self.global.consumption_friction_rate = rate.parse::<Rate>()?;
        }

        if let Ok(delay) = std::env::var("LEDGER_REWARD_DELAY_SECS") {
            self.global.reward_event_delay_secs = delay.parse().map_err(|e| {
                crate::Error::Config(format!("LEDGER_REWARD_DELAY_SECS: {}", e))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.global.consumption_friction_rate, Rate::ONE_PERCENT);
        assert!(config.genesis_accounts.is_empty());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
genesis_time = "2018-05-01T00:00:00Z"

[global]
consumption_friction_rate = "0.05"
reward_event_delay_secs = 60

[global.evaluate]
time_half_life_secs = 3600
reward_saturation = 1000000
repeat_donation_threshold = 5

[[genesis_accounts]]
username = "alice"
saving = "1000"

[[genesis_accounts]]
username = "bob"
checking = "2.5"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.global.consumption_friction_rate, "0.05".parse().unwrap());
        assert_eq!(config.global.reward_event_delay_secs, 60);
        assert_eq!(config.global.evaluate.repeat_donation_threshold, 5);
        assert_eq!(config.genesis_accounts.len(), 2);

        let bob = config.genesis_accounts[1]
            .to_account(config.genesis_time)
            .unwrap();
        assert_eq!(bob.checking, Coin::new(250_000));
        assert_eq!(bob.saving, Coin::ZERO);
    }

    #[test]
    fn test_out_of_range_rate_is_rejected() {
        let err = Config::from_toml(
            r#"
[global]
consumption_friction_rate = "1.5"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
