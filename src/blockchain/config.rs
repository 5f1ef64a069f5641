use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fs;
use std::path::Path;

/// Errors that can occur while loading a chain configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Tunable parameters of a chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Minimum difficulty a block must score to be accepted
    pub min_difficulty: u64,

    /// Reward recorded on the genesis block
    pub genesis_reward: f64,

    /// Difficulty (and cumulative difficulty) of the genesis block
    pub genesis_difficulty: u64,

    /// Reward attached to every proposed block
    pub block_reward: f64,

    /// Default capacity for ledgers built by callers
    pub ledger_capacity: usize,

    /// Nonce attempts before mining gives up; `None` means unbounded
    pub max_mining_attempts: Option<u64>,

    /// Threads used to search nonces
    pub mining_workers: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig {
            min_difficulty: 4,
            genesis_reward: 0.0,
            genesis_difficulty: 0,
            block_reward: 50.0,
            ledger_capacity: 100,
            max_mining_attempts: Some(10_000_000),
            mining_workers: 1,
        }
    }
}

impl ChainConfig {
    /// Parses a JSON config; missing fields take their defaults
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: ChainConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.genesis_reward.is_finite() || self.genesis_reward < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "genesis_reward must be finite and non-negative, got {}",
                self.genesis_reward
            )));
        }

        if !self.block_reward.is_finite() || self.block_reward < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "block_reward must be finite and non-negative, got {}",
                self.block_reward
            )));
        }

        if self.mining_workers == 0 {
            return Err(ConfigError::Invalid("mining_workers must be at least 1".to_string()));
        }

        Ok(())
    }
}
