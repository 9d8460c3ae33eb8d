use std::path::Path;

use serde::Deserialize;
use zkrollup_common::{Address, H256, constants::HALT_AGGREGATION_TIMEOUT};

pub const ROLLUP_PREFIX: &str = "ROLLUP_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Error deserializing config from env: {err}. From config: {from:?}")]
    ConfigDeserializationError { err: envy::Error, from: String },
    #[error("Error reading config file: {0}")]
    ConfigFileError(#[from] std::io::Error),
    #[error("Error parsing config file: {0}")]
    ConfigParseError(#[from] serde_json::Error),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// Genesis parameters of a rollup deployment.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RollupConfig {
    pub admin: Address,
    pub trusted_sequencer: Address,
    #[serde(default)]
    pub trusted_sequencer_url: String,
    pub trusted_aggregator: Address,
    pub trusted_aggregator_timeout: u64,
    pub pending_state_timeout: u64,
    #[serde(default)]
    pub force_batch_allowed: bool,
    pub chain_id: u64,
    #[serde(default)]
    pub network_name: String,
    pub genesis_root: H256,
}

impl RollupConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        envy::prefixed(ROLLUP_PREFIX)
            .from_env::<Self>()
            .map_err(|e| ConfigError::ConfigDeserializationError {
                err: e,
                from: "RollupConfig".to_string(),
            })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trusted_aggregator_timeout > HALT_AGGREGATION_TIMEOUT {
            return Err(ConfigError::InvalidValue(format!(
                "trusted_aggregator_timeout {} exceeds {HALT_AGGREGATION_TIMEOUT}",
                self.trusted_aggregator_timeout
            )));
        }
        if self.pending_state_timeout > HALT_AGGREGATION_TIMEOUT {
            return Err(ConfigError::InvalidValue(format!(
                "pending_state_timeout {} exceeds {HALT_AGGREGATION_TIMEOUT}",
                self.pending_state_timeout
            )));
        }
        Ok(())
    }

    pub fn to_env(&self) -> String {
        format!(
            "
{ROLLUP_PREFIX}ADMIN={:#x}
{ROLLUP_PREFIX}TRUSTED_SEQUENCER={:#x}
{ROLLUP_PREFIX}TRUSTED_SEQUENCER_URL={}
{ROLLUP_PREFIX}TRUSTED_AGGREGATOR={:#x}
{ROLLUP_PREFIX}TRUSTED_AGGREGATOR_TIMEOUT={}
{ROLLUP_PREFIX}PENDING_STATE_TIMEOUT={}
{ROLLUP_PREFIX}FORCE_BATCH_ALLOWED={}
{ROLLUP_PREFIX}CHAIN_ID={}
{ROLLUP_PREFIX}NETWORK_NAME={}
{ROLLUP_PREFIX}GENESIS_ROOT={:#x}
",
            self.admin,
            self.trusted_sequencer,
            self.trusted_sequencer_url,
            self.trusted_aggregator,
            self.trusted_aggregator_timeout,
            self.pending_state_timeout,
            self.force_batch_allowed,
            self.chain_id,
            self.network_name,
            self.genesis_root,
        )
    }
}
