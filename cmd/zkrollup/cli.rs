use std::path::PathBuf;

use clap::{ArgAction, Parser as ClapParser, Subcommand as ClapSubcommand};
use tracing::{Level, info};
use zkrollup_common::{
    Address, H256,
    hash_chain::{batch_hash_data, calculate_acc_input_hash},
    utils::{decode_hex, parse_address, parse_h256},
};
use zkrollup_consensus::{RollupConfig, config::ROLLUP_PREFIX};

use crate::replay::{Scenario, replay};

pub const VERSION_STRING: &str = env!("CARGO_PKG_VERSION");

#[allow(clippy::upper_case_acronyms)]
#[derive(ClapParser)]
#[command(name = "zkrollup", author, version = VERSION_STRING, about, long_about = None)]
pub struct CLI {
    #[clap(flatten)]
    pub opts: Options,
    #[command(subcommand)]
    pub command: Subcommand,
}

#[derive(ClapParser)]
pub struct Options {
    #[arg(long = "log.level", default_value_t = Level::INFO, value_name = "LOG_LEVEL")]
    pub log_level: Level,
    #[arg(
        long = "config",
        value_name = "CONFIG_PATH",
        env = "ROLLUP_CONFIG_FILE",
        help = "JSON file with the genesis configuration. Takes precedence over the flags below.",
        help_heading = "Rollup options"
    )]
    pub config_path: Option<PathBuf>,
    #[arg(
        long = "config.from-env",
        action = ArgAction::SetTrue,
        help = "Read the whole genesis configuration from ROLLUP_* variables.",
        help_heading = "Rollup options"
    )]
    pub config_from_env: bool,
    #[arg(
        long = "rollup.admin",
        value_name = "ADDRESS",
        value_parser = parse_address,
        default_value = "0x0000000000000000000000000000000000000001",
        help_heading = "Rollup options"
    )]
    pub admin: Address,
    #[arg(
        long = "rollup.trusted-sequencer",
        value_name = "ADDRESS",
        value_parser = parse_address,
        default_value = "0x0000000000000000000000000000000000000002",
        help_heading = "Rollup options"
    )]
    pub trusted_sequencer: Address,
    #[arg(
        long = "rollup.trusted-sequencer-url",
        value_name = "URL",
        default_value = "http://localhost:8123",
        help_heading = "Rollup options"
    )]
    pub trusted_sequencer_url: String,
    #[arg(
        long = "rollup.trusted-aggregator",
        value_name = "ADDRESS",
        value_parser = parse_address,
        default_value = "0x0000000000000000000000000000000000000003",
        help_heading = "Rollup options"
    )]
    pub trusted_aggregator: Address,
    #[arg(
        long = "rollup.trusted-aggregator-timeout",
        value_name = "SECONDS",
        default_value_t = 604_799,
        help_heading = "Rollup options"
    )]
    pub trusted_aggregator_timeout: u64,
    #[arg(
        long = "rollup.pending-state-timeout",
        value_name = "SECONDS",
        default_value_t = 10,
        help_heading = "Rollup options"
    )]
    pub pending_state_timeout: u64,
    #[arg(
        long = "rollup.force-batch-allowed",
        action = ArgAction::SetTrue,
        help_heading = "Rollup options"
    )]
    pub force_batch_allowed: bool,
    #[arg(
        long = "rollup.chain-id",
        value_name = "CHAIN_ID",
        default_value_t = 1000,
        help_heading = "Rollup options"
    )]
    pub chain_id: u64,
    #[arg(
        long = "rollup.network-name",
        value_name = "NAME",
        default_value = "zkrollup",
        help_heading = "Rollup options"
    )]
    pub network_name: String,
    #[arg(
        long = "rollup.genesis-root",
        value_name = "STATE_ROOT",
        value_parser = parse_h256,
        default_value = "0x0000000000000000000000000000000000000000000000000000000000000001",
        help_heading = "Rollup options"
    )]
    pub genesis_root: H256,
}

impl Options {
    /// Resolves the genesis configuration: config file, then environment, then flags.
    pub fn rollup_config(&self) -> eyre::Result<RollupConfig> {
        let config = if let Some(path) = &self.config_path {
            RollupConfig::from_file(path)?
        } else if self.config_from_env {
            RollupConfig::from_env()?
        } else {
            RollupConfig {
                admin: self.admin,
                trusted_sequencer: self.trusted_sequencer,
                trusted_sequencer_url: self.trusted_sequencer_url.clone(),
                trusted_aggregator: self.trusted_aggregator,
                trusted_aggregator_timeout: self.trusted_aggregator_timeout,
                pending_state_timeout: self.pending_state_timeout,
                force_batch_allowed: self.force_batch_allowed,
                chain_id: self.chain_id,
                network_name: self.network_name.clone(),
                genesis_root: self.genesis_root,
            }
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(ClapSubcommand)]
pub enum Subcommand {
    #[clap(
        name = "replay",
        about = "Replay a JSON scenario against an in-memory rollup and print emitted events"
    )]
    Replay {
        #[clap(required = true, value_name = "SCENARIO_PATH")]
        path: PathBuf,
    },
    #[clap(
        name = "acc-input-hash",
        about = "Fold one batch on top of an accumulated input hash"
    )]
    AccInputHash {
        #[clap(long = "prev", value_parser = parse_h256, default_value = "0x0000000000000000000000000000000000000000000000000000000000000000")]
        prev: H256,
        #[clap(long = "transactions", value_name = "HEX", default_value = "0x")]
        transactions: String,
        #[clap(long = "global-exit-root", value_parser = parse_h256, default_value = "0x0000000000000000000000000000000000000000000000000000000000000000")]
        global_exit_root: H256,
        #[clap(long = "timestamp")]
        timestamp: u64,
        #[clap(long = "sequencer", value_parser = parse_address)]
        sequencer: Address,
    },
    #[clap(
        name = "config",
        about = "Print the resolved genesis configuration as ROLLUP_* variables"
    )]
    Config,
}

impl Subcommand {
    pub fn run(self, opts: &Options) -> eyre::Result<()> {
        match self {
            Subcommand::Replay { path } => {
                let config = opts.rollup_config()?;
                let scenario = Scenario::from_file(&path)?;
                info!(path = %path.display(), steps = scenario.steps.len(), "Replaying scenario");
                for event in replay(&config, scenario)? {
                    println!("{}", serde_json::to_string(&event)?);
                }
            }
            Subcommand::AccInputHash {
                prev,
                transactions,
                global_exit_root,
                timestamp,
                sequencer,
            } => {
                let transactions = decode_hex(&transactions)?;
                let acc_input_hash = calculate_acc_input_hash(
                    prev,
                    batch_hash_data(&transactions),
                    global_exit_root,
                    timestamp,
                    sequencer,
                );
                println!("{acc_input_hash:#x}");
            }
            Subcommand::Config => {
                let config = opts.rollup_config()?;
                info!(prefix = ROLLUP_PREFIX, "Resolved configuration");
                println!("{}", config.to_env().trim());
            }
        }
        Ok(())
    }
}
