//! Replays a recorded sequence of calls against an in-memory deployment.

use std::path::Path;

use eyre::{bail, eyre};
use serde::Deserialize;
use tracing::{debug, info};
use zkrollup_common::{
    Address, Bytes, U256, serde_utils,
    types::{BatchData, ForcedBatchData},
};
use zkrollup_consensus::{
    CallContext, OverridePendingStateRequest, RollupConfig, RollupError, RollupEvent,
    VerifyBatchesRequest,
    dev::{DevRollup, MockVerifier, dev_rollup},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub rollup_address: Address,
    /// Minted and approved for the rollup before the first step.
    #[serde(default)]
    pub funded_accounts: Vec<FundedAccount>,
    #[serde(default)]
    pub reject_proofs: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundedAccount {
    pub account: Address,
    #[serde(with = "serde_utils::u256::hex_or_dec_str")]
    pub amount: U256,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub caller: Address,
    pub timestamp: u64,
    pub call: Call,
    /// Label of the error this step must fail with.
    #[serde(default)]
    pub expect_error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(
    tag = "method",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Call {
    SequenceBatches {
        batches: Vec<BatchData>,
    },
    ForceBatch {
        #[serde(with = "serde_utils::bytes")]
        transactions: Bytes,
        #[serde(with = "serde_utils::u256::hex_or_dec_str")]
        max_fee: U256,
    },
    SequenceForceBatches {
        batches: Vec<ForcedBatchData>,
    },
    VerifyBatches(VerifyBatchesRequest),
    TrustedVerifyBatches(VerifyBatchesRequest),
    OverridePendingState(OverridePendingStateRequest),
    ConsolidatePendingState {
        pending_state_num: u64,
    },
    ActivateEmergencyState {
        sequenced_batch_num: u64,
    },
    AdminActivateEmergencyState,
    SetTrustedSequencer {
        address: Address,
    },
    SetTrustedSequencerUrl {
        url: String,
    },
    SetTrustedAggregator {
        address: Address,
    },
    SetTrustedAggregatorTimeout {
        timeout: u64,
    },
    SetPendingStateTimeout {
        timeout: u64,
    },
    SetMultiplierBatchFee {
        multiplier: u16,
    },
    SetVerifyBatchTimeTarget {
        target: u64,
    },
    SetForceBatchAllowed {
        allowed: bool,
    },
    SetAdmin {
        address: Address,
    },
}

impl Scenario {
    pub fn from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

fn apply_call(rollup: &mut DevRollup, ctx: CallContext, call: Call) -> Result<(), RollupError> {
    match call {
        Call::SequenceBatches { batches } => rollup.sequence_batches(ctx, &batches).map(|_| ()),
        Call::ForceBatch {
            transactions,
            max_fee,
        } => rollup.force_batch(ctx, transactions, max_fee).map(|_| ()),
        Call::SequenceForceBatches { batches } => {
            rollup.sequence_force_batches(ctx, &batches).map(|_| ())
        }
        Call::VerifyBatches(request) => rollup.verify_batches(ctx, &request),
        Call::TrustedVerifyBatches(request) => rollup.trusted_verify_batches(ctx, &request),
        Call::OverridePendingState(request) => rollup.override_pending_state(ctx, &request),
        Call::ConsolidatePendingState { pending_state_num } => {
            rollup.consolidate_pending_state(ctx, pending_state_num)
        }
        Call::ActivateEmergencyState {
            sequenced_batch_num,
        } => rollup.activate_emergency_state(ctx, sequenced_batch_num),
        Call::AdminActivateEmergencyState => rollup.admin_activate_emergency_state(ctx),
        Call::SetTrustedSequencer { address } => rollup.set_trusted_sequencer(ctx, address),
        Call::SetTrustedSequencerUrl { url } => rollup.set_trusted_sequencer_url(ctx, url),
        Call::SetTrustedAggregator { address } => rollup.set_trusted_aggregator(ctx, address),
        Call::SetTrustedAggregatorTimeout { timeout } => {
            rollup.set_trusted_aggregator_timeout(ctx, timeout)
        }
        Call::SetPendingStateTimeout { timeout } => rollup.set_pending_state_timeout(ctx, timeout),
        Call::SetMultiplierBatchFee { multiplier } => {
            rollup.set_multiplier_batch_fee(ctx, multiplier)
        }
        Call::SetVerifyBatchTimeTarget { target } => {
            rollup.set_verify_batch_time_target(ctx, target)
        }
        Call::SetForceBatchAllowed { allowed } => rollup.set_force_batch_allowed(ctx, allowed),
        Call::SetAdmin { address } => rollup.set_admin(ctx, address),
    }
}

/// Runs every step in order and returns the emitted events.
///
/// A step failing with a different outcome than the one it declares aborts the replay.
pub fn replay(config: &RollupConfig, scenario: Scenario) -> eyre::Result<Vec<RollupEvent>> {
    let verifier = if scenario.reject_proofs {
        MockVerifier::rejecting()
    } else {
        MockVerifier::accepting()
    };
    let mut rollup = dev_rollup(config, scenario.rollup_address, verifier);
    for funded in &scenario.funded_accounts {
        rollup.token_mut().mint(funded.account, funded.amount);
        rollup.token_mut().approve(funded.account, funded.amount);
    }

    let mut events = Vec::new();
    for (index, step) in scenario.steps.into_iter().enumerate() {
        let ctx = CallContext::new(step.caller, step.timestamp);
        match (apply_call(&mut rollup, ctx, step.call), step.expect_error) {
            (Ok(()), None) => {}
            (Ok(()), Some(expected)) => {
                bail!("step {index} succeeded but was expected to fail with {expected}")
            }
            (Err(err), Some(expected)) if err.to_label() == expected => {
                debug!(step = index, %err, "Step failed as expected");
            }
            (Err(err), _) => return Err(eyre!("step {index} failed: {err}")),
        }
        events.extend(rollup.drain_events());
    }

    info!(
        last_batch_sequenced = rollup.state().batches().last_batch_sequenced(),
        last_verified_batch = rollup.last_verified_batch(),
        batch_fee = %rollup.batch_fee(),
        events = events.len(),
        "Replay finished"
    );
    Ok(events)
}
