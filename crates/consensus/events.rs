use serde::Serialize;
use zkrollup_common::{
    Address, Bytes, H256,
    serde_utils,
    types::{BatchNumber, ForcedBatchNumber, PendingStateNumber},
};

/// Notifications emitted by committed calls, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum RollupEvent {
    SequenceBatches {
        num_batch: BatchNumber,
    },
    ForceBatch {
        force_batch_num: ForcedBatchNumber,
        last_global_exit_root: H256,
        sequencer: Address,
        #[serde(with = "serde_utils::bytes")]
        transactions: Bytes,
    },
    SequenceForceBatches {
        num_batch: BatchNumber,
    },
    VerifyBatches {
        num_batch: BatchNumber,
        state_root: H256,
        aggregator: Address,
    },
    VerifyBatchesTrustedAggregator {
        num_batch: BatchNumber,
        state_root: H256,
        aggregator: Address,
    },
    ConsolidatePendingState {
        num_batch: BatchNumber,
        state_root: H256,
        pending_state_num: PendingStateNumber,
    },
    OverridePendingState {
        num_batch: BatchNumber,
        state_root: H256,
        aggregator: Address,
    },
    EmergencyStateActivated,
    SetTrustedSequencer {
        new_trusted_sequencer: Address,
    },
    #[serde(rename = "SetTrustedSequencerURL")]
    SetTrustedSequencerUrl {
        new_trusted_sequencer_url: String,
    },
    SetTrustedAggregator {
        new_trusted_aggregator: Address,
    },
    SetTrustedAggregatorTimeout {
        new_trusted_aggregator_timeout: u64,
    },
    SetPendingStateTimeout {
        new_pending_state_timeout: u64,
    },
    SetMultiplierBatchFee {
        new_multiplier_batch_fee: u16,
    },
    SetVerifyBatchTimeTarget {
        new_verify_batch_time_target: u64,
    },
    SetForceBatchAllowed {
        new_force_batch_allowed: bool,
    },
    SetAdmin {
        new_admin: Address,
    },
}
