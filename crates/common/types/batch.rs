use bytes::Bytes;
use ethereum_types::{H256, U256};
use serde::{Deserialize, Serialize};

use crate::serde_utils;

use super::BatchNumber;

/// A batch submitted by the trusted sequencer.
///
/// `min_forced_timestamp` is zero for regular batches. A non-zero value marks the batch as
/// the inclusion of the next pending forced batch, and must equal the timestamp at which
/// that batch was forced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchData {
    #[serde(with = "serde_utils::bytes")]
    pub transactions: Bytes,
    pub global_exit_root: H256,
    pub timestamp: u64,
    #[serde(default)]
    pub min_forced_timestamp: u64,
}

impl BatchData {
    pub fn is_forced(&self) -> bool {
        self.min_forced_timestamp != 0
    }
}

/// A previously forced batch, resubmitted by anyone once its timeout has elapsed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForcedBatchData {
    #[serde(with = "serde_utils::bytes")]
    pub transactions: Bytes,
    pub global_exit_root: H256,
    pub min_forced_timestamp: u64,
}

/// Stored for the last batch of every sequencing call. Batch 0 holds the zero sentinel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencedBatchData {
    pub acc_input_hash: H256,
    pub sequenced_timestamp: u64,
    pub previous_last_batch_sequenced: BatchNumber,
}

impl SequencedBatchData {
    /// Number of batches appended by the call that produced this record.
    pub fn batches_in_sequence(&self, batch_number: BatchNumber) -> u64 {
        batch_number.saturating_sub(self.previous_last_batch_sequenced)
    }
}

/// Amount owed for `count` batches at the given per-batch fee.
pub fn fee_for_batches(batch_fee: U256, count: u64) -> U256 {
    batch_fee.saturating_mul(U256::from(count))
}
