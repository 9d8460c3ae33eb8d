//! The append-only log of sequenced batches and the forced batch queue feeding it.

use std::collections::BTreeMap;

use tracing::debug;
use zkrollup_common::{
    Address, H256,
    constants::{
        FORCE_BATCH_TIMEOUT, MAX_FORCE_BATCH_BYTE_LENGTH, MAX_TRANSACTIONS_BYTE_LENGTH,
        MAX_VERIFY_BATCHES,
    },
    hash_chain::{batch_hash_data, calculate_acc_input_hash, forced_batch_hash},
    types::{BatchData, BatchNumber, ForcedBatchData, ForcedBatchNumber, SequencedBatchData},
};

use crate::error::RollupError;

#[derive(Debug, Clone, Default)]
pub struct BatchLog {
    /// Keyed by the last batch number of each sequencing call. Batch 0 is the sentinel.
    sequenced_batches: BTreeMap<BatchNumber, SequencedBatchData>,
    /// Commitment hashes of forced batches.
    forced_batches: BTreeMap<ForcedBatchNumber, H256>,
    last_batch_sequenced: BatchNumber,
    last_force_batch: ForcedBatchNumber,
    last_force_batch_sequenced: ForcedBatchNumber,
    last_timestamp: u64,
}

/// Outcome of validating a sequencing call, applied only once fees are settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencePlan {
    pub acc_input_hash: H256,
    pub batches: u64,
    pub forced_batches: u64,
    pub last_timestamp: u64,
}

impl SequencePlan {
    /// Batches the sequencer pays for. Forced batches were paid at force time.
    pub fn non_forced_batches(&self) -> u64 {
        self.batches - self.forced_batches
    }
}

/// Which entry point is extending the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequencePath {
    /// The trusted sequencer, with caller-chosen timestamps.
    Trusted,
    /// Anyone promoting timed-out forced batches, stamped with the call time.
    Forced,
}

/// One batch as both entry points see it.
struct SequenceEntry<'a> {
    transactions: &'a [u8],
    global_exit_root: H256,
    timestamp: u64,
    min_forced_timestamp: u64,
}

fn check_sequence_len(len: usize) -> Result<(), RollupError> {
    if len == 0 {
        return Err(RollupError::EmptyBatch);
    }
    if len > MAX_VERIFY_BATCHES {
        return Err(RollupError::TooManyBatches(len));
    }
    Ok(())
}

impl BatchLog {
    pub fn new() -> Self {
        let mut sequenced_batches = BTreeMap::new();
        sequenced_batches.insert(0, SequencedBatchData::default());
        Self {
            sequenced_batches,
            ..Default::default()
        }
    }

    pub fn last_batch_sequenced(&self) -> BatchNumber {
        self.last_batch_sequenced
    }

    pub fn last_force_batch(&self) -> ForcedBatchNumber {
        self.last_force_batch
    }

    pub fn last_force_batch_sequenced(&self) -> ForcedBatchNumber {
        self.last_force_batch_sequenced
    }

    pub fn last_timestamp(&self) -> u64 {
        self.last_timestamp
    }

    /// Record stored for `batch_number`, present only for the last batch of a sequence.
    pub fn sequenced_batch(&self, batch_number: BatchNumber) -> Option<&SequencedBatchData> {
        self.sequenced_batches.get(&batch_number)
    }

    pub fn forced_batch(&self, forced_batch_number: ForcedBatchNumber) -> Option<H256> {
        self.forced_batches.get(&forced_batch_number).copied()
    }

    /// Accumulated input hash at `batch_number`, zero if it does not end a sequence.
    pub fn acc_input_hash(&self, batch_number: BatchNumber) -> H256 {
        self.sequenced_batch(batch_number)
            .map(|record| record.acc_input_hash)
            .unwrap_or_default()
    }

    /// Whether `batch_number` is the last batch of a recorded sequence.
    pub fn is_end_of_sequence(&self, batch_number: BatchNumber) -> bool {
        batch_number != 0 && !self.acc_input_hash(batch_number).is_zero()
    }

    /// Validates a trusted sequencing call and folds the batches on top of the chain.
    pub fn plan_sequence(
        &self,
        batches: &[BatchData],
        sequencer: Address,
        now: u64,
    ) -> Result<SequencePlan, RollupError> {
        let entries = batches.iter().map(|batch| SequenceEntry {
            transactions: &batch.transactions,
            global_exit_root: batch.global_exit_root,
            timestamp: batch.timestamp,
            min_forced_timestamp: batch.min_forced_timestamp,
        });
        self.plan(SequencePath::Trusted, entries, sequencer, now)
    }

    /// Validates the promotion of timed-out forced batches. Every batch is stamped with
    /// `now` and folded with the submitter as sequencer.
    pub fn plan_force_sequence(
        &self,
        batches: &[ForcedBatchData],
        submitter: Address,
        now: u64,
    ) -> Result<SequencePlan, RollupError> {
        let entries = batches.iter().map(|batch| SequenceEntry {
            transactions: &batch.transactions,
            global_exit_root: batch.global_exit_root,
            timestamp: now,
            min_forced_timestamp: batch.min_forced_timestamp,
        });
        self.plan(SequencePath::Forced, entries, submitter, now)
    }

    fn plan<'a>(
        &self,
        path: SequencePath,
        entries: impl ExactSizeIterator<Item = SequenceEntry<'a>>,
        sequencer: Address,
        now: u64,
    ) -> Result<SequencePlan, RollupError> {
        let batches = entries.len();
        check_sequence_len(batches)?;

        let mut acc_input_hash = self.acc_input_hash(self.last_batch_sequenced);
        let mut current_timestamp = self.last_timestamp;
        let mut forced_index = self.last_force_batch_sequenced;

        for entry in entries {
            let transactions_hash = batch_hash_data(entry.transactions);
            if path == SequencePath::Forced || entry.min_forced_timestamp != 0 {
                forced_index += 1;
                let commitment = forced_batch_hash(
                    transactions_hash,
                    entry.global_exit_root,
                    entry.min_forced_timestamp,
                );
                if self.forced_batch(forced_index) != Some(commitment) {
                    return Err(RollupError::ForcedBatchMismatch(forced_index));
                }
                match path {
                    SequencePath::Trusted if entry.timestamp < entry.min_forced_timestamp => {
                        return Err(RollupError::ForcedBatchMismatch(forced_index));
                    }
                    SequencePath::Forced
                        if entry.min_forced_timestamp.saturating_add(FORCE_BATCH_TIMEOUT)
                            > now =>
                    {
                        return Err(RollupError::ForceBatchTimeoutNotElapsed(forced_index));
                    }
                    _ => {}
                }
            } else if entry.transactions.len() >= MAX_TRANSACTIONS_BYTE_LENGTH {
                return Err(RollupError::TransactionsTooLarge {
                    length: entry.transactions.len(),
                    limit: MAX_TRANSACTIONS_BYTE_LENGTH,
                });
            }

            if path == SequencePath::Trusted
                && (entry.timestamp < current_timestamp || entry.timestamp > now)
            {
                return Err(RollupError::TimestampOutOfRange {
                    timestamp: entry.timestamp,
                    min: current_timestamp,
                    max: now,
                });
            }

            acc_input_hash = calculate_acc_input_hash(
                acc_input_hash,
                transactions_hash,
                entry.global_exit_root,
                entry.timestamp,
                sequencer,
            );
            current_timestamp = entry.timestamp;
        }

        Ok(SequencePlan {
            acc_input_hash,
            batches: batches as u64,
            forced_batches: forced_index - self.last_force_batch_sequenced,
            last_timestamp: current_timestamp,
        })
    }

    /// Appends the sequence described by `plan` and returns the new last batch number.
    pub fn apply_sequence(&mut self, plan: &SequencePlan, now: u64) -> BatchNumber {
        let previous_last_batch_sequenced = self.last_batch_sequenced;
        self.last_batch_sequenced += plan.batches;
        self.last_force_batch_sequenced += plan.forced_batches;
        self.last_timestamp = plan.last_timestamp;
        self.sequenced_batches.insert(
            self.last_batch_sequenced,
            SequencedBatchData {
                acc_input_hash: plan.acc_input_hash,
                sequenced_timestamp: now,
                previous_last_batch_sequenced,
            },
        );
        debug!(
            last_batch_sequenced = self.last_batch_sequenced,
            acc_input_hash = %plan.acc_input_hash,
            "Appended sequence"
        );
        self.last_batch_sequenced
    }

    /// Checks the size limit for a batch about to be forced.
    pub fn check_force_batch(&self, transactions: &[u8]) -> Result<(), RollupError> {
        if transactions.len() >= MAX_FORCE_BATCH_BYTE_LENGTH {
            return Err(RollupError::TransactionsTooLarge {
                length: transactions.len(),
                limit: MAX_FORCE_BATCH_BYTE_LENGTH,
            });
        }
        Ok(())
    }

    /// Stores the commitment of a newly forced batch and returns its number.
    pub fn push_forced_batch(
        &mut self,
        transactions: &[u8],
        global_exit_root: H256,
        now: u64,
    ) -> ForcedBatchNumber {
        self.last_force_batch += 1;
        self.forced_batches.insert(
            self.last_force_batch,
            forced_batch_hash(batch_hash_data(transactions), global_exit_root, now),
        );
        self.last_force_batch
    }
}
