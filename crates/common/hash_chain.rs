//! Commitments binding batches to the rollup's ordered log.
//!
//! Two distinct encodings live here:
//! - the accumulated input hash (`acc_input_hash`), a Keccak-256 chain folded once per
//!   sequenced batch, and the forced batch commitment stored when a batch is forced;
//! - the circuit public input, a SHA-256 digest reduced into the BN254 scalar field that
//!   the proof verifier checks proofs against.
//!
//! Both use the tight (`abi.encodePacked`) layout: 32-byte hashes, 20-byte addresses and
//! 8-byte big endian integers.

use ethereum_types::{Address, H256, U256};
use keccak_hash::keccak;
use sha2::{Digest, Sha256};

use crate::{
    constants::RFIELD,
    types::{BatchData, BatchNumber},
};

/// Hash of a batch's transactions blob.
pub fn batch_hash_data(transactions: &[u8]) -> H256 {
    keccak(transactions)
}

/// Folds one batch into the running accumulator.
pub fn calculate_acc_input_hash(
    old_acc_input_hash: H256,
    batch_hash_data: H256,
    global_exit_root: H256,
    timestamp: u64,
    sequencer: Address,
) -> H256 {
    let mut buf = Vec::with_capacity(32 * 3 + 8 + 20);
    buf.extend_from_slice(old_acc_input_hash.as_bytes());
    buf.extend_from_slice(batch_hash_data.as_bytes());
    buf.extend_from_slice(global_exit_root.as_bytes());
    buf.extend_from_slice(&timestamp.to_be_bytes());
    buf.extend_from_slice(sequencer.as_bytes());
    keccak(buf)
}

/// Folds `batch` on top of `prev_acc_input_hash` as sequenced by `sequencer`.
pub fn fold(prev_acc_input_hash: H256, batch: &BatchData, sequencer: Address) -> H256 {
    calculate_acc_input_hash(
        prev_acc_input_hash,
        batch_hash_data(&batch.transactions),
        batch.global_exit_root,
        batch.timestamp,
        sequencer,
    )
}

/// Folds a list of batches in order, returning the hash after the last one.
pub fn fold_all<'a>(
    prev_acc_input_hash: H256,
    batches: impl IntoIterator<Item = &'a BatchData>,
    sequencer: Address,
) -> H256 {
    batches
        .into_iter()
        .fold(prev_acc_input_hash, |acc, batch| fold(acc, batch, sequencer))
}

/// Commitment stored when a batch is forced. Only this hash is kept; the batch is
/// matched later by recomputing it from the resubmitted data.
pub fn forced_batch_hash(
    batch_hash_data: H256,
    global_exit_root: H256,
    forced_timestamp: u64,
) -> H256 {
    let mut buf = Vec::with_capacity(32 * 2 + 8);
    buf.extend_from_slice(batch_hash_data.as_bytes());
    buf.extend_from_slice(global_exit_root.as_bytes());
    buf.extend_from_slice(&forced_timestamp.to_be_bytes());
    keccak(buf)
}

/// Public input of the batch verification circuit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnarkInput {
    pub aggregator: Address,
    pub old_state_root: H256,
    pub old_acc_input_hash: H256,
    pub init_num_batch: BatchNumber,
    pub chain_id: u64,
    pub new_state_root: H256,
    pub new_acc_input_hash: H256,
    pub new_local_exit_root: H256,
    pub final_new_batch: BatchNumber,
}

impl SnarkInput {
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(20 + 32 * 5 + 8 * 3);
        bytes.extend_from_slice(self.aggregator.as_bytes());
        bytes.extend_from_slice(self.old_state_root.as_bytes());
        bytes.extend_from_slice(self.old_acc_input_hash.as_bytes());
        bytes.extend_from_slice(&self.init_num_batch.to_be_bytes());
        bytes.extend_from_slice(&self.chain_id.to_be_bytes());
        bytes.extend_from_slice(self.new_state_root.as_bytes());
        bytes.extend_from_slice(self.new_acc_input_hash.as_bytes());
        bytes.extend_from_slice(self.new_local_exit_root.as_bytes());
        bytes.extend_from_slice(&self.final_new_batch.to_be_bytes());
        bytes
    }

    /// The value handed to the verifier: `sha256(encode()) mod r`.
    pub fn to_field_element(&self) -> U256 {
        let digest = Sha256::digest(self.encode());
        U256::from_big_endian(digest.as_slice()) % RFIELD
    }
}
