//! Per-batch fee controller.
//!
//! After every verification the fee moves towards the value at which batches get
//! verified within `verify_batch_time_target` seconds of being sequenced: it grows by
//! `multiplier / 1000` for every batch that was verified late and shrinks by the same
//! factor for every batch verified on time, at most `MAX_BATCH_MULTIPLIER` steps per
//! update.

use tracing::debug;
use zkrollup_common::{
    U256,
    constants::{
        DEFAULT_MULTIPLIER_BATCH_FEE, DEFAULT_VERIFY_BATCH_TIME_TARGET, INITIAL_BATCH_FEE,
        MAX_BATCH_FEE, MAX_BATCH_MULTIPLIER, MAX_MULTIPLIER_BATCH_FEE, MIN_BATCH_FEE, ONE_ETHER,
    },
    types::BatchNumber,
};

use crate::{batch_log::BatchLog, error::RollupError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeMarket {
    batch_fee: U256,
    multiplier_batch_fee: u16,
    verify_batch_time_target: u64,
}

impl Default for FeeMarket {
    fn default() -> Self {
        Self {
            batch_fee: INITIAL_BATCH_FEE,
            multiplier_batch_fee: DEFAULT_MULTIPLIER_BATCH_FEE,
            verify_batch_time_target: DEFAULT_VERIFY_BATCH_TIME_TARGET,
        }
    }
}

impl FeeMarket {
    pub fn batch_fee(&self) -> U256 {
        self.batch_fee
    }

    pub fn multiplier_batch_fee(&self) -> u16 {
        self.multiplier_batch_fee
    }

    pub fn verify_batch_time_target(&self) -> u64 {
        self.verify_batch_time_target
    }

    pub fn set_batch_fee(&mut self, batch_fee: U256) {
        self.batch_fee = batch_fee;
    }

    pub fn set_multiplier_batch_fee(&mut self, multiplier: u16) -> Result<(), RollupError> {
        if multiplier > MAX_MULTIPLIER_BATCH_FEE {
            return Err(RollupError::MultiplierOutOfRange(multiplier));
        }
        self.multiplier_batch_fee = multiplier;
        Ok(())
    }

    pub fn set_verify_batch_time_target(&mut self, target: u64) {
        self.verify_batch_time_target = target;
    }

    /// Fee that results from verifying `(checkpoint, new_last_verified]` at `now`.
    ///
    /// Sequences are walked backwards from `new_last_verified` through
    /// `previous_last_batch_sequenced`; both ends must be sequence boundaries.
    pub fn next_batch_fee(
        &self,
        log: &BatchLog,
        checkpoint: BatchNumber,
        new_last_verified: BatchNumber,
        now: u64,
    ) -> U256 {
        let new_batches = new_last_verified.saturating_sub(checkpoint);

        let mut above_target = 0u64;
        let mut current = new_last_verified;
        while current > checkpoint {
            let Some(record) = log.sequenced_batch(current) else {
                break;
            };
            if now.saturating_sub(record.sequenced_timestamp) > self.verify_batch_time_target {
                above_target += record.batches_in_sequence(current);
            }
            current = record.previous_last_batch_sequenced;
        }
        let above_target = above_target.min(new_batches);
        let below_target = new_batches - above_target;

        let steps = above_target.abs_diff(below_target).min(MAX_BATCH_MULTIPLIER);
        let multiplier = U256::from(self.multiplier_batch_fee).pow(U256::from(steps));
        let scale = U256::from(1000).pow(U256::from(steps));

        let new_fee = if above_target > below_target {
            self.batch_fee.saturating_mul(multiplier) / scale
        } else if below_target > above_target {
            let acc_divisor = ONE_ETHER.saturating_mul(multiplier) / scale;
            if acc_divisor.is_zero() {
                MAX_BATCH_FEE
            } else {
                ONE_ETHER.saturating_mul(self.batch_fee) / acc_divisor
            }
        } else {
            self.batch_fee
        };
        let new_fee = new_fee.clamp(MIN_BATCH_FEE, MAX_BATCH_FEE);

        debug!(
            above_target,
            below_target,
            old_fee = %self.batch_fee,
            new_fee = %new_fee,
            "Computed batch fee"
        );
        new_fee
    }
}
