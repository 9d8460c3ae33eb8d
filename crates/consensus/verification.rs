//! Proof submission: the trusted fast path, the permissionless slow path and the
//! trusted override of diverging pending states.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zkrollup_common::{
    Address, H256,
    hash_chain::SnarkInput,
    types::{BatchNumber, PendingState, PendingStateNumber, Proof, fee_for_batches},
};

use crate::{
    collaborators::{FeeToken, GlobalExitRootManager, ProofVerifier},
    error::{Role, RollupError},
    events::RollupEvent,
    rollup::{CallContext, Rollup},
};

/// Which entry point a verification came through. Both share every validation step and
/// differ in who may call and in how the proven root is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMode {
    /// Trusted aggregator only. Finalizes immediately.
    Trusted,
    /// Anyone, once the trusted aggregator had its window. Goes through the pending ring.
    Permissionless,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyBatchesRequest {
    #[serde(default)]
    pub pending_state_num: PendingStateNumber,
    pub init_num_batch: BatchNumber,
    pub final_new_batch: BatchNumber,
    pub new_local_exit_root: H256,
    pub new_state_root: H256,
    #[serde(default)]
    pub proof: Proof,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverridePendingStateRequest {
    #[serde(default)]
    pub init_pending_state_num: PendingStateNumber,
    pub final_pending_state_num: PendingStateNumber,
    pub init_num_batch: BatchNumber,
    pub final_new_batch: BatchNumber,
    pub new_local_exit_root: H256,
    pub new_state_root: H256,
    #[serde(default)]
    pub proof: Proof,
}

impl<T, B, V> Rollup<T, B, V>
where
    T: FeeToken,
    B: GlobalExitRootManager,
    V: ProofVerifier,
{
    /// Permissionless verification. The proven root enters the pending ring, or is
    /// finalized directly when the pending state timeout is zero.
    pub fn verify_batches(
        &mut self,
        ctx: CallContext,
        request: &VerifyBatchesRequest,
    ) -> Result<(), RollupError> {
        self.apply_verification(VerificationMode::Permissionless, ctx, request)
    }

    /// Trusted aggregator verification, finalized immediately.
    pub fn trusted_verify_batches(
        &mut self,
        ctx: CallContext,
        request: &VerifyBatchesRequest,
    ) -> Result<(), RollupError> {
        self.apply_verification(VerificationMode::Trusted, ctx, request)
    }

    fn apply_verification(
        &mut self,
        mode: VerificationMode,
        ctx: CallContext,
        request: &VerifyBatchesRequest,
    ) -> Result<(), RollupError> {
        self.state.ensure_not_emergency()?;
        match mode {
            VerificationMode::Trusted => {
                self.state.roles.ensure(Role::TrustedAggregator, ctx.caller)?
            }
            VerificationMode::Permissionless => {
                let sequenced_timestamp = self
                    .state
                    .batches
                    .sequenced_batch(request.final_new_batch)
                    .map(|record| record.sequenced_timestamp)
                    .unwrap_or_default();
                if sequenced_timestamp.saturating_add(self.state.trusted_aggregator_timeout)
                    > ctx.timestamp
                {
                    return Err(RollupError::AggregatorTimeoutNotElapsed(
                        request.final_new_batch,
                    ));
                }
            }
        }

        let checkpoint = self.state.last_verified_batch_including_pending();
        let old_state_root = self.check_transition(
            request.pending_state_num,
            request.init_num_batch,
            request.final_new_batch,
            checkpoint,
        )?;
        self.check_proof(
            ctx.caller,
            old_state_root,
            request.init_num_batch,
            request.final_new_batch,
            request.new_local_exit_root,
            request.new_state_root,
            &request.proof,
        )?;

        let reward = fee_for_batches(
            self.state.fees.batch_fee(),
            request.final_new_batch - request.init_num_batch,
        );
        let new_batch_fee = self.state.fees.next_batch_fee(
            &self.state.batches,
            checkpoint,
            request.final_new_batch,
            ctx.timestamp,
        );
        self.token.transfer(ctx.caller, reward)?;
        self.state.fees.set_batch_fee(new_batch_fee);

        match mode {
            VerificationMode::Trusted => {
                self.state
                    .finalize(request.final_new_batch, request.new_state_root);
                self.bridge.update_exit_root(request.new_local_exit_root);
                info!(
                    num_batch = request.final_new_batch,
                    state_root = %request.new_state_root,
                    aggregator = ?ctx.caller,
                    "Verified batches through trusted aggregator"
                );
                self.emit(RollupEvent::VerifyBatchesTrustedAggregator {
                    num_batch: request.final_new_batch,
                    state_root: request.new_state_root,
                    aggregator: ctx.caller,
                });
            }
            VerificationMode::Permissionless => {
                if self.state.pending_state_timeout == 0 {
                    self.state
                        .finalize(request.final_new_batch, request.new_state_root);
                    self.bridge.update_exit_root(request.new_local_exit_root);
                } else {
                    self.try_auto_consolidate(ctx.timestamp);
                    let pending_state_num = self.state.pending.insert(PendingState {
                        timestamp: ctx.timestamp,
                        last_verified_batch: request.final_new_batch,
                        exit_root: request.new_local_exit_root,
                        state_root: request.new_state_root,
                    });
                    debug!(pending_state_num, "Inserted pending state");
                }
                info!(
                    num_batch = request.final_new_batch,
                    state_root = %request.new_state_root,
                    aggregator = ?ctx.caller,
                    "Verified batches"
                );
                self.emit(RollupEvent::VerifyBatches {
                    num_batch: request.final_new_batch,
                    state_root: request.new_state_root,
                    aggregator: ctx.caller,
                });
            }
        }
        Ok(())
    }

    /// Replaces an unconsolidated pending root with a different, freshly proven one.
    pub fn override_pending_state(
        &mut self,
        ctx: CallContext,
        request: &OverridePendingStateRequest,
    ) -> Result<(), RollupError> {
        self.state.ensure_not_emergency()?;
        self.state.roles.ensure(Role::TrustedAggregator, ctx.caller)?;

        let old_state_root = self.check_transition(
            request.init_pending_state_num,
            request.init_num_batch,
            request.final_new_batch,
            self.state.last_verified_batch,
        )?;

        let final_pending = request.final_pending_state_num;
        if final_pending <= request.init_pending_state_num
            || final_pending <= self.state.pending.last_pending_state_consolidated()
        {
            return Err(RollupError::InvalidFinalPendingState(final_pending));
        }
        let stored = self
            .state
            .pending
            .get(final_pending)
            .ok_or(RollupError::InvalidFinalPendingState(final_pending))?;
        if stored.last_verified_batch != request.final_new_batch {
            return Err(RollupError::InvalidFinalPendingState(final_pending));
        }
        if stored.state_root == request.new_state_root {
            return Err(RollupError::NoDivergence(final_pending));
        }

        self.check_proof(
            ctx.caller,
            old_state_root,
            request.init_num_batch,
            request.final_new_batch,
            request.new_local_exit_root,
            request.new_state_root,
            &request.proof,
        )?;

        self.state
            .finalize(request.final_new_batch, request.new_state_root);
        self.bridge.update_exit_root(request.new_local_exit_root);
        info!(
            num_batch = request.final_new_batch,
            state_root = %request.new_state_root,
            overridden_pending_state = final_pending,
            "Overrode pending state"
        );
        self.emit(RollupEvent::OverridePendingState {
            num_batch: request.final_new_batch,
            state_root: request.new_state_root,
            aggregator: ctx.caller,
        });
        Ok(())
    }

    /// Consolidates every pending state up to `pending_state_num` once its timeout
    /// elapsed. Anyone may call this.
    pub fn consolidate_pending_state(
        &mut self,
        ctx: CallContext,
        pending_state_num: PendingStateNumber,
    ) -> Result<(), RollupError> {
        self.state.ensure_not_emergency()?;
        let pending = &self.state.pending;
        if pending_state_num == 0
            || pending_state_num > pending.last_pending_state()
            || pending_state_num <= pending.last_pending_state_consolidated()
        {
            return Err(RollupError::InvalidPendingStateRef(pending_state_num));
        }
        if !self
            .state
            .is_pending_state_consolidable(pending_state_num, ctx.timestamp)
        {
            return Err(RollupError::NotReadyToConsolidate(pending_state_num));
        }
        let consolidation = self
            .state
            .consolidate_until(pending_state_num)
            .ok_or(RollupError::InvalidPendingStateRef(pending_state_num))?;
        self.publish_consolidation(consolidation);
        Ok(())
    }

    /// Ordering and reference checks shared by every verification entry point.
    /// Returns the state root the proof starts from.
    fn check_transition(
        &self,
        pending_state_num: PendingStateNumber,
        init_num_batch: BatchNumber,
        final_new_batch: BatchNumber,
        last_verified: BatchNumber,
    ) -> Result<H256, RollupError> {
        if final_new_batch <= last_verified {
            return Err(RollupError::NotForwardProgress {
                final_batch: final_new_batch,
                last_verified,
            });
        }

        let old_state_root = if pending_state_num != 0 {
            let transition = self
                .state
                .pending
                .get(pending_state_num)
                .ok_or(RollupError::InvalidPendingStateRef(pending_state_num))?;
            if init_num_batch != transition.last_verified_batch {
                return Err(RollupError::InitBatchMismatch {
                    init_batch: init_num_batch,
                    expected: transition.last_verified_batch,
                });
            }
            Some(transition.state_root)
        } else {
            if init_num_batch != self.state.last_verified_batch {
                return Err(RollupError::InitBatchMismatch {
                    init_batch: init_num_batch,
                    expected: self.state.last_verified_batch,
                });
            }
            self.state.state_root(init_num_batch)
        };
        let old_state_root = old_state_root
            .filter(|root| !root.is_zero())
            .ok_or(RollupError::MissingInitRoot(init_num_batch))?;

        if !self.state.batches.is_end_of_sequence(final_new_batch) {
            return Err(RollupError::UnknownFinalBatch(final_new_batch));
        }
        Ok(old_state_root)
    }

    #[allow(clippy::too_many_arguments)]
    fn check_proof(
        &self,
        aggregator: Address,
        old_state_root: H256,
        init_num_batch: BatchNumber,
        final_new_batch: BatchNumber,
        new_local_exit_root: H256,
        new_state_root: H256,
        proof: &Proof,
    ) -> Result<(), RollupError> {
        let public_input = self
            .snark_input(
                aggregator,
                old_state_root,
                init_num_batch,
                final_new_batch,
                new_local_exit_root,
                new_state_root,
            )
            .to_field_element();
        debug!(%public_input, init_num_batch, final_new_batch, "Checking proof");
        if !self.verifier.verify_proof(public_input, proof) {
            return Err(RollupError::ProofRejected);
        }
        Ok(())
    }

    pub(crate) fn snark_input(
        &self,
        aggregator: Address,
        old_state_root: H256,
        init_num_batch: BatchNumber,
        final_new_batch: BatchNumber,
        new_local_exit_root: H256,
        new_state_root: H256,
    ) -> SnarkInput {
        SnarkInput {
            aggregator,
            old_state_root,
            old_acc_input_hash: self.state.batches.acc_input_hash(init_num_batch),
            init_num_batch,
            chain_id: self.state.chain_id,
            new_state_root,
            new_acc_input_hash: self.state.batches.acc_input_hash(final_new_batch),
            new_local_exit_root,
            final_new_batch,
        }
    }
}
