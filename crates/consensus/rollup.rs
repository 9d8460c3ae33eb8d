use tracing::info;
use zkrollup_common::{
    Address, Bytes, H256, U256,
    types::{
        BatchData, BatchNumber, ForcedBatchData, ForcedBatchNumber, PendingStateNumber,
        fee_for_batches,
    },
};

use crate::{
    collaborators::{FeeToken, GlobalExitRootManager, ProofVerifier},
    config::RollupConfig,
    error::{Role, RollupError},
    events::RollupEvent,
    state::{Consolidation, ProtocolState},
};

/// Caller and block time of a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub timestamp: u64,
}

impl CallContext {
    pub fn new(caller: Address, timestamp: u64) -> Self {
        Self { caller, timestamp }
    }
}

/// A rollup deployment: its protocol state plus the collaborators it settles with.
///
/// Calls are serialized by taking `&mut self`. A call either fully applies or returns an
/// error leaving state, balances and the event buffer untouched.
pub struct Rollup<T, B, V> {
    pub(crate) state: ProtocolState,
    pub(crate) token: T,
    pub(crate) bridge: B,
    pub(crate) verifier: V,
    /// Account holding sequencing fees and paying aggregator rewards.
    pub(crate) address: Address,
    pub(crate) events: Vec<RollupEvent>,
}

impl<T, B, V> Rollup<T, B, V>
where
    T: FeeToken,
    B: GlobalExitRootManager,
    V: ProofVerifier,
{
    pub fn new(config: &RollupConfig, address: Address, token: T, bridge: B, verifier: V) -> Self {
        info!(
            chain_id = config.chain_id,
            network = %config.network_name,
            rollup = ?address,
            "Initialized rollup"
        );
        Self {
            state: ProtocolState::genesis(config),
            token,
            bridge,
            verifier,
            address,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &ProtocolState {
        &self.state
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token(&self) -> &T {
        &self.token
    }

    pub fn token_mut(&mut self) -> &mut T {
        &mut self.token
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut B {
        &mut self.bridge
    }

    pub fn verifier_mut(&mut self) -> &mut V {
        &mut self.verifier
    }

    /// Takes every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<RollupEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: RollupEvent) {
        self.events.push(event);
    }

    /// Publishes a consolidation: exit root to the bridge, event to the host.
    pub(crate) fn publish_consolidation(&mut self, consolidation: Consolidation) {
        self.bridge.update_exit_root(consolidation.exit_root);
        self.emit(RollupEvent::ConsolidatePendingState {
            num_batch: consolidation.num_batch,
            state_root: consolidation.state_root,
            pending_state_num: consolidation.pending_state_num,
        });
    }

    pub(crate) fn try_auto_consolidate(&mut self, now: u64) {
        if let Some(consolidation) = self.state.try_auto_consolidate(now) {
            self.publish_consolidation(consolidation);
        }
    }

    /// Appends batches on behalf of the trusted sequencer, charging the batch fee for
    /// each batch that was not previously forced.
    pub fn sequence_batches(
        &mut self,
        ctx: CallContext,
        batches: &[BatchData],
    ) -> Result<BatchNumber, RollupError> {
        self.state.ensure_not_emergency()?;
        self.state.roles.ensure(Role::TrustedSequencer, ctx.caller)?;

        let plan = self
            .state
            .batches
            .plan_sequence(batches, ctx.caller, ctx.timestamp)?;
        let fee = fee_for_batches(
            self.state.fees.batch_fee(),
            plan.non_forced_batches(),
        );
        self.token.transfer_from(ctx.caller, self.address, fee)?;

        let last_batch_sequenced = self.state.batches.apply_sequence(&plan, ctx.timestamp);
        self.try_auto_consolidate(ctx.timestamp);

        info!(
            last_batch_sequenced,
            batches = plan.batches,
            forced_batches = plan.forced_batches,
            fee = %fee,
            "Sequenced batches"
        );
        self.emit(RollupEvent::SequenceBatches {
            num_batch: last_batch_sequenced,
        });
        Ok(last_batch_sequenced)
    }

    /// Queues a batch for inclusion outside the trusted sequencer's control.
    pub fn force_batch(
        &mut self,
        ctx: CallContext,
        transactions: Bytes,
        max_fee: U256,
    ) -> Result<ForcedBatchNumber, RollupError> {
        self.state.ensure_not_emergency()?;
        if !self.state.force_batch_allowed {
            return Err(RollupError::ForceBatchesNotAllowed);
        }
        let batch_fee = self.state.fees.batch_fee();
        if max_fee < batch_fee {
            return Err(RollupError::InsufficientFee { max_fee, batch_fee });
        }
        self.state.batches.check_force_batch(&transactions)?;

        self.token
            .transfer_from(ctx.caller, self.address, batch_fee)?;

        let global_exit_root = self.bridge.last_global_exit_root();
        let force_batch_num =
            self.state
                .batches
                .push_forced_batch(&transactions, global_exit_root, ctx.timestamp);

        info!(
            force_batch_num,
            sender = ?ctx.caller,
            fee = %batch_fee,
            "Forced batch"
        );
        self.emit(RollupEvent::ForceBatch {
            force_batch_num,
            last_global_exit_root: global_exit_root,
            sequencer: ctx.caller,
            transactions,
        });
        Ok(force_batch_num)
    }

    /// Sequences forced batches whose timeout elapsed. Anyone may call this.
    pub fn sequence_force_batches(
        &mut self,
        ctx: CallContext,
        batches: &[ForcedBatchData],
    ) -> Result<BatchNumber, RollupError> {
        self.state.ensure_not_emergency()?;
        if !self.state.force_batch_allowed {
            return Err(RollupError::ForceBatchesNotAllowed);
        }

        let plan = self
            .state
            .batches
            .plan_force_sequence(batches, ctx.caller, ctx.timestamp)?;
        let last_batch_sequenced = self.state.batches.apply_sequence(&plan, ctx.timestamp);

        info!(
            last_batch_sequenced,
            forced_batches = plan.forced_batches,
            submitter = ?ctx.caller,
            "Sequenced forced batches"
        );
        self.emit(RollupEvent::SequenceForceBatches {
            num_batch: last_batch_sequenced,
        });
        Ok(last_batch_sequenced)
    }

    pub fn batch_fee(&self) -> U256 {
        self.state.fees.batch_fee()
    }

    pub fn last_verified_batch(&self) -> BatchNumber {
        self.state.last_verified_batch
    }

    pub fn last_verified_batch_including_pending(&self) -> BatchNumber {
        self.state.last_verified_batch_including_pending()
    }

    pub fn is_emergency_state(&self) -> bool {
        self.state.is_emergency_state
    }

    pub fn is_pending_state_consolidable(&self, number: PendingStateNumber, now: u64) -> bool {
        self.state.is_pending_state_consolidable(number, now)
    }

    /// Public input a proof for `(init_num_batch, final_new_batch]` must be built for.
    ///
    /// Returns `None` when either end is unknown.
    pub fn next_snark_input(
        &self,
        aggregator: Address,
        pending_state_num: PendingStateNumber,
        init_num_batch: BatchNumber,
        final_new_batch: BatchNumber,
        new_local_exit_root: H256,
        new_state_root: H256,
    ) -> Option<U256> {
        let old_state_root = if pending_state_num != 0 {
            self.state.pending.get(pending_state_num)?.state_root
        } else {
            self.state.state_root(init_num_batch)?
        };
        if !self.state.batches.is_end_of_sequence(final_new_batch) {
            return None;
        }
        let input = self.snark_input(
            aggregator,
            old_state_root,
            init_num_batch,
            final_new_batch,
            new_local_exit_root,
            new_state_root,
        );
        Some(input.to_field_element())
    }
}
