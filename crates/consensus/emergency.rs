use tracing::warn;
use zkrollup_common::{constants::HALT_AGGREGATION_TIMEOUT, types::BatchNumber};

use crate::{
    collaborators::{FeeToken, GlobalExitRootManager, ProofVerifier},
    error::{Role, RollupError},
    events::RollupEvent,
    rollup::{CallContext, Rollup},
};

impl<T, B, V> Rollup<T, B, V>
where
    T: FeeToken,
    B: GlobalExitRootManager,
    V: ProofVerifier,
{
    /// Halts the rollup when `sequenced_batch_num` ends a sequence that has gone
    /// unverified for longer than `HALT_AGGREGATION_TIMEOUT`. Anyone may call this.
    pub fn activate_emergency_state(
        &mut self,
        ctx: CallContext,
        sequenced_batch_num: BatchNumber,
    ) -> Result<(), RollupError> {
        self.state.ensure_not_emergency()?;

        let batches = &self.state.batches;
        let record = batches
            .sequenced_batch(sequenced_batch_num)
            .filter(|_| {
                sequenced_batch_num <= batches.last_batch_sequenced()
                    && batches.is_end_of_sequence(sequenced_batch_num)
            })
            .ok_or(RollupError::NotEndOfSequence(sequenced_batch_num))?;
        if sequenced_batch_num <= self.state.last_verified_batch {
            return Err(RollupError::AlreadyVerified(sequenced_batch_num));
        }
        if record
            .sequenced_timestamp
            .saturating_add(HALT_AGGREGATION_TIMEOUT)
            > ctx.timestamp
        {
            return Err(RollupError::HaltTimeoutNotElapsed(sequenced_batch_num));
        }

        warn!(
            sequenced_batch_num,
            caller = ?ctx.caller,
            "Aggregation halted, activating emergency state"
        );
        self.enter_emergency_state();
        Ok(())
    }

    /// Operator-triggered halt, with no further conditions.
    pub fn admin_activate_emergency_state(&mut self, ctx: CallContext) -> Result<(), RollupError> {
        self.state.ensure_not_emergency()?;
        self.state.roles.ensure(Role::Admin, ctx.caller)?;
        warn!(admin = ?ctx.caller, "Admin activated emergency state");
        self.enter_emergency_state();
        Ok(())
    }

    fn enter_emergency_state(&mut self) {
        self.state.is_emergency_state = true;
        self.emit(RollupEvent::EmergencyStateActivated);
    }
}
