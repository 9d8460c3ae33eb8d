//! Role-gated setters. They stay callable in the emergency state.

use tracing::info;
use zkrollup_common::{Address, constants::HALT_AGGREGATION_TIMEOUT};

use crate::{
    collaborators::{FeeToken, GlobalExitRootManager, ProofVerifier},
    error::{Role, RollupError},
    events::RollupEvent,
    rollup::{CallContext, Rollup},
};

/// A timeout may only move down, and never above the halt timeout.
fn check_lowered_timeout(new: u64, current: u64) -> Result<(), RollupError> {
    if new > HALT_AGGREGATION_TIMEOUT {
        return Err(RollupError::TimeoutTooLarge(new));
    }
    if new >= current {
        return Err(RollupError::TimeoutNotLowered { new, current });
    }
    Ok(())
}

impl<T, B, V> Rollup<T, B, V>
where
    T: FeeToken,
    B: GlobalExitRootManager,
    V: ProofVerifier,
{
    fn only_admin(&self, ctx: &CallContext) -> Result<(), RollupError> {
        self.state.roles.ensure(Role::Admin, ctx.caller)
    }

    pub fn set_trusted_sequencer(
        &mut self,
        ctx: CallContext,
        new_trusted_sequencer: Address,
    ) -> Result<(), RollupError> {
        self.only_admin(&ctx)?;
        self.state.roles.trusted_sequencer = new_trusted_sequencer;
        info!(?new_trusted_sequencer, "Set trusted sequencer");
        self.emit(RollupEvent::SetTrustedSequencer {
            new_trusted_sequencer,
        });
        Ok(())
    }

    pub fn set_trusted_sequencer_url(
        &mut self,
        ctx: CallContext,
        new_trusted_sequencer_url: String,
    ) -> Result<(), RollupError> {
        self.only_admin(&ctx)?;
        self.state.roles.trusted_sequencer_url = new_trusted_sequencer_url.clone();
        info!(%new_trusted_sequencer_url, "Set trusted sequencer URL");
        self.emit(RollupEvent::SetTrustedSequencerUrl {
            new_trusted_sequencer_url,
        });
        Ok(())
    }

    pub fn set_trusted_aggregator(
        &mut self,
        ctx: CallContext,
        new_trusted_aggregator: Address,
    ) -> Result<(), RollupError> {
        self.only_admin(&ctx)?;
        self.state.roles.trusted_aggregator = new_trusted_aggregator;
        info!(?new_trusted_aggregator, "Set trusted aggregator");
        self.emit(RollupEvent::SetTrustedAggregator {
            new_trusted_aggregator,
        });
        Ok(())
    }

    pub fn set_trusted_aggregator_timeout(
        &mut self,
        ctx: CallContext,
        new_trusted_aggregator_timeout: u64,
    ) -> Result<(), RollupError> {
        self.only_admin(&ctx)?;
        check_lowered_timeout(
            new_trusted_aggregator_timeout,
            self.state.trusted_aggregator_timeout,
        )?;
        self.state.trusted_aggregator_timeout = new_trusted_aggregator_timeout;
        info!(new_trusted_aggregator_timeout, "Set trusted aggregator timeout");
        self.emit(RollupEvent::SetTrustedAggregatorTimeout {
            new_trusted_aggregator_timeout,
        });
        Ok(())
    }

    pub fn set_pending_state_timeout(
        &mut self,
        ctx: CallContext,
        new_pending_state_timeout: u64,
    ) -> Result<(), RollupError> {
        self.only_admin(&ctx)?;
        check_lowered_timeout(new_pending_state_timeout, self.state.pending_state_timeout)?;
        self.state.pending_state_timeout = new_pending_state_timeout;
        info!(new_pending_state_timeout, "Set pending state timeout");
        self.emit(RollupEvent::SetPendingStateTimeout {
            new_pending_state_timeout,
        });
        Ok(())
    }

    pub fn set_multiplier_batch_fee(
        &mut self,
        ctx: CallContext,
        new_multiplier_batch_fee: u16,
    ) -> Result<(), RollupError> {
        self.only_admin(&ctx)?;
        self.state
            .fees
            .set_multiplier_batch_fee(new_multiplier_batch_fee)?;
        info!(new_multiplier_batch_fee, "Set multiplier batch fee");
        self.emit(RollupEvent::SetMultiplierBatchFee {
            new_multiplier_batch_fee,
        });
        Ok(())
    }

    pub fn set_verify_batch_time_target(
        &mut self,
        ctx: CallContext,
        new_verify_batch_time_target: u64,
    ) -> Result<(), RollupError> {
        self.only_admin(&ctx)?;
        self.state
            .fees
            .set_verify_batch_time_target(new_verify_batch_time_target);
        info!(new_verify_batch_time_target, "Set verify batch time target");
        self.emit(RollupEvent::SetVerifyBatchTimeTarget {
            new_verify_batch_time_target,
        });
        Ok(())
    }

    pub fn set_force_batch_allowed(
        &mut self,
        ctx: CallContext,
        new_force_batch_allowed: bool,
    ) -> Result<(), RollupError> {
        self.only_admin(&ctx)?;
        self.state.force_batch_allowed = new_force_batch_allowed;
        info!(new_force_batch_allowed, "Set force batch allowed");
        self.emit(RollupEvent::SetForceBatchAllowed {
            new_force_batch_allowed,
        });
        Ok(())
    }

    pub fn set_admin(&mut self, ctx: CallContext, new_admin: Address) -> Result<(), RollupError> {
        self.only_admin(&ctx)?;
        self.state.roles.admin = new_admin;
        info!(?new_admin, "Set admin");
        self.emit(RollupEvent::SetAdmin { new_admin });
        Ok(())
    }
}
