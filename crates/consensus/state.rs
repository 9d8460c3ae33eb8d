use std::collections::BTreeMap;

use tracing::info;
use zkrollup_common::{
    Address, H256,
    types::{BatchNumber, PendingState, PendingStateNumber},
};

use crate::{
    batch_log::BatchLog, config::RollupConfig, error::RollupError, error::Role,
    fee_market::FeeMarket, pending_state::PendingStateRing,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roles {
    pub admin: Address,
    pub trusted_sequencer: Address,
    pub trusted_sequencer_url: String,
    pub trusted_aggregator: Address,
}

impl Roles {
    fn holder(&self, role: Role) -> Address {
        match role {
            Role::Admin => self.admin,
            Role::TrustedSequencer => self.trusted_sequencer,
            Role::TrustedAggregator => self.trusted_aggregator,
        }
    }

    pub fn ensure(&self, role: Role, caller: Address) -> Result<(), RollupError> {
        if self.holder(role) != caller {
            return Err(RollupError::Unauthorized { role, caller });
        }
        Ok(())
    }
}

/// A finalized root produced by consolidating pending states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consolidation {
    pub pending_state_num: PendingStateNumber,
    pub num_batch: BatchNumber,
    pub state_root: H256,
    pub exit_root: H256,
}

/// Every counter and mapping of a rollup deployment.
#[derive(Debug, Clone)]
pub struct ProtocolState {
    pub(crate) batches: BatchLog,
    pub(crate) pending: PendingStateRing,
    pub(crate) fees: FeeMarket,
    pub(crate) roles: Roles,
    /// Finalized state roots. Batch 0 holds the genesis root.
    pub(crate) batch_num_to_state_root: BTreeMap<BatchNumber, H256>,
    pub(crate) last_verified_batch: BatchNumber,
    pub(crate) trusted_aggregator_timeout: u64,
    pub(crate) pending_state_timeout: u64,
    pub(crate) force_batch_allowed: bool,
    pub(crate) chain_id: u64,
    pub(crate) is_emergency_state: bool,
}

impl ProtocolState {
    pub fn genesis(config: &RollupConfig) -> Self {
        let mut batch_num_to_state_root = BTreeMap::new();
        batch_num_to_state_root.insert(0, config.genesis_root);
        Self {
            batches: BatchLog::new(),
            pending: PendingStateRing::default(),
            fees: FeeMarket::default(),
            roles: Roles {
                admin: config.admin,
                trusted_sequencer: config.trusted_sequencer,
                trusted_sequencer_url: config.trusted_sequencer_url.clone(),
                trusted_aggregator: config.trusted_aggregator,
            },
            batch_num_to_state_root,
            last_verified_batch: 0,
            trusted_aggregator_timeout: config.trusted_aggregator_timeout,
            pending_state_timeout: config.pending_state_timeout,
            force_batch_allowed: config.force_batch_allowed,
            chain_id: config.chain_id,
            is_emergency_state: false,
        }
    }

    pub fn batches(&self) -> &BatchLog {
        &self.batches
    }

    pub fn pending(&self) -> &PendingStateRing {
        &self.pending
    }

    pub fn fees(&self) -> &FeeMarket {
        &self.fees
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn last_verified_batch(&self) -> BatchNumber {
        self.last_verified_batch
    }

    pub fn state_root(&self, batch_number: BatchNumber) -> Option<H256> {
        self.batch_num_to_state_root.get(&batch_number).copied()
    }

    pub fn trusted_aggregator_timeout(&self) -> u64 {
        self.trusted_aggregator_timeout
    }

    pub fn pending_state_timeout(&self) -> u64 {
        self.pending_state_timeout
    }

    pub fn force_batch_allowed(&self) -> bool {
        self.force_batch_allowed
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn is_emergency_state(&self) -> bool {
        self.is_emergency_state
    }

    pub(crate) fn ensure_not_emergency(&self) -> Result<(), RollupError> {
        if self.is_emergency_state {
            return Err(RollupError::EmergencyHalted);
        }
        Ok(())
    }

    /// Last verified batch, counting unconsolidated pending states.
    pub fn last_verified_batch_including_pending(&self) -> BatchNumber {
        if self.pending.has_outstanding() {
            self.pending
                .last()
                .map(|transition| transition.last_verified_batch)
                .unwrap_or(self.last_verified_batch)
        } else {
            self.last_verified_batch
        }
    }

    pub fn is_pending_state_consolidable(&self, number: PendingStateNumber, now: u64) -> bool {
        self.pending
            .is_consolidable(number, now, self.pending_state_timeout)
    }

    /// Finalizes `state_root` at `batch_number` outside the pending ring, superseding
    /// every unconsolidated entry.
    pub(crate) fn finalize(&mut self, batch_number: BatchNumber, state_root: H256) {
        self.last_verified_batch = batch_number;
        self.batch_num_to_state_root.insert(batch_number, state_root);
        self.pending.clear();
    }

    /// Consolidates every pending state up to and including `target`.
    pub(crate) fn consolidate_until(&mut self, target: PendingStateNumber) -> Option<Consolidation> {
        let from = self.pending.last_pending_state_consolidated();
        let finalized: Vec<(PendingStateNumber, PendingState)> = self
            .pending
            .range(from, target)
            .map(|(number, transition)| (*number, *transition))
            .collect();
        let (pending_state_num, last) = finalized.last().copied()?;

        for (_, transition) in &finalized {
            self.batch_num_to_state_root
                .insert(transition.last_verified_batch, transition.state_root);
        }
        self.last_verified_batch = last.last_verified_batch;
        self.pending.mark_consolidated(pending_state_num);

        info!(
            pending_state_num,
            num_batch = last.last_verified_batch,
            state_root = %last.state_root,
            "Consolidated pending state"
        );
        Some(Consolidation {
            pending_state_num,
            num_batch: last.last_verified_batch,
            state_root: last.state_root,
            exit_root: last.exit_root,
        })
    }

    /// Consolidates whatever the ring reports as ready. Called on every sequencing and
    /// permissionless verification.
    pub(crate) fn try_auto_consolidate(&mut self, now: u64) -> Option<Consolidation> {
        let target = self
            .pending
            .next_auto_target(now, self.pending_state_timeout)?;
        self.consolidate_until(target)
    }
}
