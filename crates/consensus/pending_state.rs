//! Verified but not yet final state transitions.

use std::collections::BTreeMap;

use zkrollup_common::types::{PendingState, PendingStateNumber};

#[derive(Debug, Clone, Default)]
pub struct PendingStateRing {
    transitions: BTreeMap<PendingStateNumber, PendingState>,
    last_pending_state: PendingStateNumber,
    last_pending_state_consolidated: PendingStateNumber,
}

impl PendingStateRing {
    pub fn last_pending_state(&self) -> PendingStateNumber {
        self.last_pending_state
    }

    pub fn last_pending_state_consolidated(&self) -> PendingStateNumber {
        self.last_pending_state_consolidated
    }

    /// Whether there are entries waiting to be consolidated.
    pub fn has_outstanding(&self) -> bool {
        self.last_pending_state > self.last_pending_state_consolidated
    }

    /// Entry `number`, if it belongs to the current ring.
    pub fn get(&self, number: PendingStateNumber) -> Option<&PendingState> {
        if number == 0 || number > self.last_pending_state {
            return None;
        }
        self.transitions.get(&number)
    }

    /// Most recent entry, consolidated or not.
    pub fn last(&self) -> Option<&PendingState> {
        self.get(self.last_pending_state)
    }

    pub fn insert(&mut self, transition: PendingState) -> PendingStateNumber {
        self.last_pending_state += 1;
        self.transitions.insert(self.last_pending_state, transition);
        self.last_pending_state
    }

    /// Marks every entry up to `number` as consolidated.
    pub(crate) fn mark_consolidated(&mut self, number: PendingStateNumber) {
        self.last_pending_state_consolidated = number;
    }

    /// Drops every entry. Used when a root is finalized outside the ring.
    pub fn clear(&mut self) {
        self.transitions.clear();
        self.last_pending_state = 0;
        self.last_pending_state_consolidated = 0;
    }

    /// An entry can be consolidated once it is unconsolidated and its timeout elapsed.
    pub fn is_consolidable(&self, number: PendingStateNumber, now: u64, timeout: u64) -> bool {
        number > self.last_pending_state_consolidated
            && self
                .get(number)
                .is_some_and(|transition| transition.is_consolidable(now, timeout))
    }

    /// Entry to consolidate up to on an opportunistic call.
    ///
    /// Probes the next unconsolidated entry and, if it is ready, the middle of the
    /// outstanding range, so a single call drains about half the backlog.
    pub fn next_auto_target(&self, now: u64, timeout: u64) -> Option<PendingStateNumber> {
        if !self.has_outstanding() {
            return None;
        }
        let next = self.last_pending_state_consolidated + 1;
        if !self.is_consolidable(next, now, timeout) {
            return None;
        }
        let middle = next + (self.last_pending_state - next) / 2;
        if self.is_consolidable(middle, now, timeout) {
            Some(middle)
        } else {
            Some(next)
        }
    }

    /// Entries in `(from, to]`, in order.
    pub fn range(
        &self,
        from: PendingStateNumber,
        to: PendingStateNumber,
    ) -> impl Iterator<Item = (&PendingStateNumber, &PendingState)> {
        self.transitions.range(from + 1..=to)
    }
}
