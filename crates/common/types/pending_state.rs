use ethereum_types::H256;
use serde::{Deserialize, Serialize};

use super::BatchNumber;

/// A verification accepted through the permissionless path, waiting out the
/// pending state timeout before it becomes final.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingState {
    pub timestamp: u64,
    pub last_verified_batch: BatchNumber,
    pub exit_root: H256,
    pub state_root: H256,
}

impl PendingState {
    /// Whether the entry has waited `timeout` seconds at time `now`. A zero timeout
    /// makes every entry consolidable.
    pub fn is_consolidable(&self, now: u64, timeout: u64) -> bool {
        self.timestamp.saturating_add(timeout) <= now
    }
}
