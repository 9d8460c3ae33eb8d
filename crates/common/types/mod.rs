mod batch;
mod pending_state;
mod proof;

pub use batch::*;
pub use pending_state::*;
pub use proof::*;

pub type BatchNumber = u64;
pub type PendingStateNumber = u64;
pub type ForcedBatchNumber = u64;
