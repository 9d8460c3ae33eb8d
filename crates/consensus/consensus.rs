pub mod admin;
pub mod batch_log;
pub mod collaborators;
pub mod config;
pub mod dev;
pub mod emergency;
pub mod error;
pub mod events;
pub mod fee_market;
pub mod pending_state;
pub mod rollup;
pub mod state;
pub mod verification;

pub use collaborators::{FeeToken, GlobalExitRootManager, ProofVerifier};
pub use config::RollupConfig;
pub use error::{ErrorKind, Role, RollupError, TokenError};
pub use events::RollupEvent;
pub use rollup::{CallContext, Rollup};
pub use state::ProtocolState;
pub use verification::{OverridePendingStateRequest, VerificationMode, VerifyBatchesRequest};
