use std::fmt;

use zkrollup_common::{Address, U256, types::BatchNumber};

/// Roles allowed to call the gated entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    TrustedSequencer,
    TrustedAggregator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::TrustedSequencer => write!(f, "trusted sequencer"),
            Role::TrustedAggregator => write!(f, "trusted aggregator"),
        }
    }
}

/// Coarse classification of a rejected call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authorization,
    SequenceOrdering,
    Reference,
    ProofRejected,
    Policy,
    EmergencyHalted,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Insufficient allowance: allowed {allowed}, required {required}")]
    InsufficientAllowance { allowed: U256, required: U256 },
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: U256, required: U256 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RollupError {
    #[error("Caller {caller:#x} is not the {role}")]
    Unauthorized { role: Role, caller: Address },
    #[error("The rollup is in emergency state")]
    EmergencyHalted,
    #[error("Force batches are not allowed")]
    ForceBatchesNotAllowed,
    #[error("At least one batch must be sequenced")]
    EmptyBatch,
    #[error("Cannot sequence {0} batches in a single call")]
    TooManyBatches(usize),
    #[error("Transactions blob of {length} bytes exceeds the limit of {limit}")]
    TransactionsTooLarge { length: usize, limit: usize },
    #[error("Batch does not match forced batch {0}")]
    ForcedBatchMismatch(u64),
    #[error("Timestamp {timestamp} outside of [{min}, {max}]")]
    TimestampOutOfRange { timestamp: u64, min: u64, max: u64 },
    #[error("Max fee {max_fee} is below the batch fee {batch_fee}")]
    InsufficientFee { max_fee: U256, batch_fee: U256 },
    #[error("Forced batch {0} cannot be sequenced yet")]
    ForceBatchTimeoutNotElapsed(u64),
    #[error("Final batch {final_batch} must be above the last verified batch {last_verified}")]
    NotForwardProgress {
        final_batch: BatchNumber,
        last_verified: BatchNumber,
    },
    #[error("Invalid pending state reference {0}")]
    InvalidPendingStateRef(u64),
    #[error("Init batch {init_batch} does not match expected batch {expected}")]
    InitBatchMismatch {
        init_batch: BatchNumber,
        expected: BatchNumber,
    },
    #[error("No state root for init batch {0}")]
    MissingInitRoot(BatchNumber),
    #[error("Final batch {0} is not the end of a sequence")]
    UnknownFinalBatch(BatchNumber),
    #[error("Proof rejected by the verifier")]
    ProofRejected,
    #[error("Trusted aggregator timeout has not elapsed for batch {0}")]
    AggregatorTimeoutNotElapsed(BatchNumber),
    #[error("Pending state {0} is not ready to be consolidated")]
    NotReadyToConsolidate(u64),
    #[error("Invalid final pending state {0}")]
    InvalidFinalPendingState(u64),
    #[error("Stored root for pending state {0} already matches the proven root")]
    NoDivergence(u64),
    #[error("Batch {0} is not the end of a sequence")]
    NotEndOfSequence(BatchNumber),
    #[error("Batch {0} is already verified")]
    AlreadyVerified(BatchNumber),
    #[error("Halt aggregation timeout has not elapsed for batch {0}")]
    HaltTimeoutNotElapsed(BatchNumber),
    #[error("New timeout {new} must be lower than the current {current}")]
    TimeoutNotLowered { new: u64, current: u64 },
    #[error("Timeout {0} exceeds the halt aggregation timeout")]
    TimeoutTooLarge(u64),
    #[error("Multiplier batch fee {0} out of range")]
    MultiplierOutOfRange(u16),
    #[error("Token transfer failed: {0}")]
    Token(#[from] TokenError),
}

impl RollupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RollupError::Unauthorized { .. } => ErrorKind::Authorization,
            RollupError::EmergencyHalted => ErrorKind::EmergencyHalted,
            RollupError::EmptyBatch
            | RollupError::TooManyBatches(_)
            | RollupError::ForcedBatchMismatch(_)
            | RollupError::TimestampOutOfRange { .. }
            | RollupError::NotForwardProgress { .. }
            | RollupError::InitBatchMismatch { .. } => ErrorKind::SequenceOrdering,
            RollupError::InvalidPendingStateRef(_)
            | RollupError::MissingInitRoot(_)
            | RollupError::UnknownFinalBatch(_)
            | RollupError::InvalidFinalPendingState(_)
            | RollupError::NotEndOfSequence(_)
            | RollupError::AlreadyVerified(_) => ErrorKind::Reference,
            RollupError::ProofRejected => ErrorKind::ProofRejected,
            RollupError::ForceBatchesNotAllowed
            | RollupError::TransactionsTooLarge { .. }
            | RollupError::InsufficientFee { .. }
            | RollupError::ForceBatchTimeoutNotElapsed(_)
            | RollupError::AggregatorTimeoutNotElapsed(_)
            | RollupError::NotReadyToConsolidate(_)
            | RollupError::NoDivergence(_)
            | RollupError::HaltTimeoutNotElapsed(_)
            | RollupError::TimeoutNotLowered { .. }
            | RollupError::TimeoutTooLarge(_)
            | RollupError::MultiplierOutOfRange(_)
            | RollupError::Token(_) => ErrorKind::Policy,
        }
    }

    /// Whether the same call may succeed later once the clock has advanced.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RollupError::HaltTimeoutNotElapsed(_)
                | RollupError::NotReadyToConsolidate(_)
                | RollupError::AggregatorTimeoutNotElapsed(_)
        )
    }

    pub fn to_label(&self) -> &str {
        match self {
            RollupError::Unauthorized { .. } => "unauthorized",
            RollupError::EmergencyHalted => "emergency_halted",
            RollupError::ForceBatchesNotAllowed => "force_batches_not_allowed",
            RollupError::EmptyBatch => "empty_batch",
            RollupError::TooManyBatches(_) => "too_many_batches",
            RollupError::TransactionsTooLarge { .. } => "transactions_too_large",
            RollupError::ForcedBatchMismatch(_) => "forced_batch_mismatch",
            RollupError::TimestampOutOfRange { .. } => "timestamp_out_of_range",
            RollupError::InsufficientFee { .. } => "insufficient_fee",
            RollupError::ForceBatchTimeoutNotElapsed(_) => "force_batch_timeout_not_elapsed",
            RollupError::NotForwardProgress { .. } => "not_forward_progress",
            RollupError::InvalidPendingStateRef(_) => "invalid_pending_state_ref",
            RollupError::InitBatchMismatch { .. } => "init_batch_mismatch",
            RollupError::MissingInitRoot(_) => "missing_init_root",
            RollupError::UnknownFinalBatch(_) => "unknown_final_batch",
            RollupError::ProofRejected => "proof_rejected",
            RollupError::AggregatorTimeoutNotElapsed(_) => "aggregator_timeout_not_elapsed",
            RollupError::NotReadyToConsolidate(_) => "not_ready_to_consolidate",
            RollupError::InvalidFinalPendingState(_) => "invalid_final_pending_state",
            RollupError::NoDivergence(_) => "no_divergence",
            RollupError::NotEndOfSequence(_) => "not_end_of_sequence",
            RollupError::AlreadyVerified(_) => "already_verified",
            RollupError::HaltTimeoutNotElapsed(_) => "halt_timeout_not_elapsed",
            RollupError::TimeoutNotLowered { .. } => "timeout_not_lowered",
            RollupError::TimeoutTooLarge(_) => "timeout_too_large",
            RollupError::MultiplierOutOfRange(_) => "multiplier_out_of_range",
            RollupError::Token(_) => "token_error",
        }
    }
}
