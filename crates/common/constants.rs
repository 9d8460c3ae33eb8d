use ethereum_types::U256;

// === Sequencing ===

/// Time a forced batch must wait before anyone can sequence it.
pub const FORCE_BATCH_TIMEOUT: u64 = 5 * 24 * 60 * 60;

/// Time without verification after which the emergency state can be activated.
/// Also the upper bound for every configurable timeout.
pub const HALT_AGGREGATION_TIMEOUT: u64 = 7 * 24 * 60 * 60;

/// Maximum number of batches accepted by a single sequencing call.
pub const MAX_VERIFY_BATCHES: usize = 1000;

/// Maximum transactions blob size for batches sequenced by the trusted sequencer.
pub const MAX_TRANSACTIONS_BYTE_LENGTH: usize = 120_000;

/// Maximum transactions blob size for forced batches.
pub const MAX_FORCE_BATCH_BYTE_LENGTH: usize = 5_000;

// === Fee market ===

/// Maximum exponent applied to the fee multiplier in a single update.
pub const MAX_BATCH_MULTIPLIER: u64 = 12;

/// Upper bound for `multiplier_batch_fee`, in thousandths.
pub const MAX_MULTIPLIER_BATCH_FEE: u16 = 1023;

pub const DEFAULT_MULTIPLIER_BATCH_FEE: u16 = 1002;

pub const DEFAULT_VERIFY_BATCH_TIME_TARGET: u64 = 30 * 60;

/// 10^18
pub const ONE_ETHER: U256 = U256([0x0de0_b6b3_a764_0000, 0, 0, 0]);

/// 10^9
pub const ONE_GWEI: U256 = U256([0x3b9a_ca00, 0, 0, 0]);

pub const INITIAL_BATCH_FEE: U256 = ONE_ETHER;

/// 1000 * 10^18
pub const MAX_BATCH_FEE: U256 = U256([0x35c9_adc5_dea0_0000, 0x36, 0, 0]);

pub const MIN_BATCH_FEE: U256 = ONE_GWEI;

// === Circuit ===

/// Order of the BN254 scalar field. Public inputs are reduced modulo this value.
pub const RFIELD: U256 = U256([
    0x43e1_f593_f000_0001,
    0x2833_e848_79b9_7091,
    0xb850_45b6_8181_585d,
    0x3064_4e72_e131_a029,
]);
