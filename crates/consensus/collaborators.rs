//! Interfaces to the systems the rollup depends on but does not own.

use zkrollup_common::{Address, H256, U256, types::Proof};

use crate::error::TokenError;

/// Checks a proof against the circuit public input.
pub trait ProofVerifier {
    fn verify_proof(&self, public_input: U256, proof: &Proof) -> bool;
}

/// The bridge side of the rollup: source of global exit roots and sink of finalized
/// local exit roots.
pub trait GlobalExitRootManager {
    fn last_global_exit_root(&self) -> H256;
    fn update_exit_root(&mut self, new_local_exit_root: H256);
}

/// Fee token ledger. The rollup account is the spender in `transfer_from` and the
/// sender in `transfer`.
pub trait FeeToken {
    fn transfer_from(&mut self, from: Address, to: Address, amount: U256) -> Result<(), TokenError>;
    fn transfer(&mut self, to: Address, amount: U256) -> Result<(), TokenError>;
}
