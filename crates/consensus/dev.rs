//! In-memory collaborators for tests and local replays.

use std::collections::HashMap;

use zkrollup_common::{Address, H256, U256, types::Proof};

use crate::{
    collaborators::{FeeToken, GlobalExitRootManager, ProofVerifier},
    config::RollupConfig,
    error::TokenError,
    rollup::Rollup,
};

pub type DevRollup = Rollup<TokenLedger, ExitRootManager, MockVerifier>;

/// Builds a rollup at `address` backed by in-memory collaborators.
pub fn dev_rollup(config: &RollupConfig, address: Address, verifier: MockVerifier) -> DevRollup {
    Rollup::new(
        config,
        address,
        TokenLedger::new(address),
        ExitRootManager::default(),
        verifier,
    )
}

/// Fee token balances and allowances. `spender` is the rollup account.
#[derive(Debug, Clone, Default)]
pub struct TokenLedger {
    spender: Address,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
}

impl TokenLedger {
    pub fn new(spender: Address) -> Self {
        Self {
            spender,
            ..Default::default()
        }
    }

    pub fn mint(&mut self, to: Address, amount: U256) {
        let balance = self.balances.entry(to).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Lets the rollup account pull up to `amount` from `owner`.
    pub fn approve(&mut self, owner: Address, amount: U256) {
        self.allowances.insert((owner, self.spender), amount);
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    pub fn allowance(&self, owner: Address) -> U256 {
        self.allowances
            .get(&(owner, self.spender))
            .copied()
            .unwrap_or_default()
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: U256) -> Result<(), TokenError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                available,
                required: amount,
            });
        }
        self.balances.insert(from, available - amount);
        self.mint(to, amount);
        Ok(())
    }
}

impl FeeToken for TokenLedger {
    fn transfer_from(&mut self, from: Address, to: Address, amount: U256) -> Result<(), TokenError> {
        let allowed = self.allowance(from);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance {
                allowed,
                required: amount,
            });
        }
        self.move_balance(from, to, amount)?;
        self.allowances
            .insert((from, self.spender), allowed - amount);
        Ok(())
    }

    fn transfer(&mut self, to: Address, amount: U256) -> Result<(), TokenError> {
        self.move_balance(self.spender, to, amount)
    }
}

/// Tracks the mainnet and rollup exit roots; the global exit root commits to both.
#[derive(Debug, Clone, Default)]
pub struct ExitRootManager {
    mainnet_exit_root: H256,
    rollup_exit_root: H256,
    updates: Vec<H256>,
}

impl ExitRootManager {
    pub fn set_mainnet_exit_root(&mut self, root: H256) {
        self.mainnet_exit_root = root;
    }

    pub fn rollup_exit_root(&self) -> H256 {
        self.rollup_exit_root
    }

    /// Every local exit root reported by the rollup, oldest first.
    pub fn updates(&self) -> &[H256] {
        &self.updates
    }
}

impl GlobalExitRootManager for ExitRootManager {
    fn last_global_exit_root(&self) -> H256 {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(self.mainnet_exit_root.as_bytes());
        buf[32..].copy_from_slice(self.rollup_exit_root.as_bytes());
        keccak_hash::keccak(buf)
    }

    fn update_exit_root(&mut self, new_local_exit_root: H256) {
        self.rollup_exit_root = new_local_exit_root;
        self.updates.push(new_local_exit_root);
    }
}

/// Stand-in for the circuit verifier.
#[derive(Debug, Clone, Default)]
pub struct MockVerifier {
    reject_all: bool,
    expected_input: Option<U256>,
}

impl MockVerifier {
    pub fn accepting() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            reject_all: true,
            expected_input: None,
        }
    }

    /// Accepts only proofs checked against `input`.
    pub fn expecting(input: U256) -> Self {
        Self {
            reject_all: false,
            expected_input: Some(input),
        }
    }

    pub fn set_reject_all(&mut self, reject_all: bool) {
        self.reject_all = reject_all;
    }
}

impl ProofVerifier for MockVerifier {
    fn verify_proof(&self, public_input: U256, _proof: &Proof) -> bool {
        !self.reject_all
            && self
                .expected_input
                .is_none_or(|expected| expected == public_input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLLUP: Address = Address::repeat_byte(0xee);
    const ALICE: Address = Address::repeat_byte(0xa1);

    #[test]
    fn transfer_from_needs_allowance_and_balance() {
        let mut ledger = TokenLedger::new(ROLLUP);
        ledger.mint(ALICE, U256::from(10));

        assert_eq!(
            ledger.transfer_from(ALICE, ROLLUP, U256::from(5)),
            Err(TokenError::InsufficientAllowance {
                allowed: U256::zero(),
                required: U256::from(5)
            })
        );

        ledger.approve(ALICE, U256::from(20));
        assert!(matches!(
            ledger.transfer_from(ALICE, ROLLUP, U256::from(11)),
            Err(TokenError::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.allowance(ALICE), U256::from(20));

        ledger
            .transfer_from(ALICE, ROLLUP, U256::from(4))
            .expect("funded and approved");
        assert_eq!(ledger.balance_of(ALICE), U256::from(6));
        assert_eq!(ledger.balance_of(ROLLUP), U256::from(4));
        assert_eq!(ledger.allowance(ALICE), U256::from(16));

        ledger.transfer(ALICE, U256::from(4)).expect("rollup funded");
        assert_eq!(ledger.balance_of(ROLLUP), U256::zero());
    }

    #[test]
    fn global_exit_root_follows_rollup_updates() {
        let mut bridge = ExitRootManager::default();
        let before = bridge.last_global_exit_root();
        bridge.update_exit_root(H256::repeat_byte(1));
        assert_ne!(bridge.last_global_exit_root(), before);
        assert_eq!(bridge.updates(), &[H256::repeat_byte(1)]);
    }

    #[test]
    fn mock_verifier_modes() {
        let proof = Proof::default();
        assert!(MockVerifier::accepting().verify_proof(U256::one(), &proof));
        assert!(!MockVerifier::rejecting().verify_proof(U256::one(), &proof));
        let verifier = MockVerifier::expecting(U256::from(7));
        assert!(verifier.verify_proof(U256::from(7), &proof));
        assert!(!verifier.verify_proof(U256::from(8), &proof));
    }
}
