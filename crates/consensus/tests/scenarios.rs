use hex_literal::hex;
use zkrollup_common::{
    Address, Bytes, H256,
    constants::{
        FORCE_BATCH_TIMEOUT, HALT_AGGREGATION_TIMEOUT, MAX_FORCE_BATCH_BYTE_LENGTH, ONE_ETHER,
    },
    hash_chain::fold,
    types::{BatchData, ForcedBatchData},
};
use zkrollup_consensus::{
    CallContext, ErrorKind, FeeToken, GlobalExitRootManager, OverridePendingStateRequest, Role,
    RollupConfig, RollupError, RollupEvent, TokenError, VerifyBatchesRequest,
    dev::{DevRollup, ExitRootManager, MockVerifier, dev_rollup},
};

const ROLLUP: Address = Address::repeat_byte(0xee);
const ADMIN: Address = Address::repeat_byte(0x01);
const SEQUENCER: Address = Address::repeat_byte(0x02);
const AGGREGATOR: Address = Address::repeat_byte(0x03);
const ANYONE: Address = Address::repeat_byte(0x0a);

const GENESIS_ROOT: H256 = H256(hex!(
    "3f86b09b43e3e49a41fc20a07579b79eba044253367817d5c241d23c0e2bc5c9"
));

const AGGREGATOR_TIMEOUT: u64 = 100;
const PENDING_TIMEOUT: u64 = 50;

fn config() -> RollupConfig {
    RollupConfig {
        admin: ADMIN,
        trusted_sequencer: SEQUENCER,
        trusted_sequencer_url: "http://localhost:8123".to_string(),
        trusted_aggregator: AGGREGATOR,
        trusted_aggregator_timeout: AGGREGATOR_TIMEOUT,
        pending_state_timeout: PENDING_TIMEOUT,
        force_batch_allowed: false,
        chain_id: 1000,
        network_name: "zkrollup".to_string(),
        genesis_root: GENESIS_ROOT,
    }
}

fn deploy() -> DevRollup {
    let mut rollup = dev_rollup(&config(), ROLLUP, MockVerifier::accepting());
    let funds = ONE_ETHER * 1000;
    for account in [SEQUENCER, ANYONE] {
        rollup.token_mut().mint(account, funds);
        rollup.token_mut().approve(account, funds);
    }
    rollup.token_mut().mint(ROLLUP, funds);
    rollup
}

fn ctx(caller: Address, timestamp: u64) -> CallContext {
    CallContext::new(caller, timestamp)
}

fn batch(transactions: &'static [u8], timestamp: u64) -> BatchData {
    BatchData {
        transactions: Bytes::from_static(transactions),
        global_exit_root: H256::zero(),
        timestamp,
        min_forced_timestamp: 0,
    }
}

/// Sequences `count` batches stamped at `now` in a single call.
fn sequence(rollup: &mut DevRollup, count: usize, now: u64) -> u64 {
    rollup
        .sequence_batches(ctx(SEQUENCER, now), &vec![batch(&[0xaa], now); count])
        .expect("sequencing succeeds")
}

fn request(
    pending_state_num: u64,
    init_num_batch: u64,
    final_new_batch: u64,
    root: u8,
) -> VerifyBatchesRequest {
    VerifyBatchesRequest {
        pending_state_num,
        init_num_batch,
        final_new_batch,
        new_local_exit_root: H256::repeat_byte(root.wrapping_add(1)),
        new_state_root: H256::repeat_byte(root),
        ..Default::default()
    }
}

#[test]
fn sequenced_batch_commits_to_fold_of_its_content() {
    let mut rollup = deploy();
    let b = batch(&[0x12, 0x34], 1000);
    let last = rollup
        .sequence_batches(ctx(SEQUENCER, 1000), std::slice::from_ref(&b))
        .expect("sequencing succeeds");

    assert_eq!(last, 1);
    let record = rollup
        .state()
        .batches()
        .sequenced_batch(1)
        .copied()
        .expect("record for batch 1");
    assert_eq!(record.acc_input_hash, fold(H256::zero(), &b, SEQUENCER));
    assert_eq!(record.sequenced_timestamp, 1000);
    assert_eq!(
        rollup.drain_events(),
        vec![RollupEvent::SequenceBatches { num_batch: 1 }]
    );
    assert_eq!(
        rollup.token().balance_of(SEQUENCER),
        ONE_ETHER * 1000 - ONE_ETHER
    );
}

#[test]
fn only_the_trusted_sequencer_sequences() {
    let mut rollup = deploy();
    let err = rollup
        .sequence_batches(ctx(ANYONE, 1000), &[batch(&[], 1000)])
        .expect_err("not the sequencer");
    assert_eq!(
        err,
        RollupError::Unauthorized {
            role: Role::TrustedSequencer,
            caller: ANYONE
        }
    );
    assert_eq!(err.kind(), ErrorKind::Authorization);
}

#[test]
fn failed_fee_transfer_leaves_no_trace() {
    let mut rollup = dev_rollup(&config(), ROLLUP, MockVerifier::accepting());
    let err = rollup
        .sequence_batches(ctx(SEQUENCER, 1000), &[batch(&[1], 1000)])
        .expect_err("sequencer has no allowance");
    assert!(matches!(
        err,
        RollupError::Token(TokenError::InsufficientAllowance { .. })
    ));
    assert_eq!(rollup.state().batches().last_batch_sequenced(), 0);
    assert_eq!(rollup.state().batches().last_timestamp(), 0);
    assert!(rollup.drain_events().is_empty());
}

#[test]
fn forced_batch_is_promoted_after_timeout() {
    let mut rollup = deploy();
    rollup
        .set_force_batch_allowed(ctx(ADMIN, 0), true)
        .expect("admin call");
    rollup.drain_events();

    let global_exit_root = rollup.bridge().last_global_exit_root();
    let forced_at = 1000;
    let num = rollup
        .force_batch(ctx(ANYONE, forced_at), Bytes::from_static(&[0xf0]), ONE_ETHER)
        .expect("fee covered");
    assert_eq!(num, 1);
    assert_eq!(rollup.state().batches().last_force_batch(), 1);
    assert_eq!(
        rollup.drain_events(),
        vec![RollupEvent::ForceBatch {
            force_batch_num: 1,
            last_global_exit_root: global_exit_root,
            sequencer: ANYONE,
            transactions: Bytes::from_static(&[0xf0]),
        }]
    );

    let forced = ForcedBatchData {
        transactions: Bytes::from_static(&[0xf0]),
        global_exit_root,
        min_forced_timestamp: forced_at,
    };
    assert_eq!(
        rollup.sequence_force_batches(
            ctx(ANYONE, forced_at + FORCE_BATCH_TIMEOUT - 1),
            std::slice::from_ref(&forced)
        ),
        Err(RollupError::ForceBatchTimeoutNotElapsed(1))
    );
    assert_eq!(
        rollup.sequence_force_batches(ctx(ANYONE, forced_at + FORCE_BATCH_TIMEOUT), &[]),
        Err(RollupError::EmptyBatch)
    );

    let balance_before = rollup.token().balance_of(ANYONE);
    rollup
        .sequence_force_batches(
            ctx(ANYONE, forced_at + FORCE_BATCH_TIMEOUT),
            std::slice::from_ref(&forced),
        )
        .expect("timeout elapsed");
    let batches = rollup.state().batches();
    assert_eq!(batches.last_force_batch_sequenced(), 1);
    assert_eq!(batches.last_batch_sequenced(), 1);
    assert_eq!(batches.last_timestamp(), forced_at + FORCE_BATCH_TIMEOUT);
    assert_eq!(rollup.token().balance_of(ANYONE), balance_before);
    assert_eq!(
        rollup.drain_events(),
        vec![RollupEvent::SequenceForceBatches { num_batch: 1 }]
    );
}

#[test]
fn forced_batch_commits_to_the_current_global_exit_root() {
    let mut rollup = deploy();
    rollup
        .set_force_batch_allowed(ctx(ADMIN, 0), true)
        .expect("admin call");
    rollup
        .bridge_mut()
        .set_mainnet_exit_root(H256::repeat_byte(0x4d));
    let global_exit_root = rollup.bridge().last_global_exit_root();
    assert_ne!(
        global_exit_root,
        ExitRootManager::default().last_global_exit_root()
    );

    rollup
        .force_batch(ctx(ANYONE, 1000), Bytes::from_static(&[7]), ONE_ETHER)
        .expect("fee covered");
    let mut forced = BatchData {
        transactions: Bytes::from_static(&[7]),
        global_exit_root: H256::zero(),
        timestamp: 1010,
        min_forced_timestamp: 1000,
    };
    assert_eq!(
        rollup.sequence_batches(ctx(SEQUENCER, 1010), std::slice::from_ref(&forced)),
        Err(RollupError::ForcedBatchMismatch(1))
    );
    forced.global_exit_root = global_exit_root;
    rollup
        .sequence_batches(ctx(SEQUENCER, 1010), &[forced])
        .expect("forced batch matches the recorded root");

    rollup
        .trusted_verify_batches(ctx(AGGREGATOR, 1020), &request(0, 0, 1, 0x11))
        .expect("trusted verification");
    assert_eq!(rollup.bridge().rollup_exit_root(), H256::repeat_byte(0x12));
    assert_ne!(rollup.bridge().last_global_exit_root(), global_exit_root);
}

#[test]
fn forced_transactions_must_stay_below_the_size_limit() {
    let mut rollup = deploy();
    rollup
        .set_force_batch_allowed(ctx(ADMIN, 0), true)
        .expect("admin call");
    rollup.drain_events();
    let balance_before = rollup.token().balance_of(ANYONE);

    assert_eq!(
        rollup.force_batch(
            ctx(ANYONE, 1000),
            Bytes::from(vec![0u8; MAX_FORCE_BATCH_BYTE_LENGTH]),
            ONE_ETHER
        ),
        Err(RollupError::TransactionsTooLarge {
            length: MAX_FORCE_BATCH_BYTE_LENGTH,
            limit: MAX_FORCE_BATCH_BYTE_LENGTH
        })
    );
    assert_eq!(rollup.token().balance_of(ANYONE), balance_before);
    assert_eq!(rollup.state().batches().last_force_batch(), 0);
    assert!(rollup.drain_events().is_empty());

    rollup
        .force_batch(
            ctx(ANYONE, 1000),
            Bytes::from(vec![0u8; MAX_FORCE_BATCH_BYTE_LENGTH - 1]),
            ONE_ETHER,
        )
        .expect("one byte below the limit");
    assert_eq!(rollup.state().batches().last_force_batch(), 1);
}

#[test]
fn force_batch_requires_enablement_and_fee() {
    let mut rollup = deploy();
    assert_eq!(
        rollup.force_batch(ctx(ANYONE, 1), Bytes::new(), ONE_ETHER),
        Err(RollupError::ForceBatchesNotAllowed)
    );
    rollup
        .set_force_batch_allowed(ctx(ADMIN, 1), true)
        .expect("admin call");
    assert_eq!(
        rollup.force_batch(ctx(ANYONE, 1), Bytes::new(), ONE_ETHER - 1),
        Err(RollupError::InsufficientFee {
            max_fee: ONE_ETHER - 1,
            batch_fee: ONE_ETHER
        })
    );
}

#[test]
fn trusted_sequencer_only_pays_for_non_forced_batches() {
    let mut rollup = deploy();
    rollup
        .set_force_batch_allowed(ctx(ADMIN, 0), true)
        .expect("admin call");
    let global_exit_root = rollup.bridge().last_global_exit_root();
    rollup
        .force_batch(ctx(ANYONE, 1000), Bytes::from_static(&[1, 2]), ONE_ETHER)
        .expect("fee covered");

    let forced = BatchData {
        transactions: Bytes::from_static(&[1, 2]),
        global_exit_root,
        timestamp: 1010,
        min_forced_timestamp: 1000,
    };
    let before = rollup.token().balance_of(SEQUENCER);
    rollup
        .sequence_batches(ctx(SEQUENCER, 1010), &[forced, batch(&[3], 1010)])
        .expect("forced batch matches");

    assert_eq!(before - rollup.token().balance_of(SEQUENCER), ONE_ETHER);
    assert_eq!(rollup.state().batches().last_force_batch_sequenced(), 1);
    assert_eq!(rollup.state().batches().last_batch_sequenced(), 2);
}

#[test]
fn permissionless_verification_waits_for_consolidation() {
    let mut rollup = deploy();
    sequence(&mut rollup, 5, 1000);

    assert_eq!(
        rollup.verify_batches(ctx(ANYONE, 1000 + AGGREGATOR_TIMEOUT - 1), &request(0, 0, 5, 0x55)),
        Err(RollupError::AggregatorTimeoutNotElapsed(5))
    );

    let verified_at = 1000 + AGGREGATOR_TIMEOUT;
    rollup
        .verify_batches(ctx(ANYONE, verified_at), &request(0, 0, 5, 0x55))
        .expect("aggregator timeout elapsed");
    assert_eq!(rollup.state().pending().last_pending_state(), 1);
    assert_eq!(rollup.last_verified_batch(), 0);
    assert_eq!(rollup.last_verified_batch_including_pending(), 5);
    assert_eq!(rollup.token().balance_of(ANYONE), ONE_ETHER * 1005);

    let err = rollup
        .consolidate_pending_state(ctx(ANYONE, verified_at), 1)
        .expect_err("timeout not elapsed");
    assert_eq!(err, RollupError::NotReadyToConsolidate(1));
    assert!(err.is_retryable());

    assert!(!rollup.is_pending_state_consolidable(1, verified_at + PENDING_TIMEOUT - 1));
    assert!(rollup.is_pending_state_consolidable(1, verified_at + PENDING_TIMEOUT));
    rollup.drain_events();
    rollup
        .consolidate_pending_state(ctx(ANYONE, verified_at + PENDING_TIMEOUT), 1)
        .expect("timeout elapsed");

    assert_eq!(rollup.last_verified_batch(), 5);
    assert_eq!(rollup.state().state_root(5), Some(H256::repeat_byte(0x55)));
    assert_eq!(rollup.bridge().updates(), &[H256::repeat_byte(0x56)]);
    assert_eq!(
        rollup.drain_events(),
        vec![RollupEvent::ConsolidatePendingState {
            num_batch: 5,
            state_root: H256::repeat_byte(0x55),
            pending_state_num: 1,
        }]
    );
    assert_eq!(
        rollup.consolidate_pending_state(ctx(ANYONE, verified_at + PENDING_TIMEOUT), 1),
        Err(RollupError::InvalidPendingStateRef(1))
    );
}

#[test]
fn zero_pending_timeout_finalizes_immediately() {
    let mut rollup = deploy();
    sequence(&mut rollup, 2, 1000);
    sequence(&mut rollup, 2, 1001);
    rollup
        .verify_batches(ctx(ANYONE, 1200), &request(0, 0, 2, 0x22))
        .expect("verification accepted");
    assert_eq!(rollup.state().pending().last_pending_state(), 1);

    rollup
        .set_pending_state_timeout(ctx(ADMIN, 1200), 0)
        .expect("lower timeout");
    rollup
        .verify_batches(ctx(ANYONE, 1201), &request(1, 2, 4, 0x44))
        .expect("verification accepted");

    assert_eq!(rollup.last_verified_batch(), 4);
    assert_eq!(rollup.state().pending().last_pending_state(), 0);
    assert_eq!(rollup.state().pending().last_pending_state_consolidated(), 0);
    assert_eq!(rollup.state().state_root(4), Some(H256::repeat_byte(0x44)));
    assert_eq!(rollup.bridge().updates(), &[H256::repeat_byte(0x45)]);
}

#[test]
fn stalled_aggregation_activates_emergency_state() {
    let mut rollup = deploy();
    sequence(&mut rollup, 2, 1000);

    assert_eq!(
        rollup.activate_emergency_state(ctx(ANYONE, 1000 + HALT_AGGREGATION_TIMEOUT), 1),
        Err(RollupError::NotEndOfSequence(1))
    );
    assert_eq!(
        rollup.activate_emergency_state(ctx(ANYONE, 1000 + HALT_AGGREGATION_TIMEOUT), 3),
        Err(RollupError::NotEndOfSequence(3))
    );
    assert_eq!(
        rollup.activate_emergency_state(ctx(ANYONE, 1000 + HALT_AGGREGATION_TIMEOUT - 1), 2),
        Err(RollupError::HaltTimeoutNotElapsed(2))
    );
    rollup.drain_events();
    rollup
        .activate_emergency_state(ctx(ANYONE, 1000 + HALT_AGGREGATION_TIMEOUT), 2)
        .expect("halt timeout elapsed");
    assert!(rollup.is_emergency_state());
    assert_eq!(
        rollup.drain_events(),
        vec![RollupEvent::EmergencyStateActivated]
    );

    let now = 1000 + HALT_AGGREGATION_TIMEOUT + 1;
    let err = rollup
        .sequence_batches(ctx(SEQUENCER, now), &[batch(&[], now)])
        .expect_err("halted");
    assert_eq!(err, RollupError::EmergencyHalted);
    assert_eq!(err.kind(), ErrorKind::EmergencyHalted);
    assert_eq!(
        rollup.trusted_verify_batches(ctx(AGGREGATOR, now), &request(0, 0, 2, 0x22)),
        Err(RollupError::EmergencyHalted)
    );
    assert_eq!(
        rollup.consolidate_pending_state(ctx(ANYONE, now), 1),
        Err(RollupError::EmergencyHalted)
    );
    assert_eq!(
        rollup.admin_activate_emergency_state(ctx(ADMIN, now)),
        Err(RollupError::EmergencyHalted)
    );
}

#[test]
fn verified_batches_cannot_trigger_emergency() {
    let mut rollup = deploy();
    sequence(&mut rollup, 1, 1000);
    rollup
        .trusted_verify_batches(ctx(AGGREGATOR, 1001), &request(0, 0, 1, 0x11))
        .expect("trusted verification");
    assert_eq!(
        rollup.activate_emergency_state(ctx(ANYONE, 1000 + HALT_AGGREGATION_TIMEOUT), 1),
        Err(RollupError::AlreadyVerified(1))
    );

    assert_eq!(
        rollup.admin_activate_emergency_state(ctx(ANYONE, 1002)),
        Err(RollupError::Unauthorized {
            role: Role::Admin,
            caller: ANYONE
        })
    );
    rollup
        .admin_activate_emergency_state(ctx(ADMIN, 1002))
        .expect("admin halt");
    assert!(rollup.is_emergency_state());
}

#[test]
fn override_requires_a_diverging_root() {
    let mut rollup = deploy();
    sequence(&mut rollup, 1, 1000);
    sequence(&mut rollup, 1, 1001);
    rollup
        .verify_batches(ctx(ANYONE, 1200), &request(0, 0, 2, 0xa0))
        .expect("verification accepted");

    let mut override_request = OverridePendingStateRequest {
        init_pending_state_num: 0,
        final_pending_state_num: 1,
        init_num_batch: 0,
        final_new_batch: 2,
        new_local_exit_root: H256::repeat_byte(0xb1),
        new_state_root: H256::repeat_byte(0xa0),
        ..Default::default()
    };
    assert_eq!(
        rollup.override_pending_state(ctx(ANYONE, 1201), &override_request),
        Err(RollupError::Unauthorized {
            role: Role::TrustedAggregator,
            caller: ANYONE
        })
    );
    assert_eq!(
        rollup.override_pending_state(ctx(AGGREGATOR, 1201), &override_request),
        Err(RollupError::NoDivergence(1))
    );

    override_request.new_state_root = H256::repeat_byte(0xb0);
    override_request.final_pending_state_num = 2;
    assert_eq!(
        rollup.override_pending_state(ctx(AGGREGATOR, 1201), &override_request),
        Err(RollupError::InvalidFinalPendingState(2))
    );

    override_request.final_pending_state_num = 1;
    rollup.drain_events();
    rollup
        .override_pending_state(ctx(AGGREGATOR, 1201), &override_request)
        .expect("diverging root");

    assert_eq!(rollup.last_verified_batch(), 2);
    assert_eq!(rollup.state().state_root(2), Some(H256::repeat_byte(0xb0)));
    assert_eq!(rollup.state().pending().last_pending_state(), 0);
    assert_eq!(rollup.bridge().updates(), &[H256::repeat_byte(0xb1)]);
    assert_eq!(
        rollup.drain_events(),
        vec![RollupEvent::OverridePendingState {
            num_batch: 2,
            state_root: H256::repeat_byte(0xb0),
            aggregator: AGGREGATOR,
        }]
    );
}

#[test]
fn stale_pending_reference_fails_cleanly() {
    let mut rollup = deploy();
    sequence(&mut rollup, 2, 1000);
    sequence(&mut rollup, 2, 1001);
    rollup
        .verify_batches(ctx(ANYONE, 1200), &request(0, 0, 2, 0x22))
        .expect("first verification");
    rollup
        .verify_batches(ctx(ANYONE, 1201), &request(1, 2, 4, 0x44))
        .expect("second verification");

    let before = rollup.token().balance_of(ANYONE);
    assert_eq!(
        rollup.verify_batches(ctx(ANYONE, 1202), &request(1, 2, 4, 0x45)),
        Err(RollupError::NotForwardProgress {
            final_batch: 4,
            last_verified: 4
        })
    );
    assert_eq!(rollup.token().balance_of(ANYONE), before);
    assert_eq!(rollup.state().pending().last_pending_state(), 2);

    assert_eq!(
        rollup.verify_batches(ctx(ANYONE, 1202), &request(3, 4, 4, 0x45)),
        Err(RollupError::NotForwardProgress {
            final_batch: 4,
            last_verified: 4
        })
    );
}

#[test]
fn verification_reference_errors() {
    let mut rollup = deploy();
    sequence(&mut rollup, 2, 1000);
    sequence(&mut rollup, 2, 1001);

    assert_eq!(
        rollup.trusted_verify_batches(ctx(AGGREGATOR, 1002), &request(0, 1, 2, 0x22)),
        Err(RollupError::InitBatchMismatch {
            init_batch: 1,
            expected: 0
        })
    );
    assert_eq!(
        rollup.trusted_verify_batches(ctx(AGGREGATOR, 1002), &request(1, 0, 2, 0x22)),
        Err(RollupError::InvalidPendingStateRef(1))
    );
    assert_eq!(
        rollup.trusted_verify_batches(ctx(AGGREGATOR, 1002), &request(0, 0, 3, 0x33)),
        Err(RollupError::UnknownFinalBatch(3))
    );
    assert_eq!(
        rollup.trusted_verify_batches(ctx(AGGREGATOR, 1002), &request(0, 0, 0, 0x33)),
        Err(RollupError::NotForwardProgress {
            final_batch: 0,
            last_verified: 0
        })
    );

    rollup.verifier_mut().set_reject_all(true);
    let err = rollup
        .trusted_verify_batches(ctx(AGGREGATOR, 1002), &request(0, 0, 2, 0x22))
        .expect_err("verifier rejects");
    assert_eq!(err, RollupError::ProofRejected);
    assert_eq!(err.kind(), ErrorKind::ProofRejected);
    assert_eq!(rollup.last_verified_batch(), 0);
}

#[test]
fn missing_genesis_root_blocks_verification() {
    let config = RollupConfig {
        genesis_root: H256::zero(),
        ..config()
    };
    let mut rollup = dev_rollup(&config, ROLLUP, MockVerifier::accepting());
    rollup.token_mut().mint(SEQUENCER, ONE_ETHER);
    rollup.token_mut().approve(SEQUENCER, ONE_ETHER);
    sequence(&mut rollup, 1, 1000);

    let err = rollup
        .trusted_verify_batches(ctx(AGGREGATOR, 1001), &request(0, 0, 1, 0x11))
        .expect_err("no root at batch 0");
    assert_eq!(err, RollupError::MissingInitRoot(0));
    assert_eq!(err.kind(), ErrorKind::Reference);
    assert_eq!(rollup.last_verified_batch(), 0);
}

#[test]
fn failed_reward_transfer_rolls_back_verification() {
    let mut rollup = deploy();
    sequence(&mut rollup, 2, 1000);
    let pool = rollup.token().balance_of(ROLLUP);
    rollup
        .token_mut()
        .transfer(ANYONE, pool)
        .expect("drain the fee pool");
    rollup.drain_events();

    let err = rollup
        .verify_batches(ctx(ANYONE, 1000 + AGGREGATOR_TIMEOUT), &request(0, 0, 2, 0x22))
        .expect_err("pool cannot pay the reward");
    assert!(matches!(
        err,
        RollupError::Token(TokenError::InsufficientBalance { .. })
    ));
    assert_eq!(rollup.state().pending().last_pending_state(), 0);
    assert_eq!(rollup.last_verified_batch_including_pending(), 0);
    assert_eq!(rollup.batch_fee(), ONE_ETHER);

    assert!(matches!(
        rollup.trusted_verify_batches(ctx(AGGREGATOR, 1001), &request(0, 0, 2, 0x22)),
        Err(RollupError::Token(TokenError::InsufficientBalance { .. }))
    ));
    assert_eq!(rollup.last_verified_batch(), 0);
    assert_eq!(rollup.state().state_root(2), None);
    assert_eq!(rollup.batch_fee(), ONE_ETHER);
    assert!(rollup.bridge().updates().is_empty());
    assert!(rollup.drain_events().is_empty());
}

#[test]
fn proof_is_checked_against_the_snark_input() {
    let mut rollup = deploy();
    sequence(&mut rollup, 3, 1000);

    let input = rollup
        .next_snark_input(
            AGGREGATOR,
            0,
            0,
            3,
            H256::repeat_byte(0x34),
            H256::repeat_byte(0x33),
        )
        .expect("known batches");
    assert!(
        rollup
            .next_snark_input(AGGREGATOR, 0, 0, 2, H256::zero(), H256::zero())
            .is_none()
    );
    *rollup.verifier_mut() = MockVerifier::expecting(input);

    assert_eq!(
        rollup.trusted_verify_batches(ctx(AGGREGATOR, 1001), &request(0, 0, 3, 0x32)),
        Err(RollupError::ProofRejected)
    );
    rollup
        .trusted_verify_batches(ctx(AGGREGATOR, 1001), &request(0, 0, 3, 0x33))
        .expect("proof matches input");
    assert_eq!(rollup.last_verified_batch(), 3);
}

#[test]
fn trusted_verification_rewards_and_lowers_fee() {
    let mut rollup = deploy();
    sequence(&mut rollup, 1, 1000);
    rollup
        .trusted_verify_batches(ctx(AGGREGATOR, 1010), &request(0, 0, 1, 0x11))
        .expect("trusted verification");

    assert_eq!(rollup.token().balance_of(AGGREGATOR), ONE_ETHER);
    assert_eq!(rollup.batch_fee(), ONE_ETHER * 1000 / 1002);
    assert_eq!(rollup.last_verified_batch(), 1);
    assert_eq!(rollup.state().state_root(1), Some(H256::repeat_byte(0x11)));
    assert_eq!(rollup.bridge().updates(), &[H256::repeat_byte(0x12)]);
}

#[test]
fn trusted_verification_supersedes_pending_states() {
    let mut rollup = deploy();
    sequence(&mut rollup, 1, 1000);
    sequence(&mut rollup, 1, 1001);
    rollup
        .verify_batches(ctx(ANYONE, 1200), &request(0, 0, 1, 0x11))
        .expect("permissionless verification");
    rollup
        .trusted_verify_batches(ctx(AGGREGATOR, 1201), &request(1, 1, 2, 0x22))
        .expect("trusted verification on top of pending state");

    assert_eq!(rollup.last_verified_batch(), 2);
    assert_eq!(rollup.state().pending().last_pending_state(), 0);
    assert_eq!(rollup.last_verified_batch_including_pending(), 2);
}

#[test]
fn sequencing_consolidates_half_the_ready_backlog() {
    let mut rollup = deploy();
    for i in 0..4 {
        sequence(&mut rollup, 1, 1000 + i);
    }
    rollup
        .verify_batches(ctx(ANYONE, 1200), &request(0, 0, 1, 0x11))
        .expect("verification 1");
    for (pending, batch) in [(1, 1), (2, 2), (3, 3)] {
        rollup
            .verify_batches(
                ctx(ANYONE, 1200 + pending),
                &request(pending, batch, batch + 1, 0x11 * (batch as u8 + 1)),
            )
            .expect("chained verification");
    }
    assert_eq!(rollup.state().pending().last_pending_state(), 4);
    rollup.drain_events();

    sequence(&mut rollup, 1, 1260);

    assert_eq!(rollup.state().pending().last_pending_state_consolidated(), 2);
    assert_eq!(rollup.last_verified_batch(), 2);
    assert_eq!(rollup.state().state_root(1), Some(H256::repeat_byte(0x11)));
    assert_eq!(rollup.state().state_root(2), Some(H256::repeat_byte(0x22)));
    assert_eq!(
        rollup.drain_events(),
        vec![
            RollupEvent::ConsolidatePendingState {
                num_batch: 2,
                state_root: H256::repeat_byte(0x22),
                pending_state_num: 2,
            },
            RollupEvent::SequenceBatches { num_batch: 5 },
        ]
    );
}

#[test]
fn admin_surface_is_gated_and_ratchets_down() {
    let mut rollup = deploy();
    assert!(matches!(
        rollup.set_trusted_sequencer(ctx(ANYONE, 0), ANYONE),
        Err(RollupError::Unauthorized {
            role: Role::Admin,
            ..
        })
    ));
    assert_eq!(
        rollup.set_trusted_aggregator_timeout(ctx(ADMIN, 0), AGGREGATOR_TIMEOUT),
        Err(RollupError::TimeoutNotLowered {
            new: AGGREGATOR_TIMEOUT,
            current: AGGREGATOR_TIMEOUT
        })
    );
    assert_eq!(
        rollup.set_pending_state_timeout(ctx(ADMIN, 0), PENDING_TIMEOUT + 1),
        Err(RollupError::TimeoutNotLowered {
            new: PENDING_TIMEOUT + 1,
            current: PENDING_TIMEOUT
        })
    );
    assert_eq!(
        rollup.set_multiplier_batch_fee(ctx(ADMIN, 0), 1024),
        Err(RollupError::MultiplierOutOfRange(1024))
    );

    let new_admin = Address::repeat_byte(0xad);
    rollup
        .set_trusted_sequencer(ctx(ADMIN, 0), ANYONE)
        .expect("admin call");
    rollup
        .set_trusted_sequencer_url(ctx(ADMIN, 0), "http://new:8123".to_string())
        .expect("admin call");
    rollup
        .set_trusted_aggregator(ctx(ADMIN, 0), ANYONE)
        .expect("admin call");
    rollup
        .set_trusted_aggregator_timeout(ctx(ADMIN, 0), 10)
        .expect("admin call");
    rollup
        .set_multiplier_batch_fee(ctx(ADMIN, 0), 1010)
        .expect("admin call");
    rollup
        .set_verify_batch_time_target(ctx(ADMIN, 0), 60)
        .expect("admin call");
    rollup.set_admin(ctx(ADMIN, 0), new_admin).expect("admin call");

    assert_eq!(rollup.state().roles().trusted_sequencer, ANYONE);
    assert_eq!(rollup.state().roles().trusted_sequencer_url, "http://new:8123");
    assert_eq!(rollup.state().trusted_aggregator_timeout(), 10);
    assert_eq!(rollup.state().fees().multiplier_batch_fee(), 1010);
    assert_eq!(rollup.state().fees().verify_batch_time_target(), 60);
    assert_eq!(rollup.drain_events().len(), 7);

    assert!(rollup.set_admin(ctx(ADMIN, 0), ADMIN).is_err());
    rollup
        .set_admin(ctx(new_admin, 0), ADMIN)
        .expect("new admin in charge");
    assert_eq!(
        rollup.drain_events(),
        vec![RollupEvent::SetAdmin { new_admin: ADMIN }]
    );
}

#[test]
fn counters_never_decrease() {
    let mut rollup = deploy();
    let snapshot = |rollup: &DevRollup| {
        let state = rollup.state();
        (
            state.batches().last_batch_sequenced(),
            state.batches().last_force_batch(),
            state.last_verified_batch(),
        )
    };

    let mut previous = snapshot(&rollup);
    let mut check = |rollup: &DevRollup| {
        let current = snapshot(rollup);
        assert!(current.0 >= previous.0 && current.1 >= previous.1 && current.2 >= previous.2);
        previous = current;
    };

    sequence(&mut rollup, 3, 1000);
    check(&rollup);
    let _ = rollup.sequence_batches(ctx(SEQUENCER, 999), &[batch(&[], 999)]);
    check(&rollup);
    rollup
        .trusted_verify_batches(ctx(AGGREGATOR, 1001), &request(0, 0, 3, 0x33))
        .expect("trusted verification");
    check(&rollup);
    let _ = rollup.trusted_verify_batches(ctx(AGGREGATOR, 1002), &request(0, 0, 3, 0x34));
    check(&rollup);
    sequence(&mut rollup, 2, 1003);
    rollup
        .verify_batches(ctx(ANYONE, 1200), &request(0, 3, 5, 0x55))
        .expect("permissionless verification");
    check(&rollup);
    let _ = rollup.consolidate_pending_state(ctx(ANYONE, 1200), 1);
    check(&rollup);
    rollup
        .consolidate_pending_state(ctx(ANYONE, 1250), 1)
        .expect("consolidation");
    check(&rollup);
    assert_eq!(snapshot(&rollup), (5, 0, 5));
}
