//! End-to-end tests driving the ledger through the engine entry points.

use super::*;
use stakepool_common::{
    constants::{fees, precision::PENALTY_SCALE, token::ONE},
    ids, ErrorKind, EventType, PaymentReason, StakePoolError,
};

const ADMIN: Address = [1u8; 32];
const OPERATOR: Address = [2u8; 32];
const MANAGER: Address = [3u8; 32];
const MAINTAINER: Address = [0xEE; 32];
const OWNER: Address = [7u8; 32];
const ALICE: Address = [8u8; 32];
const BOB: Address = [9u8; 32];
const CAROL: Address = [10u8; 32];

type TestPool = StakePool<InMemoryPayments, InMemoryRegistrations>;

// ============ Fixtures ============

fn create_test_pool() -> TestPool {
    create_test_pool_with_fee(fees::DEFAULT_MAINTAINER_FEE_BPS)
}

fn create_test_pool_with_fee(fee_bps: u64) -> TestPool {
    let settings = Settings::new(MAINTAINER, [0x01; 32])
        .with_min_deposit_unit(ONE / 10)
        .with_maintainer_fee(fee_bps);
    let mut pool = StakePool::new(
        settings,
        ADMIN,
        InMemoryPayments::new(),
        InMemoryRegistrations::new(),
    )
    .unwrap();
    pool.grant_role(ADMIN, 1, OPERATOR, Role::Operator).unwrap();
    pool.grant_role(ADMIN, 1, MANAGER, Role::Manager).unwrap();
    pool
}

fn create_registration_request(unit_id: UnitId, key_byte: u8) -> RegistrationRequest {
    RegistrationRequest {
        pubkey: vec![key_byte; 48],
        unit_id,
        signature: vec![0xAB; 96],
        deposit_data_root: [0u8; 32],
    }
}

fn deposit(pool: &mut TestPool, depositor: Address, amount: Amount) -> Vec<Allocation> {
    pool.deposit(depositor, 100, OWNER, depositor, amount).unwrap()
}

fn register(pool: &mut TestPool, unit_id: UnitId, key_byte: u8) -> ValidatorId {
    pool.register_validator(OPERATOR, 110, &create_registration_request(unit_id, key_byte))
        .unwrap()
}

fn settle(pool: &mut TestPool, validator_id: ValidatorId, returned: Amount) -> StakeResult<Vec<Payment>> {
    pool.assign_escrow(MANAGER, 200, validator_id)?;
    pool.receive_funds(MANAGER, 201, validator_id, returned)?;
    pool.unlock_escrow(MANAGER, 202, validator_id)
}

/// Alice and Bob fund one validator with 16 ETH each
fn create_shared_validator(pool: &mut TestPool) -> (UnitId, ValidatorId) {
    let unit_id = deposit(pool, ALICE, 16 * ONE)[0].unit_id;
    deposit(pool, BOB, 16 * ONE);
    let validator_id = register(pool, unit_id, 5);
    (unit_id, validator_id)
}

// ============ Deposits ============

#[test]
fn test_deposits_split_across_units() {
    let mut pool = create_test_pool();

    deposit(&mut pool, ALICE, 20 * ONE);
    let allocations = deposit(&mut pool, BOB, 15 * ONE);

    let first = ids::unit_id(&OWNER, 1);
    let second = ids::unit_id(&OWNER, 2);
    assert_eq!(allocations.len(), 2);
    assert_eq!(allocations[0].unit_id, first);
    assert_eq!(allocations[0].amount, 12 * ONE);
    assert_eq!(allocations[1].unit_id, second);
    assert_eq!(allocations[1].amount, 3 * ONE);

    assert_eq!(pool.unit(&first).unwrap().collected, 32 * ONE);
    assert_eq!(pool.deposit_of(&first, &BOB, &BOB), 12 * ONE);
    assert_eq!(pool.deposit_of(&second, &BOB, &BOB), 3 * ONE);
    assert_eq!(pool.current_unit(&OWNER, None).unwrap().id, second);
    assert!(pool.audit().is_empty());
}

#[test]
fn test_conservation_after_cancellations() {
    let mut pool = create_test_pool();
    deposit(&mut pool, ALICE, 20 * ONE);
    deposit(&mut pool, BOB, 15 * ONE);
    deposit(&mut pool, CAROL, ONE);

    let first = ids::unit_id(&OWNER, 1);
    let second = ids::unit_id(&OWNER, 2);

    let refund = pool.cancel_deposit(BOB, 120, second, BOB, 3 * ONE).unwrap();
    pool.cancel_deposit(CAROL, 121, second, CAROL, ONE / 2).unwrap();

    assert_eq!(refund, Payment::new(BOB, 3 * ONE, PaymentReason::Cancellation));
    assert_eq!(pool.payments().total_to(&BOB), 3 * ONE);
    assert_eq!(pool.unit(&first).unwrap().collected, 32 * ONE);
    assert_eq!(pool.unit(&second).unwrap().collected, ONE / 2);
    assert_eq!(pool.deposit_of(&second, &BOB, &BOB), 0);
    assert_eq!(pool.deposit_of(&first, &BOB, &BOB), 12 * ONE);
    assert!(audit::check_conservation(pool.state()).is_empty());
    assert!(pool.audit().is_empty());
}

#[test]
fn test_cancel_in_passed_unit_keeps_it_registrable() {
    let mut pool = create_test_pool();
    let first = deposit(&mut pool, ALICE, 32 * ONE)[0].unit_id;
    let second = deposit(&mut pool, BOB, ONE)[0].unit_id;
    let state_before = pool.state().clone();

    let err = pool.cancel_deposit(ALICE, 120, first, ALICE, ONE).unwrap_err();

    assert_eq!(err, StakePoolError::UnitNotCollecting { unit_id: first });
    assert_eq!(pool.state(), &state_before);
    assert!(pool.payments().sent().is_empty());

    // New deposits keep filling the unit after it
    let allocations = deposit(&mut pool, CAROL, ONE);
    assert_eq!(allocations[0].unit_id, second);
    assert_eq!(pool.unit(&first).unwrap().collected, 32 * ONE);

    register(&mut pool, first, 5);
    assert_eq!(pool.registration().total_value(), 32 * ONE);
    assert!(pool.audit().is_empty());
}

#[test]
fn test_public_and_private_deposits_share_owner() {
    let mut pool = create_test_pool();
    let key = [0x33; 48];

    let private = pool.deposit_private(CAROL, 100, OWNER, CAROL, &key, ONE).unwrap();
    let public = deposit(&mut pool, ALICE, 2 * ONE);
    let other_key = pool.deposit_private(BOB, 101, OWNER, BOB, &[0x44; 48], ONE).unwrap();
    let more_private = pool.deposit_private(CAROL, 102, OWNER, CAROL, &key, ONE).unwrap();

    assert_ne!(private[0].unit_id, public[0].unit_id);
    assert_ne!(other_key[0].unit_id, private[0].unit_id);
    assert_eq!(more_private[0].unit_id, private[0].unit_id);

    let public_unit = pool.current_unit(&OWNER, None).unwrap();
    assert_eq!(public_unit.id, public[0].unit_id);
    assert!(!public_unit.is_private());
    assert_eq!(pool.current_unit(&OWNER, Some(&key)).unwrap().collected, 2 * ONE);
    assert!(pool.audit().is_empty());
}

#[test]
fn test_cancel_after_registration_changes_nothing() {
    let mut pool = create_test_pool();
    let unit_id = deposit(&mut pool, ALICE, 32 * ONE)[0].unit_id;
    register(&mut pool, unit_id, 5);

    let state_before = pool.state().clone();
    let events_before = pool.events().len();

    let err = pool.cancel_deposit(ALICE, 130, unit_id, ALICE, ONE).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AlreadyFinalized);
    assert!(pool.payments().sent().is_empty());
    assert_eq!(pool.state(), &state_before);
    assert_eq!(pool.events().len(), events_before);
}

// ============ Registration ============

#[test]
fn test_registration_forwards_deposit() {
    let mut pool = create_test_pool();
    let unit_id = deposit(&mut pool, ALICE, 32 * ONE)[0].unit_id;

    let validator_id = register(&mut pool, unit_id, 5);

    let forwarded = pool.registration().deposits();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].validator_id, validator_id);
    assert_eq!(forwarded[0].amount, 32 * ONE);
    assert_eq!(forwarded[0].withdrawal_credentials, [0x01; 32]);

    let unit = pool.unit(&unit_id).unwrap();
    assert_eq!(unit.collected, 0);
    assert_eq!(unit.staked_amount, 32 * ONE);
    assert_eq!(unit.validator, Some(validator_id));
}

#[test]
fn test_registration_failure_rolls_back() {
    let mut pool = create_test_pool();
    let unit_id = deposit(&mut pool, ALICE, 32 * ONE)[0].unit_id;
    pool.registration_mut().set_rejecting(true);
    let events_before = pool.events().len();

    let result = pool.register_validator(OPERATOR, 110, &create_registration_request(unit_id, 5));

    assert!(matches!(result, Err(StakePoolError::RegistrationFailed { .. })));
    assert_eq!(pool.unit(&unit_id).unwrap().collected, 32 * ONE);
    assert!(pool.validator(&ids::validator_id(&[5u8; 48])).is_none());
    assert_eq!(pool.events().len(), events_before);

    pool.registration_mut().set_rejecting(false);
    assert!(pool
        .register_validator(OPERATOR, 111, &create_registration_request(unit_id, 5))
        .is_ok());
}

#[test]
fn test_settings_change_keeps_validator_snapshot() {
    let mut pool = create_test_pool();
    let (_, validator_id) = create_shared_validator(&mut pool);

    let settings = pool.settings().clone().with_maintainer_fee(5_000);
    pool.update_settings(ADMIN, 150, settings).unwrap();

    let validator = pool.validator(&validator_id).unwrap();
    assert_eq!(validator.maintainer_fee_bps, fees::DEFAULT_MAINTAINER_FEE_BPS);
    assert_eq!(pool.events().filter_by_type(EventType::SettingsUpdated).len(), 1);

    // 33.5 returned: the 10% snapshot applies to the 1.5 profit
    let payments = settle(&mut pool, validator_id, 33 * ONE + ONE / 2).unwrap();
    assert_eq!(payments, vec![Payment::new(MAINTAINER, 15 * ONE / 100, PaymentReason::MaintainerReward)]);
}

// ============ Settlement ============

#[test]
fn test_full_lifecycle_with_profit() {
    let mut pool = create_test_pool();
    let (unit_id, validator_id) = create_shared_validator(&mut pool);

    let payments = settle(&mut pool, validator_id, 33 * ONE + ONE / 2).unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(pool.payments().total_to(&MAINTAINER), 15 * ONE / 100);

    let alice = pool.withdraw(ALICE, 300, unit_id, ALICE).unwrap();
    let bob = pool.withdraw(BOB, 300, unit_id, BOB).unwrap();

    let expected = 16 * ONE + 675 * ONE / 1_000;
    assert_eq!(alice.amount, expected);
    assert_eq!(bob.amount, expected);
    assert!(pool.escrow(&validator_id).unwrap().is_drained());

    let again = pool.withdraw(ALICE, 301, unit_id, ALICE).unwrap_err();
    assert_eq!(again.kind(), ErrorKind::NothingToWithdraw);
    assert_eq!(pool.payments().total_to(&ALICE), expected);
    assert!(pool.audit().is_empty());
}

#[test]
fn test_penalty_monotonic_in_returned_balance() {
    let payout_for = |returned: Amount| -> Amount {
        let mut pool = create_test_pool();
        let (unit_id, validator_id) = create_shared_validator(&mut pool);
        settle(&mut pool, validator_id, returned).unwrap();
        pool.withdraw(ALICE, 300, unit_id, ALICE).unwrap().amount
    };

    let returned = [28 * ONE, 30 * ONE, 31 * ONE, 32 * ONE, 33 * ONE];
    let payouts: Vec<Amount> = returned.iter().map(|r| payout_for(*r)).collect();

    assert!(payouts.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(payouts[2], 15 * ONE + ONE / 2);
    assert_eq!(payouts[3], 16 * ONE);
}

#[test]
fn test_penalty_ratio_reported() {
    let mut pool = create_test_pool();
    let (_, validator_id) = create_shared_validator(&mut pool);

    settle(&mut pool, validator_id, 31 * ONE).unwrap();

    assert_eq!(pool.penalty_ratio(&validator_id).unwrap(), Some(PENALTY_SCALE * 31 / 32));
}

#[test]
fn test_payment_failure_rolls_back_withdrawal() {
    let mut pool = create_test_pool();
    let (unit_id, validator_id) = create_shared_validator(&mut pool);
    settle(&mut pool, validator_id, 32 * ONE).unwrap();

    pool.payments_mut().fail_for(ALICE);
    let balance_before = pool.escrow(&validator_id).unwrap().balance;
    let events_before = pool.events().len();

    let err = pool.withdraw(ALICE, 300, unit_id, ALICE).unwrap_err();

    assert_eq!(err, StakePoolError::TransferFailed { to: ALICE, amount: 16 * ONE });
    assert_eq!(pool.escrow(&validator_id).unwrap().balance, balance_before);
    assert_eq!(pool.events().len(), events_before);

    pool.payments_mut().recover(&ALICE);
    let payment = pool.withdraw(ALICE, 301, unit_id, ALICE).unwrap();
    assert_eq!(payment.amount, 16 * ONE);
}

#[test]
fn test_payment_failure_rolls_back_unlock() {
    let mut pool = create_test_pool();
    let (_, validator_id) = create_shared_validator(&mut pool);
    pool.assign_escrow(MANAGER, 200, validator_id).unwrap();
    pool.receive_funds(MANAGER, 201, validator_id, 33 * ONE).unwrap();
    pool.payments_mut().fail_for(MAINTAINER);

    let result = pool.unlock_escrow(MANAGER, 202, validator_id);

    assert!(matches!(result, Err(StakePoolError::TransferFailed { .. })));
    let escrow = pool.escrow(&validator_id).unwrap();
    assert!(!escrow.is_unlocked());
    assert_eq!(escrow.balance, 33 * ONE);
    assert!(pool.events().filter_by_type(EventType::EscrowUnlocked).is_empty());
}

// ============ Transfers ============

#[test]
fn test_transfer_debt_is_additive() {
    let mut pool = create_test_pool_with_fee(2_000);
    let first = deposit(&mut pool, ALICE, 32 * ONE)[0].unit_id;
    let validator_id = register(&mut pool, first, 5);

    let settings = pool.settings().clone().with_maintainer_fee(4_999);
    pool.update_settings(ADMIN, 115, settings).unwrap();

    let second = deposit(&mut pool, BOB, 32 * ONE)[0].unit_id;
    let debt = pool.transfer_validator(OPERATOR, 120, validator_id, ONE, second).unwrap();
    assert_eq!(debt, (8 * ONE / 10, 2 * ONE / 10));

    let third = deposit(&mut pool, CAROL, 32 * ONE)[0].unit_id;
    pool.transfer_validator(OPERATOR, 130, validator_id, 2 * ONE, third).unwrap();

    let debt = pool.debt(&validator_id).unwrap();
    assert_eq!(debt.user_debt, 1_800_200_000_000_000_000);
    assert_eq!(debt.maintainer_debt, 1_199_800_000_000_000_000);
    assert_eq!(pool.validator(&validator_id).unwrap().owning_unit, third);
    assert_eq!(pool.entity_reward(&first).unwrap().amount, 8 * ONE / 10);
    assert!(pool.audit().is_empty());
}

#[test]
fn test_transfer_then_settle_pays_every_party() {
    let mut pool = create_test_pool_with_fee(2_000);
    let first = deposit(&mut pool, ALICE, 32 * ONE)[0].unit_id;
    let validator_id = register(&mut pool, first, 5);
    let second = deposit(&mut pool, BOB, 32 * ONE)[0].unit_id;
    pool.transfer_validator(OPERATOR, 120, validator_id, ONE, second).unwrap();

    let payments = settle(&mut pool, validator_id, 34 * ONE).unwrap();
    assert_eq!(
        payments,
        vec![
            Payment::new(MAINTAINER, ONE / 5, PaymentReason::MaintainerDebt),
            Payment::new(MAINTAINER, ONE / 5, PaymentReason::MaintainerReward),
        ]
    );

    let bob = pool.withdraw(BOB, 300, second, BOB).unwrap();
    let alice = pool.withdraw(ALICE, 300, first, ALICE).unwrap();

    assert_eq!(bob, Payment::new(BOB, 32 * ONE + 8 * ONE / 10, PaymentReason::Withdrawal));
    assert_eq!(alice, Payment::new(ALICE, 32 * ONE + 8 * ONE / 10, PaymentReason::TransferWithdrawal));
    assert_eq!(pool.state().transfers.balance(), 0);
    assert!(pool.escrow(&validator_id).unwrap().is_drained());
    assert_eq!(pool.payments().total_to(&MAINTAINER), 2 * ONE / 5);
    assert!(pool.audit().is_empty());
}

// ============ Administration ============

#[test]
fn test_pause_checked_before_anything_else() {
    let mut pool = create_test_pool();
    assert!(pool.pause(ADMIN, 5, PausableContract::DepositPool).unwrap());
    assert!(!pool.pause(ADMIN, 6, PausableContract::DepositPool).unwrap());

    // Zero amount would be rejected too, the pause wins
    let err = pool.deposit(ALICE, 10, OWNER, ALICE, 0).unwrap_err();
    assert_eq!(err, StakePoolError::OperationDisabled { contract: PausableContract::DepositPool });

    pool.pause(ADMIN, 7, PausableContract::ValidatorRegistry).unwrap();
    let err = pool
        .register_validator(ALICE, 11, &create_registration_request([0u8; 32], 5))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationDisabled);

    assert!(pool.unpause(ADMIN, 12, PausableContract::DepositPool).unwrap());
    assert!(pool.deposit(ALICE, 13, OWNER, ALICE, ONE).is_ok());
}

#[test]
fn test_admin_operations_require_admin() {
    let mut pool = create_test_pool();

    let err = pool.pause(OPERATOR, 5, PausableContract::Settlement).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let err = pool.grant_role(ALICE, 5, ALICE, Role::Admin).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let settings = pool.settings().clone().with_maintainer_fee(10_000);
    assert!(matches!(
        pool.update_settings(ADMIN, 5, settings),
        Err(StakePoolError::InvalidSettings { .. })
    ));

    pool.revoke_role(ADMIN, 6, OPERATOR, Role::Operator).unwrap();
    let unit_id = deposit(&mut pool, ALICE, 32 * ONE)[0].unit_id;
    let err = pool
        .register_validator(OPERATOR, 110, &create_registration_request(unit_id, 5))
        .unwrap_err();
    assert_eq!(err, StakePoolError::PermissionDenied { caller: OPERATOR, required: Role::Operator });
}

// ============ Encoded Actions ============

#[test]
fn test_encoded_actions_dispatch() {
    let mut pool = create_test_pool();
    let envelope = ActionEnvelope::new(
        ALICE,
        100,
        PoolAction::Deposit { owner: OWNER, recipient: ALICE, amount: 5 * ONE },
    );

    let outcome = pool.apply_encoded(&envelope.to_cbor().unwrap()).unwrap();

    match outcome {
        ActionOutcome::Allocations(allocations) => {
            assert_eq!(allocations.len(), 1);
            assert_eq!(allocations[0].amount, 5 * ONE);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(pool.events().filter_by_type(EventType::DepositAdded).len(), 1);

    let pause = ActionEnvelope::new(ALICE, 101, PoolAction::Pause { contract: PausableContract::Settlement });
    let err = pool.apply_encoded(&pause.to_cbor().unwrap()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
}

#[test]
fn test_malformed_action_changes_nothing() {
    let mut pool = create_test_pool();
    let events_before = pool.events().len();

    let err = pool.apply_encoded(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap_err();

    assert_eq!(err, StakePoolError::MalformedAction);
    assert_eq!(err.kind(), ErrorKind::ExternalFailure);
    assert_eq!(pool.events().len(), events_before);
    assert_eq!(pool.state(), &PoolState::default());
}
