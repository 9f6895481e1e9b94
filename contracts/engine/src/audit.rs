//! Ledger Audit
//!
//! Rebuilds unit totals, deposit records and transfer debts from an event
//! log and checks them, together with the conservation law, against the
//! live ledger.

use stakepool_common::{Amount, BTreeMap, BTreeSet, StakePoolEvent, UnitId, UserId, ValidatorId};

use crate::PoolState;

// ============================================================================
// Types
// ============================================================================

/// Types of ledger invariants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantType {
    /// Collected amount of an open unit equals the sum of its records
    DepositConservation,
    /// Replayed unit total equals the live one
    UnitReplay,
    /// Replayed record amount equals the live one
    RecordReplay,
    /// Replayed user debt equals the live one
    UserDebtReplay,
    /// Replayed maintainer debt equals the live one
    MaintainerDebtReplay,
}

/// Invariant violation found by an audit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Invariant violated
    pub invariant: InvariantType,
    /// Unit, user or validator the violation is about
    pub subject: [u8; 32],
    /// Expected value
    pub expected: Amount,
    /// Actual value
    pub actual: Amount,
}

/// Ledger state rebuilt from events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerReplay {
    /// Collected amount per unit
    pub units: BTreeMap<UnitId, Amount>,
    /// Units locked to a validator
    pub finalized: BTreeSet<UnitId>,
    /// Live amount per user identity
    pub records: BTreeMap<UserId, Amount>,
    /// `(user_debt, maintainer_debt)` per validator
    pub debts: BTreeMap<ValidatorId, (Amount, Amount)>,
}

// ============================================================================
// Replay
// ============================================================================

/// Rebuild ledger state from events in emission order
pub fn replay<'a>(events: impl IntoIterator<Item = &'a StakePoolEvent>) -> LedgerReplay {
    let mut replay = LedgerReplay::default();

    for event in events {
        match event {
            StakePoolEvent::UnitOpened { unit_id, .. } => {
                replay.units.insert(*unit_id, 0);
            }
            StakePoolEvent::DepositAdded { unit_id, user_id, amount, unit_collected, .. } => {
                replay.units.insert(*unit_id, *unit_collected);
                let record = replay.records.entry(*user_id).or_insert(0);
                *record = record.saturating_add(*amount);
            }
            StakePoolEvent::DepositCanceled { unit_id, user_id, amount, unit_collected, .. } => {
                replay.units.insert(*unit_id, *unit_collected);
                let left = replay
                    .records
                    .get(user_id)
                    .copied()
                    .unwrap_or(0)
                    .saturating_sub(*amount);
                if left == 0 {
                    replay.records.remove(user_id);
                } else {
                    replay.records.insert(*user_id, left);
                }
            }
            StakePoolEvent::ValidatorRegistered { unit_id, .. } => {
                replay.units.insert(*unit_id, 0);
                replay.finalized.insert(*unit_id);
            }
            StakePoolEvent::ValidatorTransferred {
                validator_id,
                new_unit_id,
                user_debt,
                maintainer_debt,
                ..
            } => {
                replay.units.insert(*new_unit_id, 0);
                replay.finalized.insert(*new_unit_id);
                let debt = replay.debts.entry(*validator_id).or_insert((0, 0));
                debt.0 = debt.0.saturating_add(*user_debt);
                debt.1 = debt.1.saturating_add(*maintainer_debt);
            }
            _ => {}
        }
    }

    replay
}

// ============================================================================
// Checks
// ============================================================================

/// Check that every open unit holds exactly the sum of its live records
pub fn check_conservation(state: &PoolState) -> Vec<InvariantViolation> {
    let mut sums: BTreeMap<UnitId, Amount> = BTreeMap::new();
    for record in state.deposits.ledger.records() {
        let sum = sums.entry(record.unit_id).or_insert(0);
        *sum = sum.saturating_add(record.amount);
    }

    state
        .deposits
        .allocator
        .units()
        .filter(|unit| !unit.is_finalized())
        .filter_map(|unit| {
            let deposits = sums.get(&unit.id).copied().unwrap_or(0);
            (deposits != unit.collected).then_some(InvariantViolation {
                invariant: InvariantType::DepositConservation,
                subject: unit.id,
                expected: deposits,
                actual: unit.collected,
            })
        })
        .collect()
}

/// Replay `events` and compare the result with the live ledger
pub fn audit<'a>(
    state: &PoolState,
    events: impl IntoIterator<Item = &'a StakePoolEvent>,
) -> Vec<InvariantViolation> {
    let replayed = replay(events);
    let mut violations = check_conservation(state);

    for unit in state.deposits.allocator.units() {
        let expected = replayed.units.get(&unit.id).copied().unwrap_or(0);
        if expected != unit.collected {
            violations.push(InvariantViolation {
                invariant: InvariantType::UnitReplay,
                subject: unit.id,
                expected,
                actual: unit.collected,
            });
        }
    }

    let mut seen = BTreeSet::new();
    for record in state.deposits.ledger.records() {
        seen.insert(record.user_id);
        let expected = replayed.records.get(&record.user_id).copied().unwrap_or(0);
        if expected != record.amount {
            violations.push(InvariantViolation {
                invariant: InvariantType::RecordReplay,
                subject: record.user_id,
                expected,
                actual: record.amount,
            });
        }
    }
    for (user_id, amount) in replayed.records.iter().filter(|(id, _)| !seen.contains(*id)) {
        violations.push(InvariantViolation {
            invariant: InvariantType::RecordReplay,
            subject: *user_id,
            expected: *amount,
            actual: 0,
        });
    }

    for (validator_id, (user_debt, maintainer_debt)) in &replayed.debts {
        let live = state.transfers.debt(validator_id).cloned().unwrap_or_default();
        if live.user_debt != *user_debt {
            violations.push(InvariantViolation {
                invariant: InvariantType::UserDebtReplay,
                subject: *validator_id,
                expected: *user_debt,
                actual: live.user_debt,
            });
        }
        if live.maintainer_debt != *maintainer_debt {
            violations.push(InvariantViolation {
                invariant: InvariantType::MaintainerDebtReplay,
                subject: *validator_id,
                expected: *maintainer_debt,
                actual: live.maintainer_debt,
            });
        }
    }

    violations
}
