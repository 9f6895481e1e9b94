//! Transfer Debt Ledger
//!
//! Moves a validator's future reward stream from its owning unit to a new,
//! fully funded unit. The reward accrued so far (as reported by the
//! operator) is split with the validator's fee snapshot and recorded as a
//! debt owed to the previous unit, payable once the validator settles.
//!
//! The depositors of the previous unit are bought out by the new unit's
//! funds: their principal is claimable right after the transfer, their
//! reward share once the debt is resolved.
//!
//! `reported_reward` is taken as authoritative from the operator. Nothing
//! here checks it against the rewards actually accrued on the network.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use stakepool_common::{
    ids, math,
    validation::require_valid_address,
    Address, Amount, BTreeMap, BTreeSet, CallContext, Debt, EntityReward, PausableContract,
    Payment, PaymentReason, Role, StakePoolError, StakePoolEvent, StakeResult, UnitId, UserId,
    ValidatorId,
};
use stakepool_deposit_pool::DepositPool;

use crate::registry::ValidatorRegistry;

/// Debt actually paid at resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct DebtResolution {
    /// Paid toward previous units' depositors
    pub user_debt_paid: Amount,
    /// Paid to the maintainer
    pub maintainer_debt_paid: Amount,
}

impl DebtResolution {
    /// Total paid out of the escrow
    pub fn total(&self) -> Amount {
        self.user_debt_paid.saturating_add(self.maintainer_debt_paid)
    }
}

/// Debts, per-unit reward attribution and prior-unit claims
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TransferDebtLedger {
    /// Accumulated debt per validator
    debts: BTreeMap<ValidatorId, Debt>,
    /// User debt attributed to each unit a validator left
    entity_rewards: BTreeMap<UnitId, EntityReward>,
    /// Identities whose prior-unit principal was paid
    deposit_claims: BTreeSet<UserId>,
    /// Identities whose prior-unit reward was paid
    reward_claims: BTreeSet<UserId>,
    /// Funds held for prior-unit claims
    balance: Amount,
}

impl TransferDebtLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    // ============ Queries ============

    /// Debt owed by a validator
    pub fn debt(&self, validator_id: &ValidatorId) -> Option<&Debt> {
        self.debts.get(validator_id)
    }

    /// Reward attributed to a unit a validator was transferred away from
    pub fn entity_reward(&self, unit_id: &UnitId) -> Option<&EntityReward> {
        self.entity_rewards.get(unit_id)
    }

    /// Funds held for prior-unit claims
    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Whether an identity already took its prior-unit principal
    pub fn deposit_claimed(&self, user_id: &UserId) -> bool {
        self.deposit_claims.contains(user_id)
    }

    /// Whether an identity already took its prior-unit reward
    pub fn reward_claimed(&self, user_id: &UserId) -> bool {
        self.reward_claims.contains(user_id)
    }

    // ============ Transfer ============

    /// Transfer a validator to a new unit
    ///
    /// Returns the `(user_debt, maintainer_debt)` recorded by this transfer.
    pub fn transfer(
        &mut self,
        ctx: &mut CallContext,
        registry: &mut ValidatorRegistry,
        pool: &mut DepositPool,
        validator_id: ValidatorId,
        reported_reward: Amount,
        new_unit_id: UnitId,
    ) -> StakeResult<(Amount, Amount)> {
        // 1. Pause check first
        ctx.require_not_paused(PausableContract::ValidatorTransfers)?;

        // 2. Only operators transfer
        ctx.require_role(Role::Operator)?;

        // 3. Validator must exist and not be preparing to exit
        let validator = registry.require_validator(&validator_id)?;
        if validator.escrow.is_some() {
            return Err(StakePoolError::WalletAlreadyAssigned { validator_id });
        }
        let prev_unit_id = validator.owning_unit;
        let fee_snapshot = validator.maintainer_fee_bps;
        let funding_amount = validator.funding_amount;

        // 4. Destination must be a public unit holding exactly the funding amount
        let new_unit = pool.allocator.require_unit(&new_unit_id)?;
        if new_unit.is_finalized() {
            return Err(StakePoolError::UnitFinalized { unit_id: new_unit_id });
        }
        if new_unit.is_private() {
            return Err(StakePoolError::PrivateUnitTransfer { unit_id: new_unit_id });
        }
        if new_unit.collected != funding_amount {
            return Err(StakePoolError::AmountMismatch {
                expected: funding_amount,
                actual: new_unit.collected,
            });
        }

        // 5. Previous unit must have been staked for its owner's duration
        let prev_unit = pool.allocator.require_unit(&prev_unit_id)?;
        let staked_since = prev_unit.finalized_at.unwrap_or(prev_unit.created_at);
        let allowed_at = staked_since.saturating_add(ctx.settings.staking_duration(&prev_unit.owner));
        if ctx.block_height < allowed_at {
            return Err(StakePoolError::TransferNotAllowed { unit_id: prev_unit_id, allowed_at });
        }

        // 6. Split with the fee in effect since the last registration/transfer
        let (user_debt, maintainer_debt) = math::split_reward(reported_reward, fee_snapshot)?;

        // 7. Accumulate the debt and attribute this share to the previous unit
        let debt = self.debts.entry(validator_id).or_default();
        debt.user_debt = math::add(debt.user_debt, user_debt)?;
        debt.maintainer_debt = math::add(debt.maintainer_debt, maintainer_debt)?;
        self.entity_rewards.insert(
            prev_unit_id,
            EntityReward { validator_id, amount: user_debt },
        );

        // 8. The new unit's funds buy out the previous depositors
        let staked = pool.finalize_unit(&new_unit_id, validator_id, ctx.block_height)?;
        self.balance = math::add(self.balance, staked)?;

        // 9. Repoint the validator with the current fee
        let new_fee = ctx.settings.maintainer_fee_bps;
        registry.update(ctx, &validator_id, new_unit_id, new_fee)?;

        ctx.emit(StakePoolEvent::ValidatorTransferred {
            validator_id,
            prev_unit_id,
            new_unit_id,
            reported_reward,
            user_debt,
            maintainer_debt,
            new_maintainer_fee_bps: new_fee,
            block_height: ctx.block_height,
        });

        Ok((user_debt, maintainer_debt))
    }

    // ============ Resolution ============

    /// Resolve a validator's debt out of `available` escrow funds
    ///
    /// Returns `None` if the validator has no debt. When `available` does
    /// not cover the total, both parts are clipped proportionally. The
    /// user part stays in this ledger for prior-unit claims.
    pub fn resolve(
        &mut self,
        validator_id: &ValidatorId,
        available: Amount,
    ) -> StakeResult<Option<DebtResolution>> {
        let debt = match self.debts.get_mut(validator_id) {
            Some(debt) => debt,
            None => return Ok(None),
        };
        if debt.resolved {
            return Err(StakePoolError::DebtAlreadyResolved { validator_id: *validator_id });
        }

        let total = debt.total();
        let (user_paid, maintainer_paid) = if total <= available {
            (debt.user_debt, debt.maintainer_debt)
        } else {
            (
                math::mul_div(debt.user_debt, available, total)?,
                math::mul_div(debt.maintainer_debt, available, total)?,
            )
        };

        debt.resolved = true;
        debt.paid_user_debt = user_paid;
        debt.paid_maintainer_debt = maintainer_paid;
        self.balance = math::add(self.balance, user_paid)?;

        Ok(Some(DebtResolution {
            user_debt_paid: user_paid,
            maintainer_debt_paid: maintainer_paid,
        }))
    }

    // ============ Prior-Unit Claims ============

    /// Withdraw from a unit the validator was transferred away from
    ///
    /// The caller is the sender of the deposit. Principal and reward are
    /// tracked independently, so a depositor can take the principal right
    /// after the transfer and come back for the reward after settlement.
    pub fn withdraw_transferred(
        &mut self,
        ctx: &mut CallContext,
        registry: &ValidatorRegistry,
        pool: &DepositPool,
        unit_id: UnitId,
        recipient: Address,
    ) -> StakeResult<Payment> {
        let sender = ctx.caller;

        // 1. Pause check first
        ctx.require_not_paused(PausableContract::ValidatorTransfers)?;
        require_valid_address(&recipient, "recipient")?;

        // 2. Unit must have been transferred away from
        let unit = pool.allocator.require_unit(&unit_id)?;
        let validator_id = unit
            .validator
            .ok_or(StakePoolError::UnitNotRegistered { unit_id })?;
        let validator = registry.require_validator(&validator_id)?;
        if validator.owning_unit == unit_id {
            return Err(StakePoolError::InvalidInput {
                param: "unit_id",
                reason: "unit still owns its validator",
            });
        }

        // 3. Identity must have funded the unit
        let user_id = ids::user_id(&unit_id, &sender, &recipient);
        let contribution = pool
            .ledger
            .record(&user_id)
            .map(|record| record.amount)
            .filter(|amount| *amount > 0)
            .ok_or(StakePoolError::NoSuchDeposit { user_id })?;

        // 4. Principal, once
        let deposit_amount = if self.deposit_claims.contains(&user_id) { 0 } else { contribution };

        // 5. Reward share, once, after the debt is resolved
        let reward_due = self.reward_ready(&unit_id) && !self.reward_claims.contains(&user_id);
        if deposit_amount == 0 && !reward_due {
            return Err(StakePoolError::NothingToWithdraw { user_id });
        }
        let reward_amount = if reward_due {
            self.reward_share(&unit_id, contribution, unit.staked_amount)?
        } else {
            0
        };

        // 6. Effects before the payment leaves
        self.deposit_claims.insert(user_id);
        if reward_due {
            self.reward_claims.insert(user_id);
        }
        let total = math::add(deposit_amount, reward_amount)?;
        self.balance = math::sub(self.balance, total)?;

        ctx.emit(StakePoolEvent::UserWithdrawn {
            unit_id,
            user_id,
            sender,
            recipient,
            deposit_amount,
            reward_amount,
            block_height: ctx.block_height,
        });

        Ok(Payment::new(recipient, total, PaymentReason::TransferWithdrawal))
    }

    fn reward_ready(&self, unit_id: &UnitId) -> bool {
        self.entity_rewards
            .get(unit_id)
            .and_then(|entity| self.debts.get(&entity.validator_id))
            .map(|debt| debt.resolved)
            .unwrap_or(false)
    }

    /// Prior-unit reward of a contribution, scaled down if the debt was clipped
    fn reward_share(&self, unit_id: &UnitId, contribution: Amount, unit_funding: Amount) -> StakeResult<Amount> {
        let entity = match self.entity_rewards.get(unit_id) {
            Some(entity) => entity,
            None => return Ok(0),
        };
        let debt = match self.debts.get(&entity.validator_id) {
            Some(debt) => debt,
            None => return Ok(0),
        };

        let share = math::mul_div(entity.amount, contribution, unit_funding)?;
        if debt.paid_user_debt >= debt.user_debt {
            return Ok(share);
        }
        math::mul_div(share, debt.paid_user_debt, debt.user_debt)
    }
}
