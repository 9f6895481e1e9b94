//! Settlement Contract
//!
//! Splits a validator's returned balance once it exits.
//!
//! ## Unlock Order
//!
//! 1. Outstanding transfer debt is resolved first (clipped if the escrow
//!    cannot cover it); the maintainer part is paid out, the user part
//!    moves to the transfer ledger for the previous units' depositors.
//! 2. What is left is compared with the validator's funding amount:
//!    - above: the profit is split with the validator's maintainer fee
//!    - below: a penalty ratio `left / funding` is frozen
//! 3. Depositors of the owning unit withdraw `contribution` (or the
//!    penalized contribution) plus their pro-rata share of the user reward.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use stakepool_common::{
    ids, math,
    validation::{require_positive, require_valid_address},
    Address, Amount, BTreeMap, BTreeSet, CallContext, PausableContract, Payment, PaymentReason,
    Penalty, Role, StakePoolError, StakePoolEvent, StakeResult, UnitId, UserId, ValidatorId,
};
use stakepool_deposit_pool::DepositPool;
use stakepool_validator_registry::{TransferDebtLedger, ValidatorRegistry};

pub mod escrow;

pub use escrow::{Escrow, EscrowState};

// ============ Settlement Engine ============

/// Escrows and depositor withdrawal flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct SettlementEngine {
    /// Escrow per validator
    escrows: BTreeMap<ValidatorId, Escrow>,
    /// Identities already paid from an escrow
    withdrawals: BTreeSet<UserId>,
}

impl SettlementEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    // ============ Queries ============

    /// Look up a validator's escrow
    pub fn escrow(&self, validator_id: &ValidatorId) -> Option<&Escrow> {
        self.escrows.get(validator_id)
    }

    /// All escrows in validator-id order
    pub fn escrows(&self) -> impl Iterator<Item = &Escrow> {
        self.escrows.values()
    }

    /// Penalty ratio frozen at unlock, in `PENALTY_SCALE` fixed point
    pub fn penalty_ratio(&self, validator_id: &ValidatorId) -> StakeResult<Option<u128>> {
        match self.escrows.get(validator_id).and_then(|escrow| escrow.penalty) {
            Some(penalty) => penalty.ratio().map(Some),
            None => Ok(None),
        }
    }

    /// Whether an identity was already paid from its unit's escrow
    pub fn has_withdrawn(&self, user_id: &UserId) -> bool {
        self.withdrawals.contains(user_id)
    }

    // ============ Escrow Lifecycle ============

    /// Prepare a validator for exit by giving it an escrow account
    ///
    /// Once assigned, the validator can no longer be transferred.
    pub fn assign_escrow(
        &mut self,
        ctx: &mut CallContext,
        registry: &mut ValidatorRegistry,
        validator_id: ValidatorId,
    ) -> StakeResult<Address> {
        // 1. Pause check first
        ctx.require_not_paused(PausableContract::Settlement)?;

        // 2. Only managers assign escrows
        ctx.require_role(Role::Manager)?;

        // 3. One escrow per validator
        let address = ids::escrow_address(&validator_id);
        registry.set_escrow(&validator_id, address)?;
        self.escrows
            .insert(validator_id, Escrow::new(validator_id, address, ctx.block_height));

        ctx.emit(StakePoolEvent::EscrowAssigned {
            validator_id,
            escrow: address,
            block_height: ctx.block_height,
        });

        Ok(address)
    }

    /// Credit settlement funds arriving at a locked escrow
    pub fn receive_funds(
        &mut self,
        ctx: &mut CallContext,
        validator_id: ValidatorId,
        amount: Amount,
    ) -> StakeResult<Amount> {
        let escrow = self
            .escrows
            .get_mut(&validator_id)
            .ok_or(StakePoolError::EscrowNotAssigned { validator_id })?;
        if escrow.is_unlocked() {
            return Err(StakePoolError::AlreadyUnlocked { validator_id });
        }
        require_positive(amount)?;

        escrow.balance = math::add(escrow.balance, amount)?;

        ctx.emit(StakePoolEvent::EscrowFunded {
            validator_id,
            amount,
            balance: escrow.balance,
            block_height: ctx.block_height,
        });

        Ok(escrow.balance)
    }

    /// Freeze the split of an escrow and enable withdrawals
    ///
    /// Returns the maintainer payments to push.
    pub fn unlock(
        &mut self,
        ctx: &mut CallContext,
        registry: &ValidatorRegistry,
        transfers: &mut TransferDebtLedger,
        validator_id: ValidatorId,
    ) -> StakeResult<Vec<Payment>> {
        // 1. Pause check first
        ctx.require_not_paused(PausableContract::Settlement)?;

        // 2. Only managers unlock
        ctx.require_role(Role::Manager)?;

        // 3. Escrow must be locked and funded
        let validator = registry.require_validator(&validator_id)?;
        let escrow = self
            .escrows
            .get_mut(&validator_id)
            .ok_or(StakePoolError::EscrowNotAssigned { validator_id })?;
        if escrow.is_unlocked() {
            return Err(StakePoolError::AlreadyUnlocked { validator_id });
        }
        if escrow.balance == 0 {
            return Err(StakePoolError::EmptyWallet { validator_id });
        }

        let maintainer = ctx.settings.maintainer;
        let initial_balance = escrow.balance;
        let mut payments = Vec::new();

        escrow.state = EscrowState::Unlocked;
        escrow.unlocked_at = Some(ctx.block_height);

        // 4. Resolve transfer debt before anything else is split
        if let Some(resolution) = transfers.resolve(&validator_id, escrow.balance)? {
            escrow.debt_paid = resolution.total();
            escrow.balance = math::sub(escrow.balance, resolution.total())?;
            if resolution.maintainer_debt_paid > 0 {
                payments.push(Payment::new(
                    maintainer,
                    resolution.maintainer_debt_paid,
                    PaymentReason::MaintainerDebt,
                ));
            }

            ctx.emit(StakePoolEvent::DebtResolved {
                validator_id,
                user_debt_paid: resolution.user_debt_paid,
                maintainer_debt_paid: resolution.maintainer_debt_paid,
                block_height: ctx.block_height,
            });
        }

        // 5. Split what is left against the funding amount
        let funding = validator.funding_amount;
        let left = escrow.balance;
        if left > funding {
            let profit = left - funding;
            let maintainer_reward = math::bps_share(profit, validator.maintainer_fee_bps)?;
            escrow.principal = funding;
            escrow.maintainer_reward = maintainer_reward;
            escrow.user_reward = math::sub(profit, maintainer_reward)?;
            escrow.balance = math::sub(escrow.balance, maintainer_reward)?;
        } else {
            escrow.principal = left;
            escrow.penalty = Penalty::from_balance(left, funding);
        }

        let penalty_ratio = match escrow.penalty {
            Some(penalty) => Some(penalty.ratio()?),
            None => None,
        };

        ctx.emit(StakePoolEvent::EscrowUnlocked {
            validator_id,
            balance: initial_balance,
            principal: escrow.principal,
            user_reward: escrow.user_reward,
            maintainer_reward: escrow.maintainer_reward,
            penalty_ratio,
            block_height: ctx.block_height,
        });

        if escrow.maintainer_reward > 0 {
            payments.push(Payment::new(
                maintainer,
                escrow.maintainer_reward,
                PaymentReason::MaintainerReward,
            ));
            ctx.emit(StakePoolEvent::MaintainerPaid {
                validator_id,
                maintainer,
                amount: escrow.maintainer_reward,
                block_height: ctx.block_height,
            });
        }

        Ok(payments)
    }

    // ============ Withdrawals ============

    /// Withdraw the caller's share of a unit
    ///
    /// Units a validator was transferred away from are paid by the transfer
    /// ledger; units still owning their validator are paid from its escrow.
    pub fn withdraw(
        &mut self,
        ctx: &mut CallContext,
        registry: &ValidatorRegistry,
        pool: &DepositPool,
        transfers: &mut TransferDebtLedger,
        unit_id: UnitId,
        recipient: Address,
    ) -> StakeResult<Payment> {
        let transferred_away = pool
            .unit(&unit_id)
            .and_then(|unit| unit.validator)
            .and_then(|validator_id| registry.validator(&validator_id))
            .map(|validator| validator.owning_unit != unit_id)
            .unwrap_or(false);
        if transferred_away {
            return transfers.withdraw_transferred(ctx, registry, pool, unit_id, recipient);
        }

        self.withdraw_from_escrow(ctx, registry, pool, unit_id, recipient)
    }

    fn withdraw_from_escrow(
        &mut self,
        ctx: &mut CallContext,
        registry: &ValidatorRegistry,
        pool: &DepositPool,
        unit_id: UnitId,
        recipient: Address,
    ) -> StakeResult<Payment> {
        let sender = ctx.caller;

        // 1. Pause check first
        ctx.require_not_paused(PausableContract::Settlement)?;
        require_valid_address(&recipient, "recipient")?;

        // 2. Unit must have a validator with an unlocked escrow
        let unit = pool
            .unit(&unit_id)
            .ok_or(StakePoolError::UnitNotFound { unit_id })?;
        let validator_id = unit
            .validator
            .ok_or(StakePoolError::UnitNotRegistered { unit_id })?;
        let validator = registry.require_validator(&validator_id)?;
        let escrow = self
            .escrows
            .get_mut(&validator_id)
            .filter(|escrow| escrow.is_unlocked())
            .ok_or(StakePoolError::NotUnlocked { validator_id })?;

        // 3. Identity must have funded the unit
        let user_id = ids::user_id(&unit_id, &sender, &recipient);
        let contribution = pool
            .ledger
            .record(&user_id)
            .map(|record| record.amount)
            .filter(|amount| *amount > 0)
            .ok_or(StakePoolError::NoSuchDeposit { user_id })?;

        // 4. Once per identity
        if self.withdrawals.contains(&user_id) {
            return Err(StakePoolError::NothingToWithdraw { user_id });
        }

        // 5. Principal (penalized if short) plus pro-rata reward
        let deposit_amount = match escrow.penalty {
            Some(penalty) => penalty.apply(contribution)?,
            None => contribution,
        };
        let reward_amount = math::mul_div(escrow.user_reward, contribution, validator.funding_amount)?;
        let total = math::add(deposit_amount, reward_amount)?;

        // 6. Effects before the payment leaves
        escrow.balance = math::sub(escrow.balance, total)?;
        self.withdrawals.insert(user_id);

        ctx.emit(StakePoolEvent::UserWithdrawn {
            unit_id,
            user_id,
            sender,
            recipient,
            deposit_amount,
            reward_amount,
            block_height: ctx.block_height,
        });

        Ok(Payment::new(recipient, total, PaymentReason::Withdrawal))
    }
}
