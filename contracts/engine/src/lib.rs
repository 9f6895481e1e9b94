//! StakePool Engine
//!
//! Transactional façade over the ledger components. Every entry point runs
//! as one atomic call:
//!
//! 1. The ledger state is snapshotted.
//! 2. The component operation runs against a fresh [`CallContext`].
//! 3. On failure the snapshot is restored and buffered events are dropped.
//! 4. On success the ledger is committed first, then the registration
//!    deposit and the payment batch are handed to the collaborators.
//! 5. If a collaborator fails, the snapshot is restored and the error is
//!    returned; the events of the call are only kept once it commits.
//!
//! Calls are serialized through `&mut self`, so no two state transitions
//! ever interleave.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use stakepool_common::{
    validation::require_role, Address, Allocation, Amount, CallContext, DepositData, Debt,
    EntityReward, EventLog, PausableContract, PauseRegistry, Payment, PaymentSink,
    RegistrationLedger, Role, RoleRegistry, Settings, StakePoolEvent, StakeResult, Unit, UnitId,
    Validator, ValidatorId,
};
use stakepool_deposit_pool::{lane_of, DepositPool};
use stakepool_settlement::{Escrow, SettlementEngine};
use stakepool_validator_registry::{RegistrationRequest, TransferDebtLedger, ValidatorRegistry};

pub mod actions;
pub mod audit;
pub mod collaborators;

#[cfg(test)]
mod integration_tests;

pub use actions::{ActionEnvelope, ActionOutcome, PoolAction};
pub use audit::{InvariantType, InvariantViolation, LedgerReplay};
pub use collaborators::{InMemoryPayments, InMemoryRegistrations};

// ============ Ledger State ============

/// All ledger components
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PoolState {
    /// Units and deposit records
    pub deposits: DepositPool,
    /// Registered validators
    pub registry: ValidatorRegistry,
    /// Transfer debts and prior-unit claims
    pub transfers: TransferDebtLedger,
    /// Escrows and withdrawal flags
    pub settlement: SettlementEngine,
}

/// Interactions requested by an operation
#[derive(Debug, Default)]
struct Effects {
    payments: Vec<Payment>,
    registration: Option<DepositData>,
}

impl Effects {
    fn none() -> Self {
        Self::default()
    }

    fn pay(payment: Payment) -> Self {
        Self { payments: vec![payment], registration: None }
    }

    fn pay_all(payments: Vec<Payment>) -> Self {
        Self { payments, registration: None }
    }

    fn register(deposit: DepositData) -> Self {
        Self { payments: Vec::new(), registration: Some(deposit) }
    }
}

// ============ Engine ============

/// Staking pool ledger with its collaborators
pub struct StakePool<P: PaymentSink, R: RegistrationLedger> {
    state: PoolState,
    settings: Settings,
    roles: RoleRegistry,
    pauses: PauseRegistry,
    events: EventLog,
    payments: P,
    registration: R,
}

impl<P: PaymentSink, R: RegistrationLedger> StakePool<P, R> {
    /// Create an empty ledger administered by `admin`
    pub fn new(settings: Settings, admin: Address, payments: P, registration: R) -> StakeResult<Self> {
        settings.validate()?;
        Ok(Self {
            state: PoolState::default(),
            settings,
            roles: RoleRegistry::new(admin),
            pauses: PauseRegistry::new(),
            events: EventLog::new(),
            payments,
            registration,
        })
    }

    // ============ Deposits ============

    /// Deposit `amount` into `owner`'s units on behalf of `recipient`
    pub fn deposit(
        &mut self,
        caller: Address,
        block_height: u64,
        owner: Address,
        recipient: Address,
        amount: Amount,
    ) -> StakeResult<Vec<Allocation>> {
        self.execute(caller, block_height, |state, ctx| {
            let allocations = state.deposits.deposit(ctx, owner, recipient, amount)?;
            Ok((allocations, Effects::none()))
        })
    }

    /// Deposit into units bound to `withdrawal_key`
    pub fn deposit_private(
        &mut self,
        caller: Address,
        block_height: u64,
        owner: Address,
        recipient: Address,
        withdrawal_key: &[u8],
        amount: Amount,
    ) -> StakeResult<Vec<Allocation>> {
        self.execute(caller, block_height, |state, ctx| {
            let allocations =
                state
                    .deposits
                    .deposit_private(ctx, owner, recipient, withdrawal_key, amount)?;
            Ok((allocations, Effects::none()))
        })
    }

    /// Cancel part of the caller's deposit and refund it to `recipient`
    pub fn cancel_deposit(
        &mut self,
        caller: Address,
        block_height: u64,
        unit_id: UnitId,
        recipient: Address,
        amount: Amount,
    ) -> StakeResult<Payment> {
        self.execute(caller, block_height, |state, ctx| {
            let payment = state.deposits.cancel(ctx, unit_id, recipient, amount)?;
            Ok((payment.clone(), Effects::pay(payment)))
        })
    }

    // ============ Validators ============

    /// Register a validator and forward its deposit
    pub fn register_validator(
        &mut self,
        caller: Address,
        block_height: u64,
        request: &RegistrationRequest,
    ) -> StakeResult<ValidatorId> {
        self.execute(caller, block_height, |state, ctx| {
            let deposit = state.registry.register(ctx, &mut state.deposits, request)?;
            Ok((deposit.validator_id, Effects::register(deposit)))
        })
    }

    /// Move a validator to `new_unit_id`, returning `(user_debt, maintainer_debt)`
    pub fn transfer_validator(
        &mut self,
        caller: Address,
        block_height: u64,
        validator_id: ValidatorId,
        reported_reward: Amount,
        new_unit_id: UnitId,
    ) -> StakeResult<(Amount, Amount)> {
        self.execute(caller, block_height, |state, ctx| {
            let debt = state.transfers.transfer(
                ctx,
                &mut state.registry,
                &mut state.deposits,
                validator_id,
                reported_reward,
                new_unit_id,
            )?;
            Ok((debt, Effects::none()))
        })
    }

    // ============ Settlement ============

    /// Assign an escrow to a validator about to exit
    pub fn assign_escrow(
        &mut self,
        caller: Address,
        block_height: u64,
        validator_id: ValidatorId,
    ) -> StakeResult<Address> {
        self.execute(caller, block_height, |state, ctx| {
            let address = state
                .settlement
                .assign_escrow(ctx, &mut state.registry, validator_id)?;
            Ok((address, Effects::none()))
        })
    }

    /// Credit funds arriving at a validator's escrow
    pub fn receive_funds(
        &mut self,
        caller: Address,
        block_height: u64,
        validator_id: ValidatorId,
        amount: Amount,
    ) -> StakeResult<Amount> {
        self.execute(caller, block_height, |state, ctx| {
            let balance = state.settlement.receive_funds(ctx, validator_id, amount)?;
            Ok((balance, Effects::none()))
        })
    }

    /// Unlock an escrow, paying the maintainer's debt and reward
    pub fn unlock_escrow(
        &mut self,
        caller: Address,
        block_height: u64,
        validator_id: ValidatorId,
    ) -> StakeResult<Vec<Payment>> {
        self.execute(caller, block_height, |state, ctx| {
            let payments =
                state
                    .settlement
                    .unlock(ctx, &state.registry, &mut state.transfers, validator_id)?;
            Ok((payments.clone(), Effects::pay_all(payments)))
        })
    }

    /// Withdraw the caller's share of a unit to `recipient`
    pub fn withdraw(
        &mut self,
        caller: Address,
        block_height: u64,
        unit_id: UnitId,
        recipient: Address,
    ) -> StakeResult<Payment> {
        self.execute(caller, block_height, |state, ctx| {
            let payment = state.settlement.withdraw(
                ctx,
                &state.registry,
                &state.deposits,
                &mut state.transfers,
                unit_id,
                recipient,
            )?;
            Ok((payment.clone(), Effects::pay(payment)))
        })
    }

    // ============ Administration ============

    /// Grant `role` to `account` (admin only)
    pub fn grant_role(
        &mut self,
        caller: Address,
        block_height: u64,
        account: Address,
        role: Role,
    ) -> StakeResult<()> {
        self.roles.grant_role(&caller, account, role)?;
        self.events.emit(StakePoolEvent::RoleGranted { account, role, by: caller, block_height });
        Ok(())
    }

    /// Revoke `role` from `account` (admin only)
    pub fn revoke_role(
        &mut self,
        caller: Address,
        block_height: u64,
        account: Address,
        role: Role,
    ) -> StakeResult<()> {
        self.roles.revoke_role(&caller, &account, role)?;
        self.events.emit(StakePoolEvent::RoleRevoked { account, role, by: caller, block_height });
        Ok(())
    }

    /// Pause a contract, returning whether the flag changed
    pub fn pause(
        &mut self,
        caller: Address,
        block_height: u64,
        contract: PausableContract,
    ) -> StakeResult<bool> {
        require_role(&self.roles, &caller, Role::Admin)?;
        let changed = self.pauses.pause(contract);
        if changed {
            self.events.emit(StakePoolEvent::ContractPaused { contract, by: caller, block_height });
        }
        Ok(changed)
    }

    /// Unpause a contract, returning whether the flag changed
    pub fn unpause(
        &mut self,
        caller: Address,
        block_height: u64,
        contract: PausableContract,
    ) -> StakeResult<bool> {
        require_role(&self.roles, &caller, Role::Admin)?;
        let changed = self.pauses.unpause(contract);
        if changed {
            self.events.emit(StakePoolEvent::ContractUnpaused { contract, by: caller, block_height });
        }
        Ok(changed)
    }

    /// Replace the settings; records created earlier keep their snapshots
    pub fn update_settings(
        &mut self,
        caller: Address,
        block_height: u64,
        settings: Settings,
    ) -> StakeResult<()> {
        require_role(&self.roles, &caller, Role::Admin)?;
        settings.validate()?;

        self.events.emit(StakePoolEvent::SettingsUpdated {
            validator_deposit: settings.validator_deposit,
            min_deposit_unit: settings.min_deposit_unit,
            maintainer_fee_bps: settings.maintainer_fee_bps,
            maintainer: settings.maintainer,
            by: caller,
            block_height,
        });
        self.settings = settings;
        Ok(())
    }

    // ============ Actions ============

    /// Execute a decoded action
    pub fn dispatch(&mut self, envelope: &ActionEnvelope) -> StakeResult<ActionOutcome> {
        let caller = envelope.caller;
        let block = envelope.block_height;

        match &envelope.action {
            PoolAction::Deposit { owner, recipient, amount } => self
                .deposit(caller, block, *owner, *recipient, *amount)
                .map(ActionOutcome::Allocations),
            PoolAction::DepositPrivate { owner, recipient, withdrawal_key, amount } => self
                .deposit_private(caller, block, *owner, *recipient, withdrawal_key, *amount)
                .map(ActionOutcome::Allocations),
            PoolAction::CancelDeposit { unit_id, recipient, amount } => self
                .cancel_deposit(caller, block, *unit_id, *recipient, *amount)
                .map(ActionOutcome::Payment),
            PoolAction::RegisterValidator(request) => self
                .register_validator(caller, block, request)
                .map(ActionOutcome::Registered),
            PoolAction::TransferValidator { validator_id, reported_reward, new_unit_id } => self
                .transfer_validator(caller, block, *validator_id, *reported_reward, *new_unit_id)
                .map(|(user_debt, maintainer_debt)| ActionOutcome::Transferred {
                    user_debt,
                    maintainer_debt,
                }),
            PoolAction::AssignEscrow { validator_id } => self
                .assign_escrow(caller, block, *validator_id)
                .map(ActionOutcome::EscrowAssigned),
            PoolAction::ReceiveFunds { validator_id, amount } => self
                .receive_funds(caller, block, *validator_id, *amount)
                .map(ActionOutcome::Balance),
            PoolAction::UnlockEscrow { validator_id } => self
                .unlock_escrow(caller, block, *validator_id)
                .map(ActionOutcome::Payments),
            PoolAction::Withdraw { unit_id, recipient } => self
                .withdraw(caller, block, *unit_id, *recipient)
                .map(ActionOutcome::Payment),
            PoolAction::GrantRole { account, role } => self
                .grant_role(caller, block, *account, *role)
                .map(|_| ActionOutcome::Done),
            PoolAction::RevokeRole { account, role } => self
                .revoke_role(caller, block, *account, *role)
                .map(|_| ActionOutcome::Done),
            PoolAction::Pause { contract } => {
                self.pause(caller, block, *contract).map(ActionOutcome::Toggled)
            }
            PoolAction::Unpause { contract } => {
                self.unpause(caller, block, *contract).map(ActionOutcome::Toggled)
            }
            PoolAction::UpdateSettings(settings) => self
                .update_settings(caller, block, settings.clone())
                .map(|_| ActionOutcome::Done),
        }
    }

    /// Decode a CBOR envelope and execute it
    pub fn apply_encoded(&mut self, bytes: &[u8]) -> StakeResult<ActionOutcome> {
        let envelope = ActionEnvelope::from_cbor(bytes)?;
        self.dispatch(&envelope)
    }

    // ============ Queries ============

    /// Ledger state
    pub fn state(&self) -> &PoolState {
        &self.state
    }

    /// Current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Role assignments
    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    /// Pause flags
    pub fn pauses(&self) -> &PauseRegistry {
        &self.pauses
    }

    /// Events of every committed call
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Look up a unit
    pub fn unit(&self, unit_id: &UnitId) -> Option<&Unit> {
        self.state.deposits.unit(unit_id)
    }

    /// Unit of `owner` currently accepting deposits made with
    /// `withdrawal_key`, or public deposits when `None`
    pub fn current_unit(&self, owner: &Address, withdrawal_key: Option<&[u8]>) -> Option<&Unit> {
        self.state.deposits.allocator.current_unit(
            owner,
            lane_of(withdrawal_key),
            self.settings.validator_deposit,
        )
    }

    /// Live deposit of `(unit, sender, recipient)`
    pub fn deposit_of(&self, unit_id: &UnitId, sender: &Address, recipient: &Address) -> Amount {
        self.state.deposits.deposit_of(unit_id, sender, recipient)
    }

    /// Look up a validator
    pub fn validator(&self, validator_id: &ValidatorId) -> Option<&Validator> {
        self.state.registry.validator(validator_id)
    }

    /// Transfer debt of a validator
    pub fn debt(&self, validator_id: &ValidatorId) -> Option<&Debt> {
        self.state.transfers.debt(validator_id)
    }

    /// Reward attributed to a unit the validator was transferred away from
    pub fn entity_reward(&self, unit_id: &UnitId) -> Option<&EntityReward> {
        self.state.transfers.entity_reward(unit_id)
    }

    /// Escrow of a validator
    pub fn escrow(&self, validator_id: &ValidatorId) -> Option<&Escrow> {
        self.state.settlement.escrow(validator_id)
    }

    /// Frozen penalty ratio of a validator's escrow
    pub fn penalty_ratio(&self, validator_id: &ValidatorId) -> StakeResult<Option<u128>> {
        self.state.settlement.penalty_ratio(validator_id)
    }

    /// Replay the committed events against the live ledger
    pub fn audit(&self) -> Vec<InvariantViolation> {
        audit::audit(&self.state, self.events.events())
    }

    /// Payment collaborator
    pub fn payments(&self) -> &P {
        &self.payments
    }

    /// Mutable payment collaborator
    pub fn payments_mut(&mut self) -> &mut P {
        &mut self.payments
    }

    /// Registration collaborator
    pub fn registration(&self) -> &R {
        &self.registration
    }

    /// Mutable registration collaborator
    pub fn registration_mut(&mut self) -> &mut R {
        &mut self.registration
    }

    // ============ Execution ============

    fn execute<T>(
        &mut self,
        caller: Address,
        block_height: u64,
        op: impl FnOnce(&mut PoolState, &mut CallContext) -> StakeResult<(T, Effects)>,
    ) -> StakeResult<T> {
        // 1. Snapshot for rollback
        let snapshot = self.state.clone();

        // 2. Run the operation against a fresh context
        let mut ctx = CallContext::new(caller, block_height, &self.settings, &self.roles, &self.pauses);
        let result = op(&mut self.state, &mut ctx);
        let mut events = ctx.into_events();

        let (value, effects) = match result {
            Ok(done) => done,
            Err(err) => {
                self.state = snapshot;
                return Err(err);
            }
        };

        // 3. Interactions after the ledger is updated
        if let Err(err) = self.interact(effects) {
            self.state = snapshot;
            return Err(err);
        }

        // 4. Commit events
        self.events.append(&mut events);
        Ok(value)
    }

    fn interact(&mut self, effects: Effects) -> StakeResult<()> {
        if let Some(deposit) = &effects.registration {
            self.registration.deposit(deposit)?;
        }

        let batch: Vec<Payment> = effects
            .payments
            .into_iter()
            .filter(|payment| payment.amount > 0)
            .collect();
        if !batch.is_empty() {
            self.payments.execute(&batch)?;
        }
        Ok(())
    }
}
