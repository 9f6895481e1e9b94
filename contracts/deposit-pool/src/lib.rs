//! Deposit Pool Contract
//!
//! Collects arbitrary-sized deposits into fixed-size validator funding
//! units and keeps the per-depositor records those units are made of.
//!
//! ## Flow
//!
//! ```text
//! deposit(owner, recipient, amount)
//!   └─ UnitAllocator::add_to_unit  -> [(unit, amount), ...]
//!        └─ DepositLedger::record_contribution per touched unit
//! cancel(unit, recipient, amount)
//!   └─ DepositLedger::cancel_contribution -> refund Payment
//! ```
//!
//! Deposits and cancellations are gated by the `DepositPool` pause flag,
//! which is checked before anything else.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use stakepool_common::{
    validation::require_valid_address, Address, Allocation, Amount, CallContext, PausableContract,
    Payment, StakeResult, Unit, UnitId, ValidatorId,
};

pub mod allocator;
pub mod ledger;

pub use allocator::{lane_of, Lane, UnitAllocator};
pub use ledger::DepositLedger;

// ============ Deposit Pool ============

/// Units together with the records they are made of
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct DepositPool {
    /// Unit arena and per-lane cursors
    pub allocator: UnitAllocator,
    /// Per-identity contributions
    pub ledger: DepositLedger,
}

impl DepositPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Deposit the caller's funds into the owner contract's units
    pub fn deposit(
        &mut self,
        ctx: &mut CallContext,
        owner: Address,
        recipient: Address,
        amount: Amount,
    ) -> StakeResult<Vec<Allocation>> {
        self.deposit_with_key(ctx, owner, recipient, amount, None)
    }

    /// Deposit into units bound to a single BLS withdrawal key
    pub fn deposit_private(
        &mut self,
        ctx: &mut CallContext,
        owner: Address,
        recipient: Address,
        withdrawal_key: &[u8],
        amount: Amount,
    ) -> StakeResult<Vec<Allocation>> {
        self.deposit_with_key(ctx, owner, recipient, amount, Some(withdrawal_key))
    }

    /// Cancel the caller's deposit to a unit that is still collecting
    pub fn cancel(
        &mut self,
        ctx: &mut CallContext,
        unit_id: UnitId,
        recipient: Address,
        amount: Amount,
    ) -> StakeResult<Payment> {
        ctx.require_not_paused(PausableContract::DepositPool)?;
        self.ledger
            .cancel_contribution(ctx, &mut self.allocator, unit_id, recipient, amount)
    }

    /// Lock a full unit to its validator
    pub fn finalize_unit(
        &mut self,
        unit_id: &UnitId,
        validator_id: ValidatorId,
        block_height: u64,
    ) -> StakeResult<Amount> {
        self.allocator.finalize(unit_id, validator_id, block_height)
    }

    // ============ Queries ============

    /// Look up a unit
    pub fn unit(&self, unit_id: &UnitId) -> Option<&Unit> {
        self.allocator.unit(unit_id)
    }

    /// Live contribution of `(unit, sender, recipient)`
    pub fn deposit_of(&self, unit_id: &UnitId, sender: &Address, recipient: &Address) -> Amount {
        self.ledger.amount_of(unit_id, sender, recipient)
    }

    fn deposit_with_key(
        &mut self,
        ctx: &mut CallContext,
        owner: Address,
        recipient: Address,
        amount: Amount,
        withdrawal_key: Option<&[u8]>,
    ) -> StakeResult<Vec<Allocation>> {
        // 1. Pause check first
        ctx.require_not_paused(PausableContract::DepositPool)?;

        // 2. Addresses must be set
        require_valid_address(&owner, "owner")?;
        require_valid_address(&recipient, "recipient")?;

        // 3. Split across units
        let allocations = self.allocator.add_to_unit(ctx, owner, amount, withdrawal_key)?;

        // 4. Record each slice against the caller
        let sender = ctx.caller;
        for allocation in &allocations {
            let unit_collected = self.allocator.require_unit(&allocation.unit_id)?.collected;
            self.ledger.record_contribution(
                ctx,
                allocation.unit_id,
                sender,
                recipient,
                allocation.amount,
                unit_collected,
            )?;
        }

        Ok(allocations)
    }
}
