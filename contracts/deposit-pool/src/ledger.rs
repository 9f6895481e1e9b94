//! Deposit Ledger
//!
//! Per-depositor bookkeeping. A record is keyed by the `(unit, sender,
//! recipient)` identity and holds the live contribution of that identity
//! to the unit. Records of finalized units are frozen: settlement reads
//! them to compute payouts.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use stakepool_common::{
    ids, math, validation::require_positive, Address, Amount, BTreeMap, CallContext, DepositRecord,
    Payment, PaymentReason, StakePoolError, StakePoolEvent, StakeResult, UnitId, UserId,
};

use crate::allocator::UnitAllocator;

/// Live deposit records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct DepositLedger {
    /// Records by user identity
    records: BTreeMap<UserId, DepositRecord>,
}

impl DepositLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a record
    pub fn record(&self, user_id: &UserId) -> Option<&DepositRecord> {
        self.records.get(user_id)
    }

    /// Live amount of an identity (0 if none)
    pub fn amount_of(&self, unit_id: &UnitId, sender: &Address, recipient: &Address) -> Amount {
        self.records
            .get(&ids::user_id(unit_id, sender, recipient))
            .map(|record| record.amount)
            .unwrap_or(0)
    }

    /// All records in user-id order
    pub fn records(&self) -> impl Iterator<Item = &DepositRecord> {
        self.records.values()
    }

    /// Records belonging to one unit
    pub fn records_for_unit<'a>(&'a self, unit_id: &'a UnitId) -> impl Iterator<Item = &'a DepositRecord> + 'a {
        self.records.values().filter(move |record| &record.unit_id == unit_id)
    }

    /// Add to an identity's contribution
    ///
    /// `unit_collected` is the unit total after the contribution, carried
    /// into the event for replay.
    pub fn record_contribution(
        &mut self,
        ctx: &mut CallContext,
        unit_id: UnitId,
        sender: Address,
        recipient: Address,
        amount: Amount,
        unit_collected: Amount,
    ) -> StakeResult<UserId> {
        require_positive(amount)?;

        let user_id = ids::user_id(&unit_id, &sender, &recipient);
        let record = self.records.entry(user_id).or_insert(DepositRecord {
            user_id,
            unit_id,
            sender,
            recipient,
            amount: 0,
        });
        record.amount = math::add(record.amount, amount)?;

        ctx.emit(StakePoolEvent::DepositAdded {
            unit_id,
            user_id,
            sender,
            recipient,
            amount,
            unit_collected,
            block_height: ctx.block_height,
        });

        Ok(user_id)
    }

    /// Cancel part or all of the caller's contribution to a unit
    ///
    /// The caller is the sender of the deposit. Returns the refund to push
    /// to the recipient; the ledger is already updated when it returns.
    pub fn cancel_contribution(
        &mut self,
        ctx: &mut CallContext,
        allocator: &mut UnitAllocator,
        unit_id: UnitId,
        recipient: Address,
        requested: Amount,
    ) -> StakeResult<Payment> {
        let sender = ctx.caller;

        // 1. Requested amount must be positive
        require_positive(requested)?;

        // 2. Unit must exist and still be collecting
        let unit = allocator.require_unit(&unit_id)?;
        if unit.is_finalized() {
            return Err(StakePoolError::UnitFinalized { unit_id });
        }
        if !allocator.is_collecting(unit) {
            return Err(StakePoolError::UnitNotCollecting { unit_id });
        }

        // 3. Identity must hold a live record
        let user_id = ids::user_id(&unit_id, &sender, &recipient);
        let available = self
            .records
            .get(&user_id)
            .map(|record| record.amount)
            .filter(|amount| *amount > 0)
            .ok_or(StakePoolError::NoSuchDeposit { user_id })?;

        // 4. Cannot cancel more than the live amount
        if requested > available {
            return Err(StakePoolError::ExceedsBalance { available, requested });
        }

        // 5. Must cancel to zero or leave at least one granularity unit
        let remaining = available - requested;
        let minimum = ctx.settings.min_deposit_unit;
        if remaining != 0 && remaining < minimum {
            return Err(StakePoolError::BelowMinimalUnit { remaining, minimum });
        }

        // 6. Effects: record, then unit total
        if remaining == 0 {
            self.records.remove(&user_id);
        } else if let Some(record) = self.records.get_mut(&user_id) {
            record.amount = remaining;
        }
        let unit_collected = allocator.release(&unit_id, requested)?;

        ctx.emit(StakePoolEvent::DepositCanceled {
            unit_id,
            user_id,
            sender,
            recipient,
            amount: requested,
            unit_collected,
            block_height: ctx.block_height,
        });

        Ok(Payment::new(recipient, requested, PaymentReason::Cancellation))
    }
}
