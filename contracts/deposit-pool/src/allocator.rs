//! Unit Allocator
//!
//! Decides which unit an incoming deposit lands in. Units of an owner
//! contract form an arena indexed by a monotonic sequence number. Each
//! owner keeps one collecting unit per lane: the public lane, plus one
//! lane per withdrawal key for private deposits. A lane's cursor only
//! moves forward, and only the unit under a cursor ever changes its
//! collected amount, so every unit left behind is full or finalized.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use stakepool_common::{
    ids,
    math,
    validation::{require_bls_pubkey, require_deposit_amount},
    Address, Allocation, Amount, BTreeMap, CallContext, StakePoolError, StakePoolEvent, StakeResult,
    Unit, UnitId, ValidatorId,
};

/// Deposit lane of an owner: `None` for public deposits, otherwise the
/// withdrawal credentials of the key private units are bound to
pub type Lane = Option<[u8; 32]>;

/// Units and the per-lane cursors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct UnitAllocator {
    /// All units ever opened, by id
    units: BTreeMap<UnitId, Unit>,
    /// Latest sequence number opened per owner contract
    latest_sequences: BTreeMap<Address, u64>,
    /// Unit collecting deposits per `(owner, lane)`
    cursors: BTreeMap<(Address, Lane), UnitId>,
}

/// Lane a deposit with `withdrawal_key` goes to
pub fn lane_of(withdrawal_key: Option<&[u8]>) -> Lane {
    withdrawal_key.map(ids::withdrawal_credentials)
}

impl UnitAllocator {
    /// Create an empty allocator
    pub fn new() -> Self {
        Self::default()
    }

    // ============ Queries ============

    /// Look up a unit
    pub fn unit(&self, unit_id: &UnitId) -> Option<&Unit> {
        self.units.get(unit_id)
    }

    /// Look up a unit, failing with `UnitNotFound`
    pub fn require_unit(&self, unit_id: &UnitId) -> StakeResult<&Unit> {
        self.units
            .get(unit_id)
            .ok_or(StakePoolError::UnitNotFound { unit_id: *unit_id })
    }

    /// All units in id order
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Number of units opened by an owner contract
    pub fn latest_sequence(&self, owner: &Address) -> u64 {
        self.latest_sequences.get(owner).copied().unwrap_or(0)
    }

    /// The unit new deposits of `owner` in `lane` go to, if one is open
    pub fn current_unit(&self, owner: &Address, lane: Lane, target: Amount) -> Option<&Unit> {
        self.cursors
            .get(&(*owner, lane))
            .and_then(|unit_id| self.units.get(unit_id))
            .filter(|unit| !unit.is_finalized() && unit.remaining(target) > 0)
    }

    /// Check whether a unit is still under its lane's cursor
    ///
    /// A full unit stays collecting until the next deposit of its lane
    /// moves the cursor past it.
    pub fn is_collecting(&self, unit: &Unit) -> bool {
        !unit.is_finalized()
            && self.cursors.get(&(unit.owner, unit.withdrawal_credentials)) == Some(&unit.id)
    }

    // ============ Allocation ============

    /// Apply a deposit to the owner's units of the deposit's lane, opening
    /// new ones as they fill
    ///
    /// Returns one allocation per touched unit, in sequence order. Units
    /// opened for a private deposit are bound to `withdrawal_key`.
    pub fn add_to_unit(
        &mut self,
        ctx: &mut CallContext,
        owner: Address,
        amount: Amount,
        withdrawal_key: Option<&[u8]>,
    ) -> StakeResult<Vec<Allocation>> {
        require_deposit_amount(amount, ctx.settings)?;
        if let Some(key) = withdrawal_key {
            require_bls_pubkey(key, "withdrawal_key")?;
        }

        let target = ctx.settings.validator_deposit;
        let mut allocations = Vec::new();
        let mut left = amount;

        while left > 0 {
            let unit_id = self.current_or_open(ctx, owner, withdrawal_key)?;
            let unit = self
                .units
                .get_mut(&unit_id)
                .ok_or(StakePoolError::UnitNotFound { unit_id })?;

            let applied = left.min(unit.remaining(target));
            unit.collected = math::add(unit.collected, applied)?;
            left = math::sub(left, applied)?;

            allocations.push(Allocation { unit_id, sequence: unit.sequence, amount: applied });

            if unit.collected == target {
                ctx.emit(StakePoolEvent::UnitFilled {
                    unit_id,
                    collected: unit.collected,
                    block_height: ctx.block_height,
                });
            }
        }

        Ok(allocations)
    }

    /// Remove canceled funds from the unit collecting in its lane
    pub fn release(&mut self, unit_id: &UnitId, amount: Amount) -> StakeResult<Amount> {
        let unit = self.require_unit(unit_id)?;
        if unit.is_finalized() {
            return Err(StakePoolError::UnitFinalized { unit_id: *unit_id });
        }
        if !self.is_collecting(unit) {
            return Err(StakePoolError::UnitNotCollecting { unit_id: *unit_id });
        }

        let unit = self
            .units
            .get_mut(unit_id)
            .ok_or(StakePoolError::UnitNotFound { unit_id: *unit_id })?;
        unit.collected = math::sub(unit.collected, amount)?;
        Ok(unit.collected)
    }

    /// Lock a unit to a validator
    ///
    /// Moves the collected amount into `staked_amount`; the unit accepts no
    /// further deposits or cancellations afterwards.
    pub fn finalize(
        &mut self,
        unit_id: &UnitId,
        validator_id: ValidatorId,
        block_height: u64,
    ) -> StakeResult<Amount> {
        let unit = self
            .units
            .get_mut(unit_id)
            .ok_or(StakePoolError::UnitNotFound { unit_id: *unit_id })?;
        if unit.is_finalized() {
            return Err(StakePoolError::UnitFinalized { unit_id: *unit_id });
        }

        unit.validator = Some(validator_id);
        unit.staked_amount = unit.collected;
        unit.collected = 0;
        unit.finalized_at = Some(block_height);
        Ok(unit.staked_amount)
    }

    fn current_or_open(
        &mut self,
        ctx: &mut CallContext,
        owner: Address,
        withdrawal_key: Option<&[u8]>,
    ) -> StakeResult<UnitId> {
        let target = ctx.settings.validator_deposit;
        let lane = lane_of(withdrawal_key);
        if let Some(unit_id) = self.current_unit(&owner, lane, target).map(|unit| unit.id) {
            return Ok(unit_id);
        }

        let sequence = self
            .latest_sequence(&owner)
            .checked_add(1)
            .ok_or(StakePoolError::Overflow)?;
        let unit_id = ids::unit_id(&owner, sequence);

        let mut unit = Unit::new(unit_id, owner, sequence, ctx.block_height);
        unit.withdrawal_key = withdrawal_key.map(|key| key.to_vec());
        unit.withdrawal_credentials = lane;

        self.units.insert(unit_id, unit);
        self.latest_sequences.insert(owner, sequence);
        self.cursors.insert((owner, lane), unit_id);

        ctx.emit(StakePoolEvent::UnitOpened {
            unit_id,
            owner,
            sequence,
            block_height: ctx.block_height,
        });
        if let (Some(key), Some(credentials)) = (withdrawal_key, lane) {
            ctx.emit(StakePoolEvent::WithdrawalKeyBound {
                unit_id,
                withdrawal_key: key.to_vec(),
                withdrawal_credentials: credentials,
                block_height: ctx.block_height,
            });
        }

        Ok(unit_id)
    }
}
