//! Core Types for StakePool
//!
//! This module defines the ledger records shared by every StakePool crate.

use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Type alias for addresses (32-byte account identifier)
pub type Address = [u8; 32];

/// Type alias for unit identifiers
pub type UnitId = [u8; 32];

/// Type alias for depositor identities `(unit, sender, recipient)`
pub type UserId = [u8; 32];

/// Type alias for validator identifiers
pub type ValidatorId = [u8; 32];

/// Amounts in wei
pub type Amount = u128;

// ============ Unit Types ============

/// An owning-entity funding bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Unit {
    /// Unique identifier derived from `(owner, sequence)`
    pub id: UnitId,
    /// Owner contract that collects deposits into this unit
    pub owner: Address,
    /// Position in the owner's unit sequence (starts at 1)
    pub sequence: u64,
    /// Sum of live deposits (zeroed once a validator is registered)
    pub collected: Amount,
    /// Amount moved out of the unit when it was finalized
    pub staked_amount: Amount,
    /// BLS withdrawal key bound to a private unit
    pub withdrawal_key: Option<Vec<u8>>,
    /// Withdrawal credentials derived from `withdrawal_key`
    pub withdrawal_credentials: Option<[u8; 32]>,
    /// Validator this unit funded or took over
    pub validator: Option<ValidatorId>,
    /// Block height when the unit was opened
    pub created_at: u64,
    /// Block height when the unit was finalized
    pub finalized_at: Option<u64>,
}

impl Unit {
    /// Creates an empty unit
    pub fn new(id: UnitId, owner: Address, sequence: u64, block_height: u64) -> Self {
        Self {
            id,
            owner,
            sequence,
            collected: 0,
            staked_amount: 0,
            withdrawal_key: None,
            withdrawal_credentials: None,
            validator: None,
            created_at: block_height,
            finalized_at: None,
        }
    }

    /// Returns true once a validator is registered for (or transferred to) this unit
    pub fn is_finalized(&self) -> bool {
        self.validator.is_some()
    }

    /// Returns true if the unit is bound to a single withdrawal key
    pub fn is_private(&self) -> bool {
        self.withdrawal_key.is_some()
    }

    /// Returns true if the unit holds exactly the funding target
    pub fn is_full(&self, target: Amount) -> bool {
        !self.is_finalized() && self.collected == target
    }

    /// Amount still needed to reach the funding target
    pub fn remaining(&self, target: Amount) -> Amount {
        target.saturating_sub(self.collected)
    }
}

/// Portion of a deposit applied to one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Allocation {
    /// Unit receiving the amount
    pub unit_id: UnitId,
    /// Sequence number of that unit
    pub sequence: u64,
    /// Amount applied to the unit
    pub amount: Amount,
}

// ============ Deposit Types ============

/// Live contribution of one `(unit, sender, recipient)` identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct DepositRecord {
    /// Derived user identity
    pub user_id: UserId,
    /// Unit the contribution belongs to
    pub unit_id: UnitId,
    /// Account that sent the funds
    pub sender: Address,
    /// Account entitled to refunds and payouts
    pub recipient: Address,
    /// Current live amount
    pub amount: Amount,
}

// ============ Validator Types ============

/// Registered validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Validator {
    /// Identifier derived from the public key
    pub id: ValidatorId,
    /// BLS public key
    pub pubkey: Vec<u8>,
    /// Funding target at registration time
    pub funding_amount: Amount,
    /// Maintainer fee at registration or last transfer (basis points)
    pub maintainer_fee_bps: u64,
    /// Unit currently owning the reward stream
    pub owning_unit: UnitId,
    /// Escrow account, assigned when the validator prepares to exit
    pub escrow: Option<Address>,
    /// Block height of registration
    pub registered_at: u64,
}

/// Deposit message forwarded to the external registration ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct DepositData {
    /// Validator being registered
    pub validator_id: ValidatorId,
    /// BLS public key
    pub pubkey: Vec<u8>,
    /// Withdrawal credentials
    pub withdrawal_credentials: [u8; 32],
    /// Value attached to the deposit
    pub amount: Amount,
    /// BLS signature over the deposit message
    pub signature: Vec<u8>,
    /// SSZ root of the deposit data
    pub deposit_data_root: [u8; 32],
}

// ============ Transfer Types ============

/// Reward owed to units a validator was transferred away from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Debt {
    /// Accumulated depositor share of pre-transfer rewards
    pub user_debt: Amount,
    /// Accumulated maintainer share of pre-transfer rewards
    pub maintainer_debt: Amount,
    /// One-way flag set by settlement
    pub resolved: bool,
    /// User debt actually covered at resolution
    pub paid_user_debt: Amount,
    /// Maintainer debt actually covered at resolution
    pub paid_maintainer_debt: Amount,
}

impl Debt {
    /// Total outstanding amount
    pub fn total(&self) -> Amount {
        self.user_debt.saturating_add(self.maintainer_debt)
    }
}

/// User debt attributed to a specific prior unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct EntityReward {
    /// Validator the reward was earned by
    pub validator_id: ValidatorId,
    /// User debt recorded by the transfer away from this unit
    pub amount: Amount,
}

// ============ Payment Types ============

/// Why value leaves the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum PaymentReason {
    /// Deposit cancellation refund
    Cancellation,
    /// Maintainer share of a transfer debt
    MaintainerDebt,
    /// Maintainer share of settled rewards
    MaintainerReward,
    /// Depositor payout from an unlocked escrow
    Withdrawal,
    /// Depositor payout from a unit the validator was transferred away from
    TransferWithdrawal,
}

/// Outbound push-payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Payment {
    /// Receiving account
    pub to: Address,
    /// Amount sent
    pub amount: Amount,
    /// Payment purpose
    pub reason: PaymentReason,
}

impl Payment {
    /// Creates a payment
    pub fn new(to: Address, amount: Amount, reason: PaymentReason) -> Self {
        Self { to, amount, reason }
    }
}
