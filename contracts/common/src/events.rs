//! Ledger Events for StakePool
//!
//! Events are emitted during every state transition and can be indexed
//! off-chain. Together they carry enough fields to rebuild units, deposit
//! records, debts and escrows from the log alone.

use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::access_control::Role;
use crate::emergency::PausableContract;
use crate::types::{Address, Amount, UnitId, UserId, ValidatorId};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Deposit Pool Events (0x01 - 0x1F)
    UnitOpened = 0x01,
    WithdrawalKeyBound = 0x02,
    DepositAdded = 0x03,
    DepositCanceled = 0x04,
    UnitFilled = 0x05,

    // Registry Events (0x20 - 0x3F)
    ValidatorRegistered = 0x20,
    ValidatorTransferred = 0x21,

    // Settlement Events (0x40 - 0x5F)
    EscrowAssigned = 0x40,
    EscrowFunded = 0x41,
    DebtResolved = 0x42,
    EscrowUnlocked = 0x43,
    MaintainerPaid = 0x44,
    UserWithdrawn = 0x45,

    // Admin Events (0x80 - 0x9F)
    ContractPaused = 0x80,
    ContractUnpaused = 0x81,
    RoleGranted = 0x82,
    RoleRevoked = 0x83,
    SettingsUpdated = 0x84,
}

/// Main event enum containing all ledger events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum StakePoolEvent {
    // ============ Deposit Pool Events ============

    /// Emitted when an owner contract opens a new unit
    UnitOpened {
        unit_id: UnitId,
        owner: Address,
        sequence: u64,
        block_height: u64,
    },

    /// Emitted when a private unit is bound to its withdrawal key
    WithdrawalKeyBound {
        unit_id: UnitId,
        withdrawal_key: Vec<u8>,
        withdrawal_credentials: [u8; 32],
        block_height: u64,
    },

    /// Emitted for every unit a deposit is applied to
    DepositAdded {
        unit_id: UnitId,
        user_id: UserId,
        sender: Address,
        recipient: Address,
        amount: Amount,
        unit_collected: Amount,
        block_height: u64,
    },

    /// Emitted when a deposit is canceled and refunded
    DepositCanceled {
        unit_id: UnitId,
        user_id: UserId,
        sender: Address,
        recipient: Address,
        amount: Amount,
        unit_collected: Amount,
        block_height: u64,
    },

    /// Emitted when a unit reaches the funding target
    UnitFilled {
        unit_id: UnitId,
        collected: Amount,
        block_height: u64,
    },

    // ============ Registry Events ============

    /// Emitted when a validator is registered for a full unit
    ValidatorRegistered {
        validator_id: ValidatorId,
        unit_id: UnitId,
        pubkey: Vec<u8>,
        funding_amount: Amount,
        maintainer_fee_bps: u64,
        withdrawal_credentials: [u8; 32],
        block_height: u64,
    },

    /// Emitted when a validator's reward stream moves to another unit
    ValidatorTransferred {
        validator_id: ValidatorId,
        prev_unit_id: UnitId,
        new_unit_id: UnitId,
        reported_reward: Amount,
        user_debt: Amount,
        maintainer_debt: Amount,
        new_maintainer_fee_bps: u64,
        block_height: u64,
    },

    // ============ Settlement Events ============

    /// Emitted when an escrow is assigned to a validator
    EscrowAssigned {
        validator_id: ValidatorId,
        escrow: Address,
        block_height: u64,
    },

    /// Emitted when settlement funds arrive at an escrow
    EscrowFunded {
        validator_id: ValidatorId,
        amount: Amount,
        balance: Amount,
        block_height: u64,
    },

    /// Emitted when a validator's transfer debt is resolved
    DebtResolved {
        validator_id: ValidatorId,
        user_debt_paid: Amount,
        maintainer_debt_paid: Amount,
        block_height: u64,
    },

    /// Emitted when an escrow is unlocked for withdrawals
    EscrowUnlocked {
        validator_id: ValidatorId,
        balance: Amount,
        principal: Amount,
        user_reward: Amount,
        maintainer_reward: Amount,
        penalty_ratio: Option<u128>,
        block_height: u64,
    },

    /// Emitted when the maintainer is paid
    MaintainerPaid {
        validator_id: ValidatorId,
        maintainer: Address,
        amount: Amount,
        block_height: u64,
    },

    /// Emitted when a depositor withdraws
    UserWithdrawn {
        unit_id: UnitId,
        user_id: UserId,
        sender: Address,
        recipient: Address,
        deposit_amount: Amount,
        reward_amount: Amount,
        block_height: u64,
    },

    // ============ Admin Events ============

    /// Emitted when a contract is paused
    ContractPaused {
        contract: PausableContract,
        by: Address,
        block_height: u64,
    },

    /// Emitted when a contract is unpaused
    ContractUnpaused {
        contract: PausableContract,
        by: Address,
        block_height: u64,
    },

    /// Emitted when a role is granted
    RoleGranted {
        account: Address,
        role: Role,
        by: Address,
        block_height: u64,
    },

    /// Emitted when a role is revoked
    RoleRevoked {
        account: Address,
        role: Role,
        by: Address,
        block_height: u64,
    },

    /// Emitted when settings are replaced
    SettingsUpdated {
        validator_deposit: Amount,
        min_deposit_unit: Amount,
        maintainer_fee_bps: u64,
        maintainer: Address,
        by: Address,
        block_height: u64,
    },
}

impl StakePoolEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::UnitOpened { .. } => EventType::UnitOpened,
            Self::WithdrawalKeyBound { .. } => EventType::WithdrawalKeyBound,
            Self::DepositAdded { .. } => EventType::DepositAdded,
            Self::DepositCanceled { .. } => EventType::DepositCanceled,
            Self::UnitFilled { .. } => EventType::UnitFilled,
            Self::ValidatorRegistered { .. } => EventType::ValidatorRegistered,
            Self::ValidatorTransferred { .. } => EventType::ValidatorTransferred,
            Self::EscrowAssigned { .. } => EventType::EscrowAssigned,
            Self::EscrowFunded { .. } => EventType::EscrowFunded,
            Self::DebtResolved { .. } => EventType::DebtResolved,
            Self::EscrowUnlocked { .. } => EventType::EscrowUnlocked,
            Self::MaintainerPaid { .. } => EventType::MaintainerPaid,
            Self::UserWithdrawn { .. } => EventType::UserWithdrawn,
            Self::ContractPaused { .. } => EventType::ContractPaused,
            Self::ContractUnpaused { .. } => EventType::ContractUnpaused,
            Self::RoleGranted { .. } => EventType::RoleGranted,
            Self::RoleRevoked { .. } => EventType::RoleRevoked,
            Self::SettingsUpdated { .. } => EventType::SettingsUpdated,
        }
    }

    /// Get the block height when event occurred
    pub fn block_height(&self) -> u64 {
        match self {
            Self::UnitOpened { block_height, .. }
            | Self::WithdrawalKeyBound { block_height, .. }
            | Self::DepositAdded { block_height, .. }
            | Self::DepositCanceled { block_height, .. }
            | Self::UnitFilled { block_height, .. }
            | Self::ValidatorRegistered { block_height, .. }
            | Self::ValidatorTransferred { block_height, .. }
            | Self::EscrowAssigned { block_height, .. }
            | Self::EscrowFunded { block_height, .. }
            | Self::DebtResolved { block_height, .. }
            | Self::EscrowUnlocked { block_height, .. }
            | Self::MaintainerPaid { block_height, .. }
            | Self::UserWithdrawn { block_height, .. }
            | Self::ContractPaused { block_height, .. }
            | Self::ContractUnpaused { block_height, .. }
            | Self::RoleGranted { block_height, .. }
            | Self::RoleRevoked { block_height, .. }
            | Self::SettingsUpdated { block_height, .. } => *block_height,
        }
    }

    /// Serialize event to bytes for storage/transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log for collecting events during execution
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<StakePoolEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: StakePoolEvent) {
        self.events.push(event);
    }

    /// Move every event of `other` to the end of this log
    pub fn append(&mut self, other: &mut EventLog) {
        self.events.append(&mut other.events);
    }

    /// Get all events
    pub fn events(&self) -> &[StakePoolEvent] {
        &self.events
    }

    /// Take ownership of all events
    pub fn into_events(self) -> Vec<StakePoolEvent> {
        self.events
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&StakePoolEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Check if any events were emitted
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
