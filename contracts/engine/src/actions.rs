//! Encoded Actions
//!
//! Every entry point of the ledger as a serializable action, wrapped in an
//! envelope carrying the caller and block height. Envelopes travel as CBOR.

use serde::{Deserialize, Serialize};

use stakepool_common::{
    Address, Allocation, Amount, PausableContract, Payment, Role, Settings, StakePoolError,
    StakeResult, UnitId, ValidatorId,
};
use stakepool_validator_registry::RegistrationRequest;

/// Ledger entry point with its arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolAction {
    // ============ Deposits ============
    Deposit {
        owner: Address,
        recipient: Address,
        amount: Amount,
    },
    DepositPrivate {
        owner: Address,
        recipient: Address,
        withdrawal_key: Vec<u8>,
        amount: Amount,
    },
    CancelDeposit {
        unit_id: UnitId,
        recipient: Address,
        amount: Amount,
    },

    // ============ Validators ============
    RegisterValidator(RegistrationRequest),
    TransferValidator {
        validator_id: ValidatorId,
        reported_reward: Amount,
        new_unit_id: UnitId,
    },

    // ============ Settlement ============
    AssignEscrow {
        validator_id: ValidatorId,
    },
    ReceiveFunds {
        validator_id: ValidatorId,
        amount: Amount,
    },
    UnlockEscrow {
        validator_id: ValidatorId,
    },
    Withdraw {
        unit_id: UnitId,
        recipient: Address,
    },

    // ============ Administration ============
    GrantRole {
        account: Address,
        role: Role,
    },
    RevokeRole {
        account: Address,
        role: Role,
    },
    Pause {
        contract: PausableContract,
    },
    Unpause {
        contract: PausableContract,
    },
    UpdateSettings(Settings),
}

/// Action together with who submits it and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    /// Account invoking the action
    pub caller: Address,
    /// Block height of execution
    pub block_height: u64,
    /// Action to execute
    pub action: PoolAction,
}

impl ActionEnvelope {
    /// Create an envelope
    pub fn new(caller: Address, block_height: u64, action: PoolAction) -> Self {
        Self { caller, block_height, action }
    }

    /// Encode as CBOR
    pub fn to_cbor(&self) -> StakeResult<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes).map_err(|_| StakePoolError::MalformedAction)?;
        Ok(bytes)
    }

    /// Decode from CBOR
    pub fn from_cbor(bytes: &[u8]) -> StakeResult<Self> {
        ciborium::de::from_reader(bytes).map_err(|_| StakePoolError::MalformedAction)
    }
}

/// Value returned by a dispatched action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// Units a deposit was applied to
    Allocations(Vec<Allocation>),
    /// Single payment pushed to a depositor
    Payment(Payment),
    /// Payments pushed at unlock
    Payments(Vec<Payment>),
    /// Newly registered validator
    Registered(ValidatorId),
    /// Debt recorded by a transfer
    Transferred {
        user_debt: Amount,
        maintainer_debt: Amount,
    },
    /// Assigned escrow address
    EscrowAssigned(Address),
    /// Escrow balance after funding
    Balance(Amount),
    /// Whether a pause flag changed
    Toggled(bool),
    /// Action without a return value
    Done,
}
