//! Error Types for StakePool
//!
//! Typed errors carrying the identifying fields of the rejected call.
//! Every error rejects the whole call; nothing is partially applied.

use core::fmt;

use crate::types::{Address, Amount, UnitId, UserId, ValidatorId};
use crate::emergency::PausableContract;
use crate::access_control::Role;

/// Result type alias for StakePool operations
pub type StakeResult<T> = Result<T, StakePoolError>;

/// Main error enum for all StakePool ledger errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakePoolError {
    // ============ Amount Errors ============
    /// Invalid amount provided
    InvalidAmount { amount: Amount, reason: AmountErrorReason },

    /// Cancellation exceeds the live deposit
    ExceedsBalance { available: Amount, requested: Amount },

    /// Cancellation would leave dust below the deposit granularity
    BelowMinimalUnit { remaining: Amount, minimum: Amount },

    /// Unit collected amount differs from the funding target
    InvalidFundingAmount { collected: Amount, required: Amount },

    /// Destination unit does not match the validator's funding amount
    AmountMismatch { expected: Amount, actual: Amount },

    // ============ Authorization Errors ============
    /// Caller lacks the required role
    PermissionDenied { caller: Address, required: Role },

    /// Contract is paused
    OperationDisabled { contract: PausableContract },

    // ============ Lookup Errors ============
    /// Unit not found
    UnitNotFound { unit_id: UnitId },

    /// Validator not found
    ValidatorNotFound { validator_id: ValidatorId },

    /// No live deposit for this user identity
    NoSuchDeposit { user_id: UserId },

    /// Unit has no registered validator
    UnitNotRegistered { unit_id: UnitId },

    /// Escrow has not been assigned to the validator
    EscrowNotAssigned { validator_id: ValidatorId },

    // ============ Finalization Errors ============
    /// Unit already has a registered validator
    UnitFinalized { unit_id: UnitId },

    /// Public key already used by another validator
    DuplicateKey { validator_id: ValidatorId },

    /// Escrow already assigned (validator is preparing to exit)
    WalletAlreadyAssigned { validator_id: ValidatorId },

    /// Escrow already unlocked
    AlreadyUnlocked { validator_id: ValidatorId },

    /// Debt already resolved
    DebtAlreadyResolved { validator_id: ValidatorId },

    // ============ Settlement Errors ============
    /// Escrow holds no funds
    EmptyWallet { validator_id: ValidatorId },

    /// Escrow is still locked
    NotUnlocked { validator_id: ValidatorId },

    /// Claim already exhausted
    NothingToWithdraw { user_id: UserId },

    // ============ State Errors ============
    /// Unit is no longer the one collecting deposits in its lane
    UnitNotCollecting { unit_id: UnitId },

    /// Transfers into single-withdrawal-key units are not allowed
    PrivateUnitTransfer { unit_id: UnitId },

    /// Staking duration of the current owning unit has not elapsed
    TransferNotAllowed { unit_id: UnitId, allowed_at: u64 },

    /// Invalid input parameter
    InvalidInput { param: &'static str, reason: &'static str },

    /// Settings failed validation
    InvalidSettings { reason: &'static str },

    // ============ External Errors ============
    /// Outbound value transfer failed
    TransferFailed { to: Address, amount: Amount },

    /// External registration ledger rejected the deposit
    RegistrationFailed { validator_id: ValidatorId },

    /// Encoded action could not be decoded
    MalformedAction,

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    Overflow,

    /// Arithmetic underflow occurred
    Underflow,

    /// Division by zero
    DivisionByZero,
}

/// Reasons for amount-related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountErrorReason {
    /// Amount is zero when non-zero required
    Zero,
    /// Amount exceeds maximum
    TooLarge,
    /// Amount is not a multiple of the deposit granularity
    NotMultiple,
}

/// Error classes callers can react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Zero, non-multiple or mismatched amount
    InvalidAmount,
    /// Caller lacks the required role
    PermissionDenied,
    /// Contract is paused
    OperationDisabled,
    /// Unknown unit, validator, deposit or escrow
    NotFound,
    /// Duplicate registration, unlock, resolution or key
    AlreadyFinalized,
    /// Claim already exhausted
    NothingToWithdraw,
    /// Ledger state does not allow the operation
    StateMismatch,
    /// Checked arithmetic failed
    Arithmetic,
    /// A collaborator outside the ledger failed
    ExternalFailure,
}

impl StakePoolError {
    /// Returns a human-readable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "E010_INVALID_AMOUNT",
            Self::ExceedsBalance { .. } => "E011_EXCEEDS_BALANCE",
            Self::BelowMinimalUnit { .. } => "E012_BELOW_MINIMAL_UNIT",
            Self::InvalidFundingAmount { .. } => "E013_INVALID_FUNDING",
            Self::AmountMismatch { .. } => "E014_AMOUNT_MISMATCH",
            Self::PermissionDenied { .. } => "E020_PERMISSION_DENIED",
            Self::OperationDisabled { .. } => "E021_OPERATION_DISABLED",
            Self::UnitNotFound { .. } => "E030_UNIT_NOT_FOUND",
            Self::ValidatorNotFound { .. } => "E031_VALIDATOR_NOT_FOUND",
            Self::NoSuchDeposit { .. } => "E032_NO_SUCH_DEPOSIT",
            Self::UnitNotRegistered { .. } => "E033_UNIT_NOT_REGISTERED",
            Self::EscrowNotAssigned { .. } => "E034_ESCROW_NOT_ASSIGNED",
            Self::UnitFinalized { .. } => "E040_UNIT_FINALIZED",
            Self::DuplicateKey { .. } => "E041_DUPLICATE_KEY",
            Self::WalletAlreadyAssigned { .. } => "E042_WALLET_ASSIGNED",
            Self::AlreadyUnlocked { .. } => "E043_ALREADY_UNLOCKED",
            Self::DebtAlreadyResolved { .. } => "E044_DEBT_RESOLVED",
            Self::EmptyWallet { .. } => "E050_EMPTY_WALLET",
            Self::NotUnlocked { .. } => "E051_NOT_UNLOCKED",
            Self::NothingToWithdraw { .. } => "E052_NOTHING_TO_WITHDRAW",
            Self::UnitNotCollecting { .. } => "E060_UNIT_NOT_COLLECTING",
            Self::PrivateUnitTransfer { .. } => "E061_PRIVATE_UNIT_TRANSFER",
            Self::TransferNotAllowed { .. } => "E062_TRANSFER_NOT_ALLOWED",
            Self::InvalidInput { .. } => "E063_INVALID_INPUT",
            Self::InvalidSettings { .. } => "E064_INVALID_SETTINGS",
            Self::TransferFailed { .. } => "E070_TRANSFER_FAILED",
            Self::RegistrationFailed { .. } => "E071_REGISTRATION_FAILED",
            Self::MalformedAction => "E072_MALFORMED_ACTION",
            Self::Overflow => "E080_OVERFLOW",
            Self::Underflow => "E081_UNDERFLOW",
            Self::DivisionByZero => "E082_DIV_ZERO",
        }
    }

    /// Maps the error onto its class
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount { .. }
            | Self::ExceedsBalance { .. }
            | Self::BelowMinimalUnit { .. }
            | Self::InvalidFundingAmount { .. } => ErrorKind::InvalidAmount,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::OperationDisabled { .. } => ErrorKind::OperationDisabled,
            Self::UnitNotFound { .. }
            | Self::ValidatorNotFound { .. }
            | Self::NoSuchDeposit { .. }
            | Self::UnitNotRegistered { .. }
            | Self::EscrowNotAssigned { .. } => ErrorKind::NotFound,
            Self::UnitFinalized { .. }
            | Self::DuplicateKey { .. }
            | Self::WalletAlreadyAssigned { .. }
            | Self::AlreadyUnlocked { .. }
            | Self::DebtAlreadyResolved { .. } => ErrorKind::AlreadyFinalized,
            Self::NothingToWithdraw { .. } => ErrorKind::NothingToWithdraw,
            Self::AmountMismatch { .. }
            | Self::EmptyWallet { .. }
            | Self::NotUnlocked { .. }
            | Self::UnitNotCollecting { .. }
            | Self::PrivateUnitTransfer { .. }
            | Self::TransferNotAllowed { .. }
            | Self::InvalidInput { .. }
            | Self::InvalidSettings { .. } => ErrorKind::StateMismatch,
            Self::Overflow | Self::Underflow | Self::DivisionByZero => ErrorKind::Arithmetic,
            Self::TransferFailed { .. }
            | Self::RegistrationFailed { .. }
            | Self::MalformedAction => ErrorKind::ExternalFailure,
        }
    }
}

impl fmt::Display for StakePoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}", self.code(), self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StakePoolError {}
