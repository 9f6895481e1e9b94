//! Emergency Module
//!
//! Pause flags for the StakePool contracts. A paused contract rejects its
//! mutating entry points with `OperationDisabled` before any other check.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

// ============================================================================
// Types
// ============================================================================

/// Contracts that can be paused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum PausableContract {
    /// Deposits and cancellations
    DepositPool,
    /// Validator registration
    ValidatorRegistry,
    /// Validator transfers and transferred-unit withdrawals
    ValidatorTransfers,
    /// Escrow assignment, unlock and withdrawals
    Settlement,
}

impl PausableContract {
    /// Get contract bitmask position
    pub fn mask(&self) -> u8 {
        match self {
            PausableContract::DepositPool => 1 << 0,
            PausableContract::ValidatorRegistry => 1 << 1,
            PausableContract::ValidatorTransfers => 1 << 2,
            PausableContract::Settlement => 1 << 3,
        }
    }
}

/// Pause flag store consumed by the ledger
pub trait PauseFlags {
    /// Check whether `contract` is paused
    fn is_paused(&self, contract: PausableContract) -> bool;
}

/// Bitmask pause registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PauseRegistry {
    /// Bitmask of paused contracts
    paused: u8,
}

impl PauseRegistry {
    /// Create a registry with nothing paused
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause a contract; returns false if it was already paused
    pub fn pause(&mut self, contract: PausableContract) -> bool {
        let was_paused = self.is_paused(contract);
        self.paused |= contract.mask();
        !was_paused
    }

    /// Unpause a contract; returns false if it was not paused
    pub fn unpause(&mut self, contract: PausableContract) -> bool {
        let was_paused = self.is_paused(contract);
        self.paused &= !contract.mask();
        was_paused
    }

    /// Check if any contract is paused
    pub fn any_paused(&self) -> bool {
        self.paused != 0
    }
}

impl PauseFlags for PauseRegistry {
    fn is_paused(&self, contract: PausableContract) -> bool {
        self.paused & contract.mask() != 0
    }
}
