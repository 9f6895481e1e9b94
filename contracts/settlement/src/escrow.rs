//! Validator Escrow
//!
//! Per-validator holding account that receives the validator's returned
//! balance. The split computed at unlock is frozen on the escrow and every
//! later withdrawal reads it.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use stakepool_common::{Address, Amount, Penalty, ValidatorId};

/// Escrow lifecycle, `Locked -> Unlocked`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum EscrowState {
    /// Collecting settlement funds
    Locked,
    /// Split frozen, depositors may withdraw (terminal)
    Unlocked,
}

/// Escrow account of one validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Escrow {
    /// Validator the escrow settles
    pub validator_id: ValidatorId,
    /// Account address
    pub address: Address,
    /// Lifecycle state
    pub state: EscrowState,
    /// Funds currently held
    pub balance: Amount,
    /// Principal returned to the owning unit's depositors
    pub principal: Amount,
    /// Reward left for the owning unit's depositors
    pub user_reward: Amount,
    /// Maintainer share of the profit
    pub maintainer_reward: Amount,
    /// Transfer debt paid out at unlock
    pub debt_paid: Amount,
    /// Haircut when less than the funding amount came back
    pub penalty: Option<Penalty>,
    /// Block height of assignment
    pub assigned_at: u64,
    /// Block height of unlock
    pub unlocked_at: Option<u64>,
}

impl Escrow {
    /// Create an empty, locked escrow
    pub fn new(validator_id: ValidatorId, address: Address, block_height: u64) -> Self {
        Self {
            validator_id,
            address,
            state: EscrowState::Locked,
            balance: 0,
            principal: 0,
            user_reward: 0,
            maintainer_reward: 0,
            debt_paid: 0,
            penalty: None,
            assigned_at: block_height,
            unlocked_at: None,
        }
    }

    /// Check if withdrawals are enabled
    pub fn is_unlocked(&self) -> bool {
        self.state == EscrowState::Unlocked
    }

    /// Check if everything was paid out
    pub fn is_drained(&self) -> bool {
        self.is_unlocked() && self.balance == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_escrow_is_locked() {
        let escrow = Escrow::new([1u8; 32], [2u8; 32], 10);
        assert_eq!(escrow.state, EscrowState::Locked);
        assert!(!escrow.is_unlocked());
        assert!(!escrow.is_drained());
    }

    #[test]
    fn test_drained_requires_unlock() {
        let mut escrow = Escrow::new([1u8; 32], [2u8; 32], 10);
        escrow.state = EscrowState::Unlocked;
        assert!(escrow.is_drained());

        escrow.balance = 1;
        assert!(!escrow.is_drained());
    }
}
