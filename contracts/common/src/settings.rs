//! Global Settings Store
//!
//! Snapshot of the protocol parameters. Operations receive the settings
//! explicitly and copy the values they need (funding target, maintainer fee)
//! into the records they create, so later changes never rewrite history.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::{fees, funding};
use crate::errors::{StakePoolError, StakeResult};
use crate::types::{Address, Amount};
use crate::BTreeMap;

/// Protocol parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Settings {
    /// Funding target of one validator
    pub validator_deposit: Amount,
    /// Deposit granularity
    pub min_deposit_unit: Amount,
    /// Largest single deposit
    pub max_deposit_amount: Amount,
    /// Maintainer fee in basis points
    pub maintainer_fee_bps: u64,
    /// Maintainer payout address
    pub maintainer: Address,
    /// Withdrawal credentials used by non-private units
    pub withdrawal_credentials: [u8; 32],
    /// Blocks a unit must stay staked before its validator can be transferred
    pub staking_durations: BTreeMap<Address, u64>,
}

impl Settings {
    /// Create settings with protocol defaults
    pub fn new(maintainer: Address, withdrawal_credentials: [u8; 32]) -> Self {
        Self {
            validator_deposit: funding::VALIDATOR_DEPOSIT,
            min_deposit_unit: funding::MIN_DEPOSIT_UNIT,
            max_deposit_amount: funding::MAX_DEPOSIT_AMOUNT,
            maintainer_fee_bps: fees::DEFAULT_MAINTAINER_FEE_BPS,
            maintainer,
            withdrawal_credentials,
            staking_durations: BTreeMap::new(),
        }
    }

    /// Set the deposit granularity
    pub fn with_min_deposit_unit(mut self, unit: Amount) -> Self {
        self.min_deposit_unit = unit;
        self
    }

    /// Set the maintainer fee
    pub fn with_maintainer_fee(mut self, fee_bps: u64) -> Self {
        self.maintainer_fee_bps = fee_bps;
        self
    }

    /// Set the staking duration of an owner contract
    pub fn with_staking_duration(mut self, owner: Address, blocks: u64) -> Self {
        self.staking_durations.insert(owner, blocks);
        self
    }

    /// Staking duration of an owner contract (0 if unset)
    pub fn staking_duration(&self, owner: &Address) -> u64 {
        self.staking_durations.get(owner).copied().unwrap_or(0)
    }

    /// Check parameter consistency
    pub fn validate(&self) -> StakeResult<()> {
        if self.validator_deposit == 0 {
            return Err(StakePoolError::InvalidSettings { reason: "validator deposit is zero" });
        }
        if self.min_deposit_unit == 0 {
            return Err(StakePoolError::InvalidSettings { reason: "deposit unit is zero" });
        }
        if self.validator_deposit % self.min_deposit_unit != 0 {
            return Err(StakePoolError::InvalidSettings {
                reason: "validator deposit is not a multiple of the deposit unit",
            });
        }
        if self.max_deposit_amount < self.min_deposit_unit {
            return Err(StakePoolError::InvalidSettings { reason: "max deposit below deposit unit" });
        }
        if self.maintainer_fee_bps > fees::MAX_MAINTAINER_FEE_BPS {
            return Err(StakePoolError::InvalidSettings { reason: "maintainer fee must be below 100%" });
        }
        if self.maintainer == [0u8; 32] {
            return Err(StakePoolError::InvalidSettings { reason: "maintainer is the zero address" });
        }
        Ok(())
    }
}
