//! Mathematical Utilities for StakePool
//!
//! Checked integer arithmetic for fee splits, penalty ratios and
//! pro-rata payouts. All divisions truncate toward zero.

use primitive_types::U256;

use crate::constants::{fees, precision};
use crate::errors::{StakePoolError, StakeResult};
use crate::types::Amount;

/// Compute `a * b / c` with a 256-bit intermediate
///
/// Fails only if `c == 0` or the quotient does not fit in `u128`.
pub fn mul_div(a: Amount, b: Amount, c: Amount) -> StakeResult<Amount> {
    if c == 0 {
        return Err(StakePoolError::DivisionByZero);
    }

    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(StakePoolError::Overflow)?;
    let quotient = product / U256::from(c);

    if quotient > U256::from(u128::MAX) {
        return Err(StakePoolError::Overflow);
    }
    Ok(quotient.low_u128())
}

/// Calculate the basis-point share of an amount
///
/// share = amount * bps / 10000
pub fn bps_share(amount: Amount, bps: u64) -> StakeResult<Amount> {
    mul_div(amount, bps as u128, fees::BPS_DENOMINATOR as u128)
}

/// Split a reward into `(user_share, maintainer_share)`
///
/// The maintainer share truncates; the user share is the exact remainder.
pub fn split_reward(reward: Amount, maintainer_fee_bps: u64) -> StakeResult<(Amount, Amount)> {
    let maintainer = bps_share(reward, maintainer_fee_bps)?;
    let user = reward.checked_sub(maintainer).ok_or(StakePoolError::Underflow)?;
    Ok((user, maintainer))
}

/// Checked addition
pub fn add(a: Amount, b: Amount) -> StakeResult<Amount> {
    a.checked_add(b).ok_or(StakePoolError::Overflow)
}

/// Checked subtraction
pub fn sub(a: Amount, b: Amount) -> StakeResult<Amount> {
    a.checked_sub(b).ok_or(StakePoolError::Underflow)
}

/// Penalty applied when an escrow returns less than the funding amount
///
/// Stored as the exact fraction `returned / funding`, frozen at unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, borsh::BorshSerialize, borsh::BorshDeserialize)]
pub struct Penalty {
    /// Principal actually returned
    pub returned: Amount,
    /// Funding amount of the validator
    pub funding: Amount,
}

impl Penalty {
    /// Create a penalty, or `None` when nothing was lost
    pub fn from_balance(returned: Amount, funding: Amount) -> Option<Self> {
        if returned >= funding {
            None
        } else {
            Some(Self { returned, funding })
        }
    }

    /// Apply the penalty to a contribution
    ///
    /// payout = contribution * returned / funding
    pub fn apply(&self, contribution: Amount) -> StakeResult<Amount> {
        mul_div(contribution, self.returned, self.funding)
    }

    /// Ratio in `PENALTY_SCALE` fixed point
    pub fn ratio(&self) -> StakeResult<u128> {
        mul_div(self.returned, precision::PENALTY_SCALE, self.funding)
    }
}
