//! Validation Helpers for StakePool
//!
//! Reusable precondition checks shared by the ledger crates.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stakepool_common::{check, validation::require_deposit_amount};
//!
//! check!(amount > 0, StakePoolError::InvalidAmount { amount, reason: AmountErrorReason::Zero });
//! require_deposit_amount(amount, &settings)?;
//! ```

use crate::{
    access_control::{Capabilities, Role},
    constants::keys,
    emergency::{PausableContract, PauseFlags},
    errors::{AmountErrorReason, StakePoolError, StakeResult},
    settings::Settings,
    types::{Address, Amount},
};

// ============ Validation Macro ============

/// Check a condition and return an error if it fails.
///
/// # Examples
///
/// ```rust,ignore
/// check!(unit.validator.is_none(), StakePoolError::UnitFinalized { unit_id });
/// ```
#[macro_export]
macro_rules! check {
    ($condition:expr, $error:expr) => {
        if !($condition) {
            return Err($error);
        }
    };
}

// ============ Amount Checks ============

/// Require a non-zero amount
pub fn require_positive(amount: Amount) -> StakeResult<()> {
    check!(
        amount > 0,
        StakePoolError::InvalidAmount { amount, reason: AmountErrorReason::Zero }
    );
    Ok(())
}

/// Require a positive multiple of `unit`
pub fn require_multiple_of(amount: Amount, unit: Amount) -> StakeResult<()> {
    require_positive(amount)?;
    check!(unit > 0, StakePoolError::DivisionByZero);
    check!(
        amount % unit == 0,
        StakePoolError::InvalidAmount { amount, reason: AmountErrorReason::NotMultiple }
    );
    Ok(())
}

/// Validate a deposit against the granularity and the single-deposit cap
pub fn require_deposit_amount(amount: Amount, settings: &Settings) -> StakeResult<()> {
    require_multiple_of(amount, settings.min_deposit_unit)?;
    check!(
        amount <= settings.max_deposit_amount,
        StakePoolError::InvalidAmount { amount, reason: AmountErrorReason::TooLarge }
    );
    Ok(())
}

// ============ Key Checks ============

/// Require a BLS public key of the right length
pub fn require_bls_pubkey(key: &[u8], param: &'static str) -> StakeResult<()> {
    check!(
        key.len() == keys::BLS_PUBKEY_LENGTH,
        StakePoolError::InvalidInput { param, reason: "expected a 48-byte BLS public key" }
    );
    Ok(())
}

/// Require a BLS signature of the right length
pub fn require_bls_signature(signature: &[u8]) -> StakeResult<()> {
    check!(
        signature.len() == keys::BLS_SIGNATURE_LENGTH,
        StakePoolError::InvalidInput {
            param: "signature",
            reason: "expected a 96-byte BLS signature",
        }
    );
    Ok(())
}

/// Require a non-zero address
pub fn require_valid_address(address: &Address, param: &'static str) -> StakeResult<()> {
    check!(
        *address != [0u8; 32],
        StakePoolError::InvalidInput { param, reason: "zero address" }
    );
    Ok(())
}

// ============ Collaborator Checks ============

/// Fail with `OperationDisabled` if the contract is paused
pub fn require_not_paused(flags: &(impl PauseFlags + ?Sized), contract: PausableContract) -> StakeResult<()> {
    check!(!flags.is_paused(contract), StakePoolError::OperationDisabled { contract });
    Ok(())
}

/// Fail with `PermissionDenied` unless the caller holds `role`
pub fn require_role(caps: &(impl Capabilities + ?Sized), caller: &Address, role: Role) -> StakeResult<()> {
    check!(
        caps.has_role(caller, role),
        StakePoolError::PermissionDenied { caller: *caller, required: role }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::token::ONE;
    use crate::emergency::PauseRegistry;
    use crate::access_control::RoleRegistry;

    fn test_settings() -> Settings {
        Settings::new([9u8; 32], [1u8; 32]).with_min_deposit_unit(ONE / 10)
    }

    #[test]
    fn test_require_positive() {
        assert!(require_positive(1).is_ok());
        assert!(matches!(
            require_positive(0),
            Err(StakePoolError::InvalidAmount { reason: AmountErrorReason::Zero, .. })
        ));
    }

    #[test]
    fn test_deposit_must_be_multiple_of_unit() {
        let settings = test_settings();
        assert!(require_deposit_amount(ONE / 10 * 3, &settings).is_ok());
        assert!(matches!(
            require_deposit_amount(ONE / 20, &settings),
            Err(StakePoolError::InvalidAmount { reason: AmountErrorReason::NotMultiple, .. })
        ));
    }

    #[test]
    fn test_deposit_cap() {
        let settings = test_settings();
        let result = require_deposit_amount(settings.max_deposit_amount + ONE / 10, &settings);
        assert!(matches!(
            result,
            Err(StakePoolError::InvalidAmount { reason: AmountErrorReason::TooLarge, .. })
        ));
    }

    #[test]
    fn test_bls_lengths() {
        assert!(require_bls_pubkey(&[1u8; 48], "pubkey").is_ok());
        assert!(require_bls_pubkey(&[1u8; 32], "pubkey").is_err());
        assert!(require_bls_signature(&[1u8; 96]).is_ok());
        assert!(require_bls_signature(&[1u8; 95]).is_err());
    }

    #[test]
    fn test_require_not_paused() {
        let mut flags = PauseRegistry::new();
        assert!(require_not_paused(&flags, PausableContract::DepositPool).is_ok());

        flags.pause(PausableContract::DepositPool);
        assert_eq!(
            require_not_paused(&flags, PausableContract::DepositPool),
            Err(StakePoolError::OperationDisabled { contract: PausableContract::DepositPool })
        );
        assert!(require_not_paused(&flags, PausableContract::Settlement).is_ok());
    }

    #[test]
    fn test_require_role() {
        let admin = [1u8; 32];
        let operator = [2u8; 32];
        let mut roles = RoleRegistry::new(admin);
        roles.grant(operator, Role::Operator);

        assert!(require_role(&roles, &operator, Role::Operator).is_ok());
        assert!(matches!(
            require_role(&roles, &operator, Role::Manager),
            Err(StakePoolError::PermissionDenied { required: Role::Manager, .. })
        ));
    }
}
