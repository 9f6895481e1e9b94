//! Protocol Constants
//!
//! All magic numbers and default configuration values for StakePool.
//!
//! # Network Configuration
//!
//! Use feature flags to compile for different networks:
//! - `mainnet` - Production values (0.1 ETH deposit granularity)
//! - Default (no feature) - Testnet values (lower granularity for testing)
//!
//! ```toml
//! # For mainnet deployment:
//! stakepool-common = { path = "...", features = ["mainnet"] }
//! ```

/// Native currency denominations
pub mod token {
    /// One ether in wei
    pub const ONE: u128 = 1_000_000_000_000_000_000;
}

/// Validator funding defaults
pub mod funding {
    use super::token::ONE;

    /// Amount required to register one validator (32 ETH)
    pub const VALIDATOR_DEPOSIT: u128 = 32 * ONE;

    /// Deposit granularity
    /// - Mainnet: 0.1 ETH
    /// - Testnet: 0.001 ETH (allows testing with faucet funds)
    #[cfg(feature = "mainnet")]
    pub const MIN_DEPOSIT_UNIT: u128 = ONE / 10;
    #[cfg(not(feature = "mainnet"))]
    pub const MIN_DEPOSIT_UNIT: u128 = ONE / 1_000;

    /// Largest single deposit accepted by default (1000 ETH)
    pub const MAX_DEPOSIT_AMOUNT: u128 = 1_000 * ONE;

    /// Helper to check if running in mainnet mode
    #[cfg(feature = "mainnet")]
    pub const IS_MAINNET: bool = true;
    #[cfg(not(feature = "mainnet"))]
    pub const IS_MAINNET: bool = false;
}

/// Fee Configuration (in basis points, 100 = 1%)
pub mod fees {
    /// Basis points denominator
    pub const BPS_DENOMINATOR: u64 = 10_000;

    /// Default maintainer fee (10%)
    pub const DEFAULT_MAINTAINER_FEE_BPS: u64 = 1_000;

    /// Maintainer fee must stay strictly below 100%
    pub const MAX_MAINTAINER_FEE_BPS: u64 = BPS_DENOMINATOR - 1;
}

/// Precision constants
pub mod precision {
    /// Fixed-point scale used when reporting penalty ratios (1e18)
    pub const PENALTY_SCALE: u128 = 1_000_000_000_000_000_000;
}

/// Validator key material
pub mod keys {
    /// BLS12-381 public key length
    pub const BLS_PUBKEY_LENGTH: usize = 48;

    /// BLS12-381 signature length
    pub const BLS_SIGNATURE_LENGTH: usize = 96;

    /// Withdrawal credentials prefix for BLS withdrawal keys
    pub const BLS_WITHDRAWAL_PREFIX: u8 = 0x00;
}

/// Domain separators for identifier derivation
pub mod domains {
    /// Unit identifiers
    pub const UNIT: &[u8] = b"stakepool/unit";
    /// Depositor (user) identifiers
    pub const USER: &[u8] = b"stakepool/user";
    /// Validator identifiers
    pub const VALIDATOR: &[u8] = b"stakepool/validator";
    /// Escrow account addresses
    pub const ESCROW: &[u8] = b"stakepool/escrow";
}
