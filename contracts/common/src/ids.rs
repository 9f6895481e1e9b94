//! Identifier Derivation
//!
//! Deterministic SHA-256 identifiers for units, depositors, validators
//! and escrow accounts.

use sha2::{Digest, Sha256};

use crate::constants::{domains, keys};
use crate::types::{Address, UnitId, UserId, ValidatorId};

fn digest(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut id = [0u8; 32];
    id.copy_from_slice(&result);
    id
}

/// Generate the unit id for `(owner, sequence)`
pub fn unit_id(owner: &Address, sequence: u64) -> UnitId {
    digest(&[domains::UNIT, owner, &sequence.to_le_bytes()])
}

/// Generate the depositor identity for `(unit, sender, recipient)`
pub fn user_id(unit_id: &UnitId, sender: &Address, recipient: &Address) -> UserId {
    digest(&[domains::USER, unit_id, sender, recipient])
}

/// Generate the validator id for a public key
pub fn validator_id(pubkey: &[u8]) -> ValidatorId {
    digest(&[domains::VALIDATOR, pubkey])
}

/// Generate the escrow account address for a validator
pub fn escrow_address(validator_id: &ValidatorId) -> Address {
    digest(&[domains::ESCROW, validator_id])
}

/// Withdrawal credentials for a BLS withdrawal public key
///
/// `0x00 || sha256(key)[1..]`
pub fn withdrawal_credentials(withdrawal_key: &[u8]) -> [u8; 32] {
    let mut credentials = digest(&[withdrawal_key]);
    credentials[0] = keys::BLS_WITHDRAWAL_PREFIX;
    credentials
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_ids_differ_by_sequence() {
        let owner = [7u8; 32];
        assert_ne!(unit_id(&owner, 1), unit_id(&owner, 2));
        assert_eq!(unit_id(&owner, 1), unit_id(&owner, 1));
    }

    #[test]
    fn test_unit_ids_differ_by_owner() {
        assert_ne!(unit_id(&[1u8; 32], 1), unit_id(&[2u8; 32], 1));
    }

    #[test]
    fn test_user_id_depends_on_recipient() {
        let unit = unit_id(&[1u8; 32], 1);
        let sender = [2u8; 32];
        assert_ne!(user_id(&unit, &sender, &[3u8; 32]), user_id(&unit, &sender, &[4u8; 32]));
    }

    #[test]
    fn test_withdrawal_credentials_prefix() {
        let credentials = withdrawal_credentials(&[9u8; 48]);
        assert_eq!(credentials[0], 0x00);
        assert_eq!(&credentials[1..], &digest(&[&[9u8; 48]])[1..]);
    }

    #[test]
    fn test_escrow_address_distinct_from_validator_id() {
        let validator = validator_id(&[5u8; 48]);
        assert_ne!(escrow_address(&validator), validator);
    }
}
