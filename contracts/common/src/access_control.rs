//! Access Control Module
//!
//! Role checks for StakePool entry points. The ledger only consumes the
//! [`Capabilities`] predicates; [`RoleRegistry`] is the default in-memory
//! oracle used by the engine.
//!
//! ## Roles
//!
//! - **Admin**: grants/revokes roles, pauses contracts, replaces settings
//! - **Operator**: registers and transfers validators
//! - **Manager**: assigns and unlocks validator escrows

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{StakePoolError, StakeResult};
use crate::types::Address;
use crate::BTreeMap;

// ============================================================================
// Types
// ============================================================================

/// Protocol roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum Role {
    /// Administers roles, pauses and settings
    Admin,
    /// Registers and transfers validators
    Operator,
    /// Assigns and unlocks escrows
    Manager,
}

impl Role {
    /// Bit position in a role set
    pub fn mask(&self) -> u8 {
        match self {
            Role::Admin => 1 << 0,
            Role::Operator => 1 << 1,
            Role::Manager => 1 << 2,
        }
    }
}

/// Role/permission oracle consumed by the ledger
///
/// Implementations must be pure predicates without side effects.
pub trait Capabilities {
    /// Check whether `account` holds `role`
    fn has_role(&self, account: &Address, role: Role) -> bool;

    /// Admin predicate
    fn is_admin(&self, account: &Address) -> bool {
        self.has_role(account, Role::Admin)
    }

    /// Operator predicate
    fn is_operator(&self, account: &Address) -> bool {
        self.has_role(account, Role::Operator)
    }

    /// Manager predicate
    fn is_manager(&self, account: &Address) -> bool {
        self.has_role(account, Role::Manager)
    }
}

/// In-memory role assignments
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct RoleRegistry {
    /// Bitmask of roles per account
    assignments: BTreeMap<Address, u8>,
}

impl RoleRegistry {
    /// Create a registry with an initial admin
    pub fn new(admin: Address) -> Self {
        let mut registry = Self::default();
        registry.grant(admin, Role::Admin);
        registry
    }

    /// Grant a role without an authorization check
    pub fn grant(&mut self, account: Address, role: Role) {
        *self.assignments.entry(account).or_insert(0) |= role.mask();
    }

    /// Revoke a role without an authorization check
    pub fn revoke(&mut self, account: &Address, role: Role) {
        if let Some(mask) = self.assignments.get_mut(account) {
            *mask &= !role.mask();
            if *mask == 0 {
                self.assignments.remove(account);
            }
        }
    }

    /// Grant a role on behalf of an admin
    pub fn grant_role(&mut self, caller: &Address, account: Address, role: Role) -> StakeResult<()> {
        self.require_admin(caller)?;
        self.grant(account, role);
        Ok(())
    }

    /// Revoke a role on behalf of an admin
    ///
    /// An admin cannot revoke its own admin role, so the registry never
    /// loses its last administrator through this path.
    pub fn revoke_role(&mut self, caller: &Address, account: &Address, role: Role) -> StakeResult<()> {
        self.require_admin(caller)?;
        if role == Role::Admin && caller == account {
            return Err(StakePoolError::InvalidInput {
                param: "account",
                reason: "admin cannot revoke its own admin role",
            });
        }
        self.revoke(account, role);
        Ok(())
    }

    fn require_admin(&self, caller: &Address) -> StakeResult<()> {
        if !self.is_admin(caller) {
            return Err(StakePoolError::PermissionDenied { caller: *caller, required: Role::Admin });
        }
        Ok(())
    }
}

impl Capabilities for RoleRegistry {
    fn has_role(&self, account: &Address, role: Role) -> bool {
        self.assignments
            .get(account)
            .map(|mask| mask & role.mask() != 0)
            .unwrap_or(false)
    }
}

// ============================================================================
// Tests
// ============================================================================
