//! Validator Registry
//!
//! Registers one validator per public key for a fully funded unit and
//! keeps the validator's snapshot of funding amount, maintainer fee and
//! current owning unit.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use stakepool_common::{
    constants::fees, ids,
    validation::{require_bls_pubkey, require_bls_signature},
    Address, BTreeMap, CallContext, DepositData, PausableContract, Role, StakePoolError,
    StakePoolEvent, StakeResult, UnitId, Validator, ValidatorId,
};
use stakepool_deposit_pool::DepositPool;

/// Registration parameters supplied by an operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct RegistrationRequest {
    /// BLS public key of the validator
    pub pubkey: Vec<u8>,
    /// Full unit funding the validator
    pub unit_id: UnitId,
    /// BLS signature over the deposit message
    pub signature: Vec<u8>,
    /// SSZ root of the deposit data
    pub deposit_data_root: [u8; 32],
}

/// Registered validators by id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ValidatorRegistry {
    validators: BTreeMap<ValidatorId, Validator>,
}

impl ValidatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a validator
    pub fn validator(&self, validator_id: &ValidatorId) -> Option<&Validator> {
        self.validators.get(validator_id)
    }

    /// Look up a validator, failing with `ValidatorNotFound`
    pub fn require_validator(&self, validator_id: &ValidatorId) -> StakeResult<&Validator> {
        self.validators
            .get(validator_id)
            .ok_or(StakePoolError::ValidatorNotFound { validator_id: *validator_id })
    }

    /// All validators in id order
    pub fn validators(&self) -> impl Iterator<Item = &Validator> {
        self.validators.values()
    }

    /// Register a validator for a full unit
    ///
    /// Returns the deposit message to forward to the registration ledger
    /// with `funding_amount` of attached value.
    pub fn register(
        &mut self,
        ctx: &mut CallContext,
        pool: &mut DepositPool,
        request: &RegistrationRequest,
    ) -> StakeResult<DepositData> {
        // 1. Pause check first
        ctx.require_not_paused(PausableContract::ValidatorRegistry)?;

        // 2. Only operators register
        ctx.require_role(Role::Operator)?;

        // 3. Key material must be well formed
        require_bls_pubkey(&request.pubkey, "pubkey")?;
        require_bls_signature(&request.signature)?;

        // 4. One validator per key
        let validator_id = ids::validator_id(&request.pubkey);
        if self.validators.contains_key(&validator_id) {
            return Err(StakePoolError::DuplicateKey { validator_id });
        }

        // 5. Unit must be full and not yet finalized
        let funding_amount = ctx.settings.validator_deposit;
        let unit = pool.allocator.require_unit(&request.unit_id)?;
        if unit.is_finalized() {
            return Err(StakePoolError::UnitFinalized { unit_id: request.unit_id });
        }
        if unit.collected != funding_amount {
            return Err(StakePoolError::InvalidFundingAmount {
                collected: unit.collected,
                required: funding_amount,
            });
        }
        let withdrawal_credentials = unit
            .withdrawal_credentials
            .unwrap_or(ctx.settings.withdrawal_credentials);

        // 6. Lock the unit and snapshot the validator
        pool.finalize_unit(&request.unit_id, validator_id, ctx.block_height)?;

        let maintainer_fee_bps = ctx.settings.maintainer_fee_bps;
        self.validators.insert(
            validator_id,
            Validator {
                id: validator_id,
                pubkey: request.pubkey.clone(),
                funding_amount,
                maintainer_fee_bps,
                owning_unit: request.unit_id,
                escrow: None,
                registered_at: ctx.block_height,
            },
        );

        ctx.emit(StakePoolEvent::ValidatorRegistered {
            validator_id,
            unit_id: request.unit_id,
            pubkey: request.pubkey.clone(),
            funding_amount,
            maintainer_fee_bps,
            withdrawal_credentials,
            block_height: ctx.block_height,
        });

        Ok(DepositData {
            validator_id,
            pubkey: request.pubkey.clone(),
            withdrawal_credentials,
            amount: funding_amount,
            signature: request.signature.clone(),
            deposit_data_root: request.deposit_data_root,
        })
    }

    /// Repoint a validator to a new owning unit and fee
    pub fn update(
        &mut self,
        ctx: &CallContext,
        validator_id: &ValidatorId,
        new_unit_id: UnitId,
        new_maintainer_fee_bps: u64,
    ) -> StakeResult<()> {
        ctx.require_role(Role::Operator)?;
        if new_maintainer_fee_bps > fees::MAX_MAINTAINER_FEE_BPS {
            return Err(StakePoolError::InvalidInput {
                param: "maintainer_fee_bps",
                reason: "maintainer fee must be below 100%",
            });
        }

        let validator = self
            .validators
            .get_mut(validator_id)
            .ok_or(StakePoolError::ValidatorNotFound { validator_id: *validator_id })?;
        validator.owning_unit = new_unit_id;
        validator.maintainer_fee_bps = new_maintainer_fee_bps;
        Ok(())
    }

    /// Attach an escrow account to a validator
    pub fn set_escrow(&mut self, validator_id: &ValidatorId, escrow: Address) -> StakeResult<()> {
        let validator = self
            .validators
            .get_mut(validator_id)
            .ok_or(StakePoolError::ValidatorNotFound { validator_id: *validator_id })?;
        if validator.escrow.is_some() {
            return Err(StakePoolError::WalletAlreadyAssigned { validator_id: *validator_id });
        }
        validator.escrow = Some(escrow);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakepool_common::{constants::token::ONE, ErrorKind, PauseRegistry, RoleRegistry, Settings};

    const ADMIN: Address = [1u8; 32];
    const OPERATOR: Address = [2u8; 32];
    const OWNER: Address = [7u8; 32];
    const DEPOSITOR: Address = [8u8; 32];

    struct TestEnv {
        settings: Settings,
        roles: RoleRegistry,
        pauses: PauseRegistry,
    }

    fn create_test_env() -> TestEnv {
        let mut roles = RoleRegistry::new(ADMIN);
        roles.grant(OPERATOR, Role::Operator);
        TestEnv {
            settings: Settings::new([9u8; 32], [0x01; 32]).with_min_deposit_unit(ONE / 10),
            roles,
            pauses: PauseRegistry::new(),
        }
    }

    impl TestEnv {
        fn ctx(&self, caller: Address) -> CallContext<'_> {
            CallContext::new(caller, 100, &self.settings, &self.roles, &self.pauses)
        }
    }

    fn create_full_unit(env: &TestEnv, pool: &mut DepositPool) -> UnitId {
        let mut ctx = env.ctx(DEPOSITOR);
        let allocations = pool.deposit(&mut ctx, OWNER, DEPOSITOR, 32 * ONE).unwrap();
        allocations[0].unit_id
    }

    fn request(unit_id: UnitId, key_byte: u8) -> RegistrationRequest {
        RegistrationRequest {
            pubkey: vec![key_byte; 48],
            unit_id,
            signature: vec![0xAB; 96],
            deposit_data_root: [0xCD; 32],
        }
    }

    #[test]
    fn test_register_snapshots_settings() {
        let env = create_test_env();
        let mut pool = DepositPool::new();
        let mut registry = ValidatorRegistry::new();
        let unit_id = create_full_unit(&env, &mut pool);

        let mut ctx = env.ctx(OPERATOR);
        let deposit = registry.register(&mut ctx, &mut pool, &request(unit_id, 5)).unwrap();

        let validator = registry.validator(&deposit.validator_id).unwrap();
        assert_eq!(validator.funding_amount, 32 * ONE);
        assert_eq!(validator.maintainer_fee_bps, env.settings.maintainer_fee_bps);
        assert_eq!(validator.owning_unit, unit_id);
        assert_eq!(deposit.amount, 32 * ONE);
        assert_eq!(deposit.withdrawal_credentials, [0x01; 32]);

        let unit = pool.unit(&unit_id).unwrap();
        assert!(unit.is_finalized());
        assert_eq!(unit.collected, 0);
    }

    #[test]
    fn test_register_requires_operator() {
        let env = create_test_env();
        let mut pool = DepositPool::new();
        let mut registry = ValidatorRegistry::new();
        let unit_id = create_full_unit(&env, &mut pool);

        let mut ctx = env.ctx(DEPOSITOR);
        let result = registry.register(&mut ctx, &mut pool, &request(unit_id, 5));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::PermissionDenied);
        assert!(!pool.unit(&unit_id).unwrap().is_finalized());
    }

    #[test]
    fn test_register_partial_unit_rejected() {
        let env = create_test_env();
        let mut pool = DepositPool::new();
        let mut registry = ValidatorRegistry::new();
        let mut deposit_ctx = env.ctx(DEPOSITOR);
        let allocations = pool.deposit(&mut deposit_ctx, OWNER, DEPOSITOR, 31 * ONE).unwrap();

        let mut ctx = env.ctx(OPERATOR);
        let result = registry.register(&mut ctx, &mut pool, &request(allocations[0].unit_id, 5));
        assert_eq!(
            result,
            Err(StakePoolError::InvalidFundingAmount { collected: 31 * ONE, required: 32 * ONE })
        );
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let env = create_test_env();
        let mut pool = DepositPool::new();
        let mut registry = ValidatorRegistry::new();
        let first = create_full_unit(&env, &mut pool);
        let second = create_full_unit(&env, &mut pool);

        let mut ctx = env.ctx(OPERATOR);
        registry.register(&mut ctx, &mut pool, &request(first, 5)).unwrap();
        let result = registry.register(&mut ctx, &mut pool, &request(second, 5));

        assert!(matches!(result, Err(StakePoolError::DuplicateKey { .. })));
        assert!(!pool.unit(&second).unwrap().is_finalized());
    }

    #[test]
    fn test_register_twice_for_same_unit_rejected() {
        let env = create_test_env();
        let mut pool = DepositPool::new();
        let mut registry = ValidatorRegistry::new();
        let unit_id = create_full_unit(&env, &mut pool);

        let mut ctx = env.ctx(OPERATOR);
        registry.register(&mut ctx, &mut pool, &request(unit_id, 5)).unwrap();
        let result = registry.register(&mut ctx, &mut pool, &request(unit_id, 6));

        assert_eq!(result.unwrap_err().kind(), ErrorKind::AlreadyFinalized);
    }

    #[test]
    fn test_bad_key_length_rejected() {
        let env = create_test_env();
        let mut pool = DepositPool::new();
        let mut registry = ValidatorRegistry::new();
        let unit_id = create_full_unit(&env, &mut pool);

        let mut bad = request(unit_id, 5);
        bad.pubkey.truncate(47);

        let mut ctx = env.ctx(OPERATOR);
        let result = registry.register(&mut ctx, &mut pool, &bad);
        assert!(matches!(result, Err(StakePoolError::InvalidInput { param: "pubkey", .. })));
    }

    #[test]
    fn test_private_unit_uses_own_credentials() {
        let env = create_test_env();
        let mut pool = DepositPool::new();
        let mut registry = ValidatorRegistry::new();
        let key = [3u8; 48];
        let mut deposit_ctx = env.ctx(DEPOSITOR);
        let allocations = pool
            .deposit_private(&mut deposit_ctx, OWNER, DEPOSITOR, &key, 32 * ONE)
            .unwrap();

        let mut ctx = env.ctx(OPERATOR);
        let deposit = registry
            .register(&mut ctx, &mut pool, &request(allocations[0].unit_id, 5))
            .unwrap();

        assert_eq!(deposit.withdrawal_credentials, ids::withdrawal_credentials(&key));
    }

    #[test]
    fn test_update_unknown_validator() {
        let env = create_test_env();
        let mut registry = ValidatorRegistry::new();
        let ctx = env.ctx(OPERATOR);

        let result = registry.update(&ctx, &[4u8; 32], [5u8; 32], 1_000);
        assert!(matches!(result, Err(StakePoolError::ValidatorNotFound { .. })));
    }
}
