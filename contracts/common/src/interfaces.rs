//! External Interfaces
//!
//! Collaborators the ledger hands value to. Both are invoked by the engine
//! only after the ledger state for the call has been updated.

use crate::errors::StakeResult;
use crate::types::{DepositData, Payment};

/// Push-payment channel
pub trait PaymentSink {
    /// Send every payment of the batch, or none of them
    fn execute(&mut self, payments: &[Payment]) -> StakeResult<()>;
}

/// External validator-registration ledger
pub trait RegistrationLedger {
    /// Forward a validator deposit with `deposit.amount` of attached value
    fn deposit(&mut self, deposit: &DepositData) -> StakeResult<()>;
}
