//! Validator Registry Contract
//!
//! Registration of validators for full units and the transfer of a
//! validator's reward stream between units.
//!
//! ## Lifecycle
//!
//! ```text
//! register(pubkey, unit)            unit finalized, validator snapshot taken
//!    │
//!    ├─ transfer(reward, new_unit)  debt owed to the previous unit (0..n times)
//!    │
//!    └─ escrow assigned             no further transfers
//! ```

pub mod registry;
pub mod transfers;

pub use registry::{RegistrationRequest, ValidatorRegistry};
pub use transfers::{DebtResolution, TransferDebtLedger};
