//! StakePool Common Library
//!
//! Shared types, constants, and utilities for every StakePool ledger crate.
//!
//! ## Ledger Model
//!
//! StakePool pools arbitrary-sized deposits into fixed-size validator
//! funding units, registers a validator once a unit is full, moves a
//! validator's reward stream between units, and settles the returned
//! balance between the maintainer, prior owners and depositors.
//!
//! - **Units**: funding buckets indexed by `(owner contract, sequence)`
//! - **Deposits**: per `(unit, sender, recipient)` contribution records
//! - **Validators**: registered once per public key, snapshotting the
//!   funding amount and maintainer fee
//! - **Debts**: rewards owed to a unit a validator was transferred away from
//! - **Escrows**: per-validator holding accounts, `Locked -> Unlocked`
//!
//! Every public entry point is an atomic state transition: it either
//! applies all of its effects or none. Value leaves the ledger only
//! through [`interfaces::PaymentSink`] after the ledger has been updated.
//!
//! This crate is `no_std` compatible when built without the `std` feature.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

// Re-export collections for submodules based on feature
#[cfg(not(feature = "std"))]
pub use alloc::{collections::{BTreeMap, BTreeSet}, vec, vec::Vec};
#[cfg(feature = "std")]
pub use std::{collections::{BTreeMap, BTreeSet}, vec, vec::Vec};

pub mod constants;
pub mod errors;
pub mod types;
pub mod ids;
pub mod math;
pub mod settings;
pub mod events;
pub mod validation;
pub mod access_control;
pub mod emergency;
pub mod interfaces;
pub mod context;


// Re-exports for convenience
pub use errors::*;
pub use types::*;
pub use ids::*;
pub use math::*;
pub use settings::*;
pub use events::*;
pub use validation::*;
pub use access_control::*;
pub use emergency::*;
pub use interfaces::*;
pub use context::*;
