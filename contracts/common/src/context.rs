//! Call Context
//!
//! Everything one ledger operation reads besides the ledger itself: the
//! caller, the block height, the settings snapshot and the collaborator
//! oracles. Events emitted during the call are buffered here and only
//! reach the permanent log if the call commits.

use crate::access_control::{Capabilities, Role};
use crate::emergency::{PausableContract, PauseFlags};
use crate::errors::StakeResult;
use crate::events::{EventLog, StakePoolEvent};
use crate::settings::Settings;
use crate::types::Address;
use crate::validation::{require_not_paused, require_role};

/// Per-call execution context
pub struct CallContext<'a> {
    /// Account invoking the operation
    pub caller: Address,
    /// Current block height
    pub block_height: u64,
    /// Settings snapshot in effect for this call
    pub settings: &'a Settings,
    /// Events emitted by this call
    pub events: EventLog,
    capabilities: &'a dyn Capabilities,
    pauses: &'a dyn PauseFlags,
}

impl<'a> CallContext<'a> {
    /// Create a context with an empty event buffer
    pub fn new(
        caller: Address,
        block_height: u64,
        settings: &'a Settings,
        capabilities: &'a dyn Capabilities,
        pauses: &'a dyn PauseFlags,
    ) -> Self {
        Self {
            caller,
            block_height,
            settings,
            events: EventLog::new(),
            capabilities,
            pauses,
        }
    }

    /// Fail with `OperationDisabled` if `contract` is paused
    pub fn require_not_paused(&self, contract: PausableContract) -> StakeResult<()> {
        require_not_paused(self.pauses, contract)
    }

    /// Fail with `PermissionDenied` unless the caller holds `role`
    pub fn require_role(&self, role: Role) -> StakeResult<()> {
        require_role(self.capabilities, &self.caller, role)
    }

    /// Buffer an event
    pub fn emit(&mut self, event: StakePoolEvent) {
        self.events.emit(event);
    }

    /// Release the buffered events
    pub fn into_events(self) -> EventLog {
        self.events
    }
}
