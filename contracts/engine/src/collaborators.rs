//! In-Memory Collaborators
//!
//! Payment channel and registration ledger that keep what they receive in
//! memory. Both can be told to fail so callers can observe rollbacks.

use stakepool_common::{
    Address, Amount, BTreeSet, DepositData, Payment, PaymentSink, RegistrationLedger, StakePoolError,
    StakeResult,
};

/// Payment channel recording every payment it sends
#[derive(Debug, Clone, Default)]
pub struct InMemoryPayments {
    sent: Vec<Payment>,
    failing: BTreeSet<Address>,
}

impl InMemoryPayments {
    /// Create an empty payment channel
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every batch containing a payment to `address`
    pub fn fail_for(&mut self, address: Address) {
        self.failing.insert(address);
    }

    /// Accept payments to `address` again
    pub fn recover(&mut self, address: &Address) {
        self.failing.remove(address);
    }

    /// Payments sent so far, in order
    pub fn sent(&self) -> &[Payment] {
        &self.sent
    }

    /// Total sent to `address`
    pub fn total_to(&self, address: &Address) -> Amount {
        self.sent
            .iter()
            .filter(|payment| payment.to == *address)
            .map(|payment| payment.amount)
            .sum()
    }
}

impl PaymentSink for InMemoryPayments {
    fn execute(&mut self, payments: &[Payment]) -> StakeResult<()> {
        if let Some(payment) = payments.iter().find(|p| self.failing.contains(&p.to)) {
            return Err(StakePoolError::TransferFailed {
                to: payment.to,
                amount: payment.amount,
            });
        }
        self.sent.extend_from_slice(payments);
        Ok(())
    }
}

/// Registration ledger recording forwarded deposits
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistrations {
    deposits: Vec<DepositData>,
    rejecting: bool,
}

impl InMemoryRegistrations {
    /// Create an empty registration ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every deposit while set
    pub fn set_rejecting(&mut self, rejecting: bool) {
        self.rejecting = rejecting;
    }

    /// Deposits forwarded so far
    pub fn deposits(&self) -> &[DepositData] {
        &self.deposits
    }

    /// Value attached to all forwarded deposits
    pub fn total_value(&self) -> Amount {
        self.deposits.iter().map(|deposit| deposit.amount).sum()
    }
}

impl RegistrationLedger for InMemoryRegistrations {
    fn deposit(&mut self, deposit: &DepositData) -> StakeResult<()> {
        if self.rejecting {
            return Err(StakePoolError::RegistrationFailed {
                validator_id: deposit.validator_id,
            });
        }
        self.deposits.push(deposit.clone());
        Ok(())
    }
}
