use crate::ledger::OwnerId;
use crate::period::Period;
use bigdecimal::{BigDecimal, Zero};

/// One row of the payment log. Rows are appended, never edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    pub owner_id: OwnerId,
    pub period: Period,
    pub accrued: BigDecimal,
    pub paid_for: BigDecimal,
}

impl PaymentRecord {
    /// A bill issued for `period`, not yet paid.
    pub fn accrual(owner_id: OwnerId, period: Period, amount: BigDecimal) -> Self {
        Self {
            owner_id,
            period,
            accrued: amount,
            paid_for: BigDecimal::zero(),
        }
    }

    /// Money received against existing debt; nothing new is billed.
    pub fn payment(owner_id: OwnerId, period: Period, amount: BigDecimal) -> Self {
        Self {
            owner_id,
            period,
            accrued: BigDecimal::zero(),
            paid_for: amount,
        }
    }

    pub fn is_payment(&self) -> bool {
        self.paid_for > BigDecimal::zero()
    }
}
