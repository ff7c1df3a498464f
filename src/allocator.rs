use crate::error::{BillingError, Result};
use crate::ledger::{DebtLedger, ServiceCategory};
use bigdecimal::{BigDecimal, Zero};

/// Result of applying one payment to a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub ledger: DebtLedger,
    /// Amount taken off each category, in priority order.
    pub applied: Vec<(ServiceCategory, BigDecimal)>,
    /// Part of the payment that exceeded the total debt.
    pub remainder: BigDecimal,
}

impl Allocation {
    pub fn applied_total(&self) -> BigDecimal {
        self.applied.iter().map(|(_, amount)| amount).sum()
    }

    pub fn applied_to(&self, category: ServiceCategory) -> BigDecimal {
        self.applied
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, amount)| amount.clone())
            .unwrap_or_else(BigDecimal::zero)
    }
}

/// Applies `amount` to water first, then electric.
///
/// The input ledger is not touched; the caller persists `Allocation::ledger`.
/// Paying more than the total debt is not an error, the excess comes back
/// as `remainder`.
pub fn allocate(ledger: &DebtLedger, amount: &BigDecimal) -> Result<Allocation> {
    if *amount <= BigDecimal::zero() {
        return Err(BillingError::InvalidAmount(amount.clone()));
    }

    let mut updated = ledger.clone();
    let mut remaining = amount.clone();
    let mut applied = Vec::with_capacity(ServiceCategory::PRIORITY.len());

    for category in ServiceCategory::PRIORITY {
        if remaining.is_zero() {
            break;
        }
        let balance = updated.balance_mut(category);
        if balance.is_zero() {
            continue;
        }
        let taken = (&remaining).min(&*balance).clone();
        *balance -= &taken;
        remaining -= &taken;
        applied.push((category, taken));
    }

    Ok(Allocation {
        ledger: updated,
        applied,
        remainder: remaining,
    })
}
