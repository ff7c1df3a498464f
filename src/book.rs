use crate::allocator::allocate;
use crate::error::{BillingError, Result};
use crate::ledger::{DebtLedger, OwnerId, ServiceCategory};
use crate::payment::PaymentRecord;
use crate::period::Period;
use crate::session::{Action, Session};
use bigdecimal::{BigDecimal, Zero};
use std::collections::BTreeMap;

/// What to do with a payment larger than the owner's total debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverpaymentPolicy {
    #[default]
    Reject,
    /// Record only the part that was applied and hand the rest back.
    ReturnRemainder,
}

/// What to do with a ledger once a payment brings it to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettledLedgerPolicy {
    #[default]
    Retain,
    Prune,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BookOptions {
    pub overpayment: OverpaymentPolicy,
    pub settled: SettledLedgerPolicy,
}

/// Outcome of a processed payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub owner_id: OwnerId,
    pub period: Period,
    pub amount: BigDecimal,
    pub water_applied: BigDecimal,
    pub electric_applied: BigDecimal,
    pub remainder: BigDecimal,
    pub remaining_debt: BigDecimal,
}

/// Debt ledgers and the payment log of every owner.
#[derive(Debug, Clone, Default)]
pub struct Book {
    ledgers: BTreeMap<OwnerId, DebtLedger>,
    payments: Vec<PaymentRecord>,
    options: BookOptions,
}

impl Book {
    pub fn from_parts(
        ledgers: impl IntoIterator<Item = DebtLedger>,
        payments: Vec<PaymentRecord>,
        options: BookOptions,
    ) -> Self {
        Self {
            ledgers: ledgers.into_iter().map(|l| (l.owner_id, l)).collect(),
            payments,
            options,
        }
    }

    pub fn ledger(&self, owner_id: OwnerId) -> Option<&DebtLedger> {
        self.ledgers.get(&owner_id)
    }

    pub fn ledgers(&self) -> impl Iterator<Item = &DebtLedger> {
        self.ledgers.values()
    }

    pub fn payments(&self) -> &[PaymentRecord] {
        &self.payments
    }

    /// Returns the ledger of `owner_id` if `session` may see it.
    pub fn view_ledger(&self, session: &Session, owner_id: OwnerId) -> Result<&DebtLedger> {
        session.require(Action::ViewLedger(owner_id))?;
        self.ledger(owner_id).ok_or(BillingError::UnknownOwner(owner_id))
    }

    pub fn total_debt(&self) -> BigDecimal {
        self.ledgers.values().map(DebtLedger::total).sum()
    }

    /// Bills `amount` for one service and records the accrual row.
    pub fn create_accrual(
        &mut self,
        session: &Session,
        owner_id: OwnerId,
        period: Period,
        category: ServiceCategory,
        amount: BigDecimal,
    ) -> Result<&DebtLedger> {
        session.require(Action::CreateAccruals)?;

        let mut ledger = self
            .ledgers
            .get(&owner_id)
            .cloned()
            .unwrap_or_else(|| DebtLedger::new(owner_id));
        ledger.accrue(category, &amount)?;

        log::info!(
            "{} accrued {} {} for owner {} ({})",
            session.full_name,
            amount,
            category,
            owner_id,
            period
        );
        self.payments.push(PaymentRecord::accrual(owner_id, period, amount));
        let slot = self.ledgers.entry(owner_id).or_insert_with(|| DebtLedger::new(owner_id));
        *slot = ledger;
        Ok(slot)
    }

    /// Applies a payment to the owner's debt and records the payment row.
    ///
    /// Nothing is written unless every check passes.
    pub fn process_payment(
        &mut self,
        session: &Session,
        owner_id: OwnerId,
        period: Period,
        amount: BigDecimal,
    ) -> Result<PaymentReceipt> {
        session.require(Action::ProcessPayments)?;

        let current = self
            .ledgers
            .get(&owner_id)
            .ok_or(BillingError::UnknownOwner(owner_id))?;
        let total = current.total();
        if self.options.overpayment == OverpaymentPolicy::Reject
            && amount > BigDecimal::zero()
            && amount > total
        {
            log::warn!(
                "rejected payment of {} for owner {}: debt is {}",
                amount,
                owner_id,
                total
            );
            return Err(BillingError::OverpaymentRejected { amount, total });
        }

        let allocation = allocate(current, &amount)?;
        let applied = allocation.applied_total();
        let receipt = PaymentReceipt {
            owner_id,
            period,
            water_applied: allocation.applied_to(ServiceCategory::Water),
            electric_applied: allocation.applied_to(ServiceCategory::Electric),
            remainder: allocation.remainder.clone(),
            remaining_debt: allocation.ledger.total(),
            amount,
        };

        if !applied.is_zero() {
            self.payments.push(PaymentRecord::payment(owner_id, period, applied));
        }
        if allocation.ledger.is_settled() && self.options.settled == SettledLedgerPolicy::Prune {
            log::debug!("owner {} settled, pruning ledger", owner_id);
            self.ledgers.remove(&owner_id);
        } else {
            self.ledgers.insert(owner_id, allocation.ledger);
        }

        log::info!(
            "{} processed payment of {} for owner {} ({}): water {}, electric {}, remainder {}",
            session.full_name,
            receipt.amount,
            owner_id,
            period,
            receipt.water_applied,
            receipt.electric_applied,
            receipt.remainder
        );
        Ok(receipt)
    }

    /// Pays exactly the owner's outstanding total.
    pub fn pay_in_full(
        &mut self,
        session: &Session,
        owner_id: OwnerId,
        period: Period,
    ) -> Result<PaymentReceipt> {
        session.require(Action::ProcessPayments)?;
        let total = self
            .ledgers
            .get(&owner_id)
            .ok_or(BillingError::UnknownOwner(owner_id))?
            .total();
        self.process_payment(session, owner_id, period, total)
    }
}
