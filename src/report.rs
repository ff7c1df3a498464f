use crate::book::Book;
use crate::error::Result;
use crate::ledger::{DebtLedger, OwnerId};
use crate::payment::PaymentRecord;
use crate::period::Period;
use crate::session::{Action, Session};
use bigdecimal::{BigDecimal, Zero};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinancialSummary {
    pub period: Period,
    pub total_accrued: BigDecimal,
    pub total_paid: BigDecimal,
    pub period_income: BigDecimal,
    pub total_debt: BigDecimal,
    pub average_payment: BigDecimal,
    pub debtor_count: usize,
    pub record_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodIncome {
    pub period: Period,
    pub income: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarterlyReport {
    pub start: Period,
    pub end: Period,
    pub income: BigDecimal,
    pub average_monthly_income: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnualReport {
    pub year: i16,
    pub income: BigDecimal,
    /// Income per calendar quarter, Q1 first.
    pub quarters: [BigDecimal; 4],
    pub average_monthly_income: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debtor {
    pub owner_id: OwnerId,
    pub water: BigDecimal,
    pub electric: BigDecimal,
    pub total: BigDecimal,
}

impl From<&DebtLedger> for Debtor {
    fn from(ledger: &DebtLedger) -> Self {
        Self {
            owner_id: ledger.owner_id,
            water: ledger.water().clone(),
            electric: ledger.electric().clone(),
            total: ledger.total(),
        }
    }
}

fn average(total: BigDecimal, count: usize) -> BigDecimal {
    if count == 0 {
        BigDecimal::zero()
    } else {
        total / BigDecimal::from(count as u64)
    }
}

pub fn income_for<'a>(
    payments: impl Iterator<Item = &'a PaymentRecord>,
    period: Period,
) -> BigDecimal {
    payments
        .filter(|p| p.period == period)
        .map(|p| &p.paid_for)
        .sum()
}

/// Income per period between `start` and `end` inclusive, for periods that have rows.
pub fn income_trend<'a>(
    payments: impl Iterator<Item = &'a PaymentRecord>,
    start: Period,
    end: Period,
) -> Vec<PeriodIncome> {
    let mut by_period: BTreeMap<Period, BigDecimal> = BTreeMap::new();
    for record in payments.filter(|p| p.period.is_within(start, end)) {
        *by_period.entry(record.period).or_insert_with(BigDecimal::zero) += &record.paid_for;
    }
    by_period
        .into_iter()
        .map(|(period, income)| PeriodIncome { period, income })
        .collect()
}

/// Income over `current` and the two months before it.
pub fn quarterly<'a>(
    payments: impl Iterator<Item = &'a PaymentRecord>,
    current: Period,
) -> QuarterlyReport {
    let start = current.previous(2);
    let income: BigDecimal = payments
        .filter(|p| p.period.is_within(start, current))
        .map(|p| &p.paid_for)
        .sum();
    QuarterlyReport {
        start,
        end: current,
        average_monthly_income: average(income.clone(), 3),
        income,
    }
}

pub fn annual<'a>(payments: impl Iterator<Item = &'a PaymentRecord>, year: i16) -> AnnualReport {
    let mut quarters: [BigDecimal; 4] = Default::default();
    for record in payments.filter(|p| p.period.year() == year) {
        quarters[(record.period.quarter() - 1) as usize] += &record.paid_for;
    }
    let income: BigDecimal = quarters.iter().sum();
    AnnualReport {
        year,
        average_monthly_income: average(income.clone(), 12),
        income,
        quarters,
    }
}

/// Owners with outstanding debt, largest first.
pub fn debtors(book: &Book) -> Vec<Debtor> {
    let mut debtors: Vec<Debtor> = book
        .ledgers()
        .filter(|l| !l.is_settled())
        .map(Debtor::from)
        .collect();
    debtors.sort_by(|a, b| b.total.cmp(&a.total).then(a.owner_id.cmp(&b.owner_id)));
    debtors
}

pub fn summary(book: &Book, period: Period) -> FinancialSummary {
    let payments = book.payments();
    let paid: Vec<&BigDecimal> = payments
        .iter()
        .filter(|p| p.is_payment())
        .map(|p| &p.paid_for)
        .collect();
    let total_paid: BigDecimal = paid.iter().copied().sum();
    FinancialSummary {
        period,
        total_accrued: payments.iter().map(|p| &p.accrued).sum(),
        period_income: income_for(payments.iter(), period),
        total_debt: book.total_debt(),
        average_payment: average(total_paid.clone(), paid.len()),
        debtor_count: book.ledgers().filter(|l| !l.is_settled()).count(),
        record_count: payments.len(),
        total_paid,
    }
}

/// Reports carry company-wide figures, so the session must be allowed to see them.
pub fn authorize(session: &Session) -> Result<()> {
    session.require(Action::ViewReports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::BookOptions;
    use crate::session::Role;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn p(s: &str) -> Period {
        s.parse().unwrap()
    }

    fn fixture() -> Book {
        let ledgers = [
            DebtLedger::with_balances(1, dec("100"), dec("50")).unwrap(),
            DebtLedger::with_balances(2, dec("0"), dec("0")).unwrap(),
            DebtLedger::with_balances(3, dec("0"), dec("150")).unwrap(),
            DebtLedger::with_balances(4, dec("10"), dec("0")).unwrap(),
        ];
        let payments = vec![
            PaymentRecord::accrual(1, p("01.2024"), dec("200")),
            PaymentRecord::payment(1, p("01.2024"), dec("50")),
            PaymentRecord::payment(2, p("02.2024"), dec("30")),
            PaymentRecord::payment(3, p("03.2024"), dec("40")),
            PaymentRecord::payment(3, p("03.2024"), dec("20")),
            PaymentRecord::payment(4, p("11.2023"), dec("100")),
        ];
        Book::from_parts(ledgers, payments, BookOptions::default())
    }

    #[test]
    fn summary_totals() {
        let summary = summary(&fixture(), p("03.2024"));
        assert_eq!(summary.total_accrued, dec("200"));
        assert_eq!(summary.total_paid, dec("240"));
        assert_eq!(summary.period_income, dec("60"));
        assert_eq!(summary.total_debt, dec("310"));
        assert_eq!(summary.average_payment, dec("48"));
        assert_eq!(summary.debtor_count, 3);
        assert_eq!(summary.record_count, 6);
    }

    #[test]
    fn average_payment_of_empty_log_is_zero() {
        let summary = summary(&Book::default(), p("03.2024"));
        assert!(summary.average_payment.is_zero());
        assert!(summary.total_debt.is_zero());
    }

    #[test]
    fn trend_groups_by_period_in_order() {
        let book = fixture();
        let trend = income_trend(book.payments().iter(), p("12.2023"), p("03.2024"));
        let rows: Vec<(String, BigDecimal)> = trend
            .into_iter()
            .map(|r| (r.period.to_string(), r.income))
            .collect();
        assert_eq!(
            rows,
            [
                ("01.2024".to_string(), dec("50")),
                ("02.2024".to_string(), dec("30")),
                ("03.2024".to_string(), dec("60")),
            ]
        );
    }

    #[test]
    fn quarter_covers_three_months() {
        let book = fixture();
        let report = quarterly(book.payments().iter(), p("03.2024"));
        assert_eq!(report.start, p("01.2024"));
        assert_eq!(report.income, dec("140"));
        assert_eq!(report.average_monthly_income.round(2), dec("46.67"));
    }

    #[test]
    fn annual_income_is_per_calendar_year() {
        let book = fixture();
        let year = annual(book.payments().iter(), 2024);
        assert_eq!(year.income, dec("140"));
        assert_eq!(year.quarters, [dec("140"), dec("0"), dec("0"), dec("0")]);
        assert_eq!(annual(book.payments().iter(), 2023).quarters[3], dec("100"));
        assert_eq!(annual(book.payments().iter(), 2023).income, dec("100"));
        assert!(annual(book.payments().iter(), 2022).income.is_zero());
    }

    #[test]
    fn debtors_are_sorted_by_total() {
        let owners: Vec<OwnerId> = debtors(&fixture()).iter().map(|d| d.owner_id).collect();
        assert_eq!(owners, [1, 3, 4]);
    }

    #[test]
    fn residents_cannot_read_reports() {
        assert!(authorize(&Session::new(4, "Resident", Role::Resident)).is_err());
        assert!(authorize(&Session::new(1, "Admin", Role::Administrator)).is_ok());
    }
}
