use crate::error::{BillingError, Result};
use bigdecimal::{BigDecimal, Zero};
use std::fmt;
use std::str::FromStr;

pub type OwnerId = u32;

/// A billed service. Payments are always applied in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceCategory {
    Water,
    Electric,
}

impl ServiceCategory {
    pub const PRIORITY: [ServiceCategory; 2] =
        [ServiceCategory::Water, ServiceCategory::Electric];

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceCategory::Water => "water",
            ServiceCategory::Electric => "electric",
        }
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceCategory {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "water" | "водоснабжение" => Ok(ServiceCategory::Water),
            "electric" | "electricity" | "электроснабжение" => Ok(ServiceCategory::Electric),
            _ => Err(BillingError::InvalidCategory(s.to_string())),
        }
    }
}

/// Outstanding debt of one owner, split by service. Balances never go below zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtLedger {
    pub owner_id: OwnerId,
    water: BigDecimal,
    electric: BigDecimal,
}

impl DebtLedger {
    pub fn new(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            water: BigDecimal::zero(),
            electric: BigDecimal::zero(),
        }
    }

    /// Builds a ledger from stored balances, rejecting negative amounts.
    pub fn with_balances(
        owner_id: OwnerId,
        water: BigDecimal,
        electric: BigDecimal,
    ) -> Result<Self> {
        for balance in [&water, &electric] {
            if *balance < BigDecimal::zero() {
                return Err(BillingError::InvalidAmount(balance.clone()));
            }
        }
        Ok(Self {
            owner_id,
            water,
            electric,
        })
    }

    pub fn water(&self) -> &BigDecimal {
        &self.water
    }

    pub fn electric(&self) -> &BigDecimal {
        &self.electric
    }

    pub(crate) fn balance_mut(&mut self, category: ServiceCategory) -> &mut BigDecimal {
        match category {
            ServiceCategory::Water => &mut self.water,
            ServiceCategory::Electric => &mut self.electric,
        }
    }

    pub fn total(&self) -> BigDecimal {
        &self.water + &self.electric
    }

    pub fn is_settled(&self) -> bool {
        self.water.is_zero() && self.electric.is_zero()
    }

    /// Adds a billed amount to one category.
    pub fn accrue(&mut self, category: ServiceCategory, amount: &BigDecimal) -> Result<()> {
        if *amount <= BigDecimal::zero() {
            return Err(BillingError::InvalidAmount(amount.clone()));
        }
        *self.balance_mut(category) += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn new_ledger_is_settled() {
        let ledger = DebtLedger::new(7);
        assert!(ledger.is_settled());
        assert_eq!(ledger.total(), BigDecimal::zero());
    }

    #[test]
    fn accrue_adds_to_one_category() {
        let mut ledger = DebtLedger::new(1);
        ledger.accrue(ServiceCategory::Electric, &dec("12.50")).unwrap();
        ledger.accrue(ServiceCategory::Electric, &dec("7.50")).unwrap();
        assert_eq!(*ledger.electric(), dec("20"));
        assert!(ledger.water().is_zero());
        assert!(!ledger.is_settled());
    }

    #[test]
    fn accrue_rejects_non_positive_amounts() {
        let mut ledger = DebtLedger::new(1);
        assert!(matches!(
            ledger.accrue(ServiceCategory::Water, &dec("0")),
            Err(BillingError::InvalidAmount(_))
        ));
        assert!(ledger.accrue(ServiceCategory::Water, &dec("-3")).is_err());
        assert!(ledger.is_settled());
    }

    #[test]
    fn negative_stored_balance_is_rejected() {
        assert!(DebtLedger::with_balances(1, dec("-1"), dec("0")).is_err());
    }

    #[test]
    fn category_parsing_accepts_service_names() {
        assert_eq!("Water".parse::<ServiceCategory>().unwrap(), ServiceCategory::Water);
        assert_eq!(
            "Электроснабжение".parse::<ServiceCategory>().unwrap(),
            ServiceCategory::Electric
        );
        assert!("gas".parse::<ServiceCategory>().is_err());
    }
}
