use crate::session::{Action, Role};
use bigdecimal::BigDecimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("amount must be greater than zero, got {0}")]
    InvalidAmount(BigDecimal),

    #[error("payment of {amount} exceeds outstanding debt of {total}")]
    OverpaymentRejected { amount: BigDecimal, total: BigDecimal },

    #[error("no ledger for owner {0}")]
    UnknownOwner(u32),

    #[error("role {role} may not {action}")]
    Forbidden { role: Role, action: Action },

    #[error("invalid billing period {0:?}, expected MM.yyyy")]
    InvalidPeriod(String),

    #[error("unknown service category {0:?}")]
    InvalidCategory(String),

    #[error("unknown role {0:?}")]
    InvalidRole(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("unexpected headers {found:?}, expected {expected:?}")]
    UnexpectedHeaders { found: Vec<String>, expected: Vec<String> },

    #[error("line {line}: {message}")]
    Parse { line: u64, message: String },
}

pub type Result<T> = std::result::Result<T, BillingError>;
