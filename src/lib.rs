//! Debt ledgers, payment allocation and billing reports for a housing-management company.

pub mod allocator;
pub mod book;
pub mod error;
pub mod ledger;
pub mod payment;
pub mod period;
pub mod report;
pub mod session;
pub mod storage;

pub use allocator::{Allocation, allocate};
pub use book::{Book, BookOptions, OverpaymentPolicy, PaymentReceipt, SettledLedgerPolicy};
pub use error::{BillingError, Result};
pub use ledger::{DebtLedger, OwnerId, ServiceCategory};
pub use payment::PaymentRecord;
pub use period::Period;
pub use session::{Action, Role, Session};
