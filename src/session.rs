use crate::error::{BillingError, Result};
use crate::ledger::OwnerId;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Administrator,
    Manager,
    Employee,
    Resident,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Administrator => "administrator",
            Role::Manager => "manager",
            Role::Employee => "employee",
            Role::Resident => "resident",
        })
    }
}

impl FromStr for Role {
    type Err = BillingError;

    /// Accepts the role names stored in the user table, in either language.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "administrator" | "admin" | "администратор" => Ok(Role::Administrator),
            "manager" | "руководитель" => Ok(Role::Manager),
            "employee" | "сотрудник" => Ok(Role::Employee),
            "resident" | "житель" => Ok(Role::Resident),
            _ => Err(BillingError::InvalidRole(s.to_string())),
        }
    }
}

/// Something a session may or may not be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ProcessPayments,
    CreateAccruals,
    ViewReports,
    ViewLedger(OwnerId),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::ProcessPayments => f.write_str("process payments"),
            Action::CreateAccruals => f.write_str("create accruals"),
            Action::ViewReports => f.write_str("view financial reports"),
            Action::ViewLedger(owner) => write!(f, "view the ledger of owner {}", owner),
        }
    }
}

/// The authenticated user on whose behalf an operation runs.
///
/// Passed explicitly to every operation that needs identity or role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: u32,
    pub full_name: String,
    pub role: Role,
}

impl Session {
    pub fn new(user_id: u32, full_name: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            full_name: full_name.into(),
            role,
        }
    }

    pub fn can(&self, action: Action) -> bool {
        match action {
            Action::ProcessPayments | Action::CreateAccruals | Action::ViewReports => {
                matches!(self.role, Role::Administrator | Role::Manager)
            }
            // Residents are linked to their owner record by user id.
            Action::ViewLedger(owner) => self.role != Role::Resident || owner == self.user_id,
        }
    }

    pub fn require(&self, action: Action) -> Result<()> {
        if self.can(action) {
            Ok(())
        } else {
            log::warn!("{} ({}) denied: {}", self.full_name, self.role, action);
            Err(BillingError::Forbidden {
                role: self.role,
                action,
            })
        }
    }
}
