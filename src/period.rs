use crate::error::{BillingError, Result};
use jiff::civil::Date;
use std::fmt;
use std::str::FromStr;

/// A billing month, written `MM.yyyy` in payment records.
///
/// Field order matters: the derived ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i16,
    month: i8,
}

impl Period {
    pub fn new(month: i8, year: i16) -> Result<Self> {
        // Date::new validates both the month and the year range.
        Date::new(year, month, 1)
            .map(Self::from_date)
            .map_err(|_| BillingError::InvalidPeriod(format!("{:02}.{:04}", month, year)))
    }

    pub fn from_date(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month containing today's date in the system time zone.
    pub fn current() -> Self {
        Self::from_date(jiff::Zoned::now().date())
    }

    pub fn month(self) -> i8 {
        self.month
    }

    pub fn year(self) -> i16 {
        self.year
    }

    /// Calendar quarter, 1 through 4.
    pub fn quarter(self) -> i8 {
        (self.month - 1) / 3 + 1
    }

    /// The period `months` months before this one.
    pub fn previous(self, months: u32) -> Self {
        let index = i64::from(self.year) * 12 + i64::from(self.month - 1) - i64::from(months);
        Self {
            year: index.div_euclid(12) as i16,
            month: index.rem_euclid(12) as i8 + 1,
        }
    }

    pub fn is_within(self, start: Period, end: Period) -> bool {
        start <= self && self <= end
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:04}", self.month, self.year)
    }
}

impl FromStr for Period {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || BillingError::InvalidPeriod(s.to_string());
        let (month, year) = s.trim().split_once('.').ok_or_else(invalid)?;
        // Integer parsing alone would accept a leading sign.
        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if month.len() > 2 || year.len() != 4 || !digits(month) || !digits(year) {
            return Err(invalid());
        }
        let month: i8 = month.parse().map_err(|_| invalid())?;
        let year: i16 = year.parse().map_err(|_| invalid())?;
        Period::new(month, year).map_err(|_| invalid())
    }
}
