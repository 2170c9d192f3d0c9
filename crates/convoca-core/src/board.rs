//! Board visibility scopes.
//!
//! Operators archive old convocations from the working board by day or by
//! calendar month. Hidden rows stay in the store.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum DateScope {
  Day { date: NaiveDate },
  Month { year: i32, month: u32 },
}

impl DateScope {
  pub fn month(year: i32, month: u32) -> Result<Self> {
    if !(1..=12).contains(&month) {
      return Err(Error::Validation(format!("month {month} is out of range")));
    }
    Ok(Self::Month { year, month })
  }

  /// Inclusive start and exclusive end of the scope.
  pub fn bounds(&self) -> Result<(NaiveDate, NaiveDate)> {
    match *self {
      Self::Day { date } => {
        let end = date
          .succ_opt()
          .ok_or_else(|| Error::Validation(format!("{date} has no following day")))?;
        Ok((date, end))
      }
      Self::Month { year, month } => {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
          .ok_or_else(|| Error::Validation(format!("invalid month {year}-{month:02}")))?;
        let end = start
          .checked_add_months(Months::new(1))
          .ok_or_else(|| Error::Validation(format!("invalid month {year}-{month:02}")))?;
        Ok((start, end))
      }
    }
  }
}
