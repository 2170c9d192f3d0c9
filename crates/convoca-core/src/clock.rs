//! Wall-clock access in the operational time zone.
//!
//! Attendance cutoffs and stage-date stamps are interpreted in one fixed UTC
//! offset (Lima, UTC-5, in production). Everything that needs "now" or
//! "today" goes through a [`Clock`] so tests can pin the time.

use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};

use crate::{Error, Result};

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<FixedOffset>;

  fn today(&self) -> NaiveDate { self.now().date_naive() }
}

/// Build a [`FixedOffset`] from minutes east of UTC (negative for the
/// Americas).
pub fn offset_from_minutes(minutes: i32) -> Result<FixedOffset> {
  FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
    Error::Validation(format!("utc offset of {minutes} minutes is out of range"))
  })
}

/// The system clock shifted into a fixed offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
  offset: FixedOffset,
}

impl SystemClock {
  pub fn new(offset: FixedOffset) -> Self { Self { offset } }
}

impl Clock for SystemClock {
  fn now(&self) -> DateTime<FixedOffset> { Utc::now().with_timezone(&self.offset) }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
  now: Mutex<DateTime<FixedOffset>>,
}

impl FixedClock {
  pub fn new(now: DateTime<FixedOffset>) -> Self { Self { now: Mutex::new(now) } }

  pub fn set(&self, now: DateTime<FixedOffset>) {
    *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
  }

  pub fn advance(&self, by: Duration) {
    let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
    *now += by;
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<FixedOffset> {
    *self.now.lock().unwrap_or_else(|e| e.into_inner())
  }
}
