//! Process: one attempt by a candidate through the hiring pipeline.
//!
//! A candidate may have many processes over time (one per client company
//! and start date). Processes are never deleted; a terminal state ends the
//! lifecycle but the row is kept for audit.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  candidate::{CandidateStatus, DocumentNumber},
  reference::{CompanyId, SiteId, SupervisorId},
};

// ─── State ───────────────────────────────────────────────────────────────────

/// Detailed pipeline state of a process.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ProcessState {
  #[serde(rename = "CONVOCADO")]
  Convened,
  #[serde(rename = "CONFIRMADO")]
  Confirmed,
  #[serde(rename = "TEORIA")]
  Theory,
  #[serde(rename = "PRACTICA")]
  Practice,
  #[serde(rename = "CONTRATADO")]
  Hired,
  #[serde(rename = "NO_APTO")]
  NotApt,
  #[serde(rename = "ABANDONO")]
  Withdrawn,
}

impl ProcessState {
  pub const ALL: [Self; 7] = [
    Self::Convened,
    Self::Confirmed,
    Self::Theory,
    Self::Practice,
    Self::Hired,
    Self::NotApt,
    Self::Withdrawn,
  ];

  pub fn key(self) -> &'static str {
    match self {
      Self::Convened => "CONVOCADO",
      Self::Confirmed => "CONFIRMADO",
      Self::Theory => "TEORIA",
      Self::Practice => "PRACTICA",
      Self::Hired => "CONTRATADO",
      Self::NotApt => "NO_APTO",
      Self::Withdrawn => "ABANDONO",
    }
  }

  /// Terminal states are absorbing: a process in one of them never moves
  /// again.
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Hired | Self::NotApt | Self::Withdrawn)
  }

  /// The stage whose entry date is stamped when the process enters this
  /// state. `NotApt` and `Withdrawn` have none.
  pub fn stage(self) -> Option<StageKey> {
    match self {
      Self::Convened => Some(StageKey::Convened),
      Self::Confirmed => Some(StageKey::Confirmed),
      Self::Theory => Some(StageKey::Theory),
      Self::Practice => Some(StageKey::Practice),
      Self::Hired => Some(StageKey::Hire),
      Self::NotApt | Self::Withdrawn => None,
    }
  }

  /// Master status a candidate is moved to when its process enters this
  /// state (subject to the monotonic-progress rule).
  pub fn candidate_status(self) -> CandidateStatus {
    match self {
      Self::Convened => CandidateStatus::Convened,
      Self::Confirmed => CandidateStatus::Confirmed,
      Self::Theory => CandidateStatus::TheoryTraining,
      Self::Practice => CandidateStatus::PracticeTraining,
      Self::Hired => CandidateStatus::Hired,
      Self::NotApt => CandidateStatus::NotApt,
      Self::Withdrawn => CandidateStatus::Withdrawn,
    }
  }
}

impl fmt::Display for ProcessState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.key()) }
}

impl FromStr for ProcessState {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|state| state.key() == s)
      .ok_or_else(|| Error::unknown_key("process state", s))
  }
}

// ─── Stage dates ─────────────────────────────────────────────────────────────

/// One of the five stage-entry date fields, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StageKey {
  #[serde(rename = "convocado")]
  Convened,
  #[serde(rename = "confirmado")]
  Confirmed,
  #[serde(rename = "teorico")]
  Theory,
  #[serde(rename = "practico")]
  Practice,
  #[serde(rename = "contratacion")]
  Hire,
}

impl StageKey {
  pub const ORDER: [Self; 5] = [
    Self::Convened,
    Self::Confirmed,
    Self::Theory,
    Self::Practice,
    Self::Hire,
  ];

  pub fn key(self) -> &'static str {
    match self {
      Self::Convened => "convocado",
      Self::Confirmed => "confirmado",
      Self::Theory => "teorico",
      Self::Practice => "practico",
      Self::Hire => "contratacion",
    }
  }

  fn index(self) -> usize { self as usize }

  pub fn next(self) -> Option<Self> { Self::ORDER.get(self.index() + 1).copied() }

  pub fn previous(self) -> Option<Self> {
    self.index().checked_sub(1).map(|i| Self::ORDER[i])
  }
}

impl fmt::Display for StageKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.key()) }
}

impl FromStr for StageKey {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ORDER
      .into_iter()
      .find(|stage| stage.key() == s)
      .ok_or_else(|| Error::unknown_key("stage", s))
  }
}

/// The date each stage was first entered. Non-decreasing in pipeline order
/// wherever two dates are present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDates {
  pub convened:  Option<NaiveDate>,
  pub confirmed: Option<NaiveDate>,
  pub theory:    Option<NaiveDate>,
  pub practice:  Option<NaiveDate>,
  pub hire:      Option<NaiveDate>,
}

impl StageDates {
  pub fn get(&self, stage: StageKey) -> Option<NaiveDate> {
    match stage {
      StageKey::Convened => self.convened,
      StageKey::Confirmed => self.confirmed,
      StageKey::Theory => self.theory,
      StageKey::Practice => self.practice,
      StageKey::Hire => self.hire,
    }
  }

  pub fn set(&mut self, stage: StageKey, date: NaiveDate) {
    let slot = match stage {
      StageKey::Convened => &mut self.convened,
      StageKey::Confirmed => &mut self.confirmed,
      StageKey::Theory => &mut self.theory,
      StageKey::Practice => &mut self.practice,
      StageKey::Hire => &mut self.hire,
    };
    *slot = Some(date);
  }

  /// Closest earlier stage with a recorded date.
  pub fn recorded_before(&self, stage: StageKey) -> Option<(StageKey, NaiveDate)> {
    std::iter::successors(stage.previous(), |s| s.previous())
      .find_map(|s| self.get(s).map(|d| (s, d)))
  }

  /// Closest later stage with a recorded date.
  pub fn recorded_after(&self, stage: StageKey) -> Option<(StageKey, NaiveDate)> {
    std::iter::successors(stage.next(), |s| s.next())
      .find_map(|s| self.get(s).map(|d| (s, d)))
  }

  pub fn is_ordered(&self) -> bool {
    let present: Vec<NaiveDate> =
      StageKey::ORDER.iter().filter_map(|s| self.get(*s)).collect();
    present.windows(2).all(|w| w[0] <= w[1])
  }
}

/// Outcome of the practical evaluation, recorded when a process closes as
/// hired or not apt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeFlags {
  pub sales_objective_met:        bool,
  /// Kept on despite failing other tests, on attitude grounds.
  pub attitude_exception_applies: bool,
}

// ─── Process ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
  pub process_id: Uuid,
  pub candidate:  DocumentNumber,
  pub start_date: NaiveDate,
  pub company:    CompanyId,
  pub site:       SiteId,
  /// Cleared when the supervisor is removed.
  pub supervisor: Option<SupervisorId>,
  pub state:      ProcessState,
  pub dates:      StageDates,
  pub outcome:    OutcomeFlags,
  /// Board visibility; independent of the candidate's.
  pub visible:    bool,
  pub created_at: DateTime<Utc>,
}

impl Process {
  pub fn is_active(&self) -> bool { !self.state.is_terminal() }
}

/// Input for opening a new process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProcess {
  pub start_date: NaiveDate,
  pub company:    CompanyId,
  pub site:       SiteId,
  pub supervisor: Option<SupervisorId>,
}

/// The candidate's current hiring attempt: the most recent non-terminal
/// process by start date, ties broken by creation time.
///
/// This is a pure function of the process history so every backend derives
/// the same answer regardless of insertion order.
pub fn active_process(processes: &[Process]) -> Option<&Process> {
  processes
    .iter()
    .filter(|p| p.is_active())
    .max_by_key(|p| (p.start_date, p.created_at))
}
