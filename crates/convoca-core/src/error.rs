//! Error types for `convoca-core`.
//!
//! Business-rule rejections are ordinary variants carrying enough detail
//! (the conflicting neighbour date, the blocking attendance event) for an
//! operator to correct the input. Callers branch on [`Error::kind`].

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  candidate::DocumentNumber,
  process::{ProcessState, StageKey},
};

/// Coarse classification of an [`Error`], stable across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  NotFound,
  InvalidState,
  Validation,
  AlreadyAbsent,
  CycleComplete,
  OutOfWindow,
  DateOrdering,
  /// Lock contention that outlived the retry policy.
  TransientStore,
  /// A storage fault that is not a business rejection. Never produced by
  /// this crate; backends use it for their own failures.
  Internal,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("candidate not found: {0}")]
  CandidateNotFound(DocumentNumber),

  #[error("process not found: {0}")]
  ProcessNotFound(Uuid),

  #[error("{entity} not found: {id}")]
  ReferenceNotFound { entity: &'static str, id: i64 },

  #[error("unknown {domain} key: {key:?}")]
  UnknownKey { domain: &'static str, key: String },

  #[error("candidate {0} has no active process")]
  NoActiveProcess(DocumentNumber),

  #[error("{0} is not a pipeline target")]
  InvalidTarget(String),

  #[error("process {process_id} is closed in state {state}")]
  ProcessClosed {
    process_id: Uuid,
    state:      ProcessState,
  },

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("process {process_id} was already marked absent on {date} (event {event_id})")]
  AlreadyAbsent {
    process_id: Uuid,
    date:       NaiveDate,
    event_id:   Uuid,
  },

  #[error("process {process_id} already completed its entry/exit cycle on {date}")]
  CycleComplete {
    process_id: Uuid,
    date:       NaiveDate,
    entry_id:   Uuid,
    exit_id:    Uuid,
  },

  #[error("the {stage} date cannot be edited while the process is {state}")]
  OutOfWindow {
    stage: StageKey,
    state: ProcessState,
  },

  #[error("{stage} date {date} conflicts with the {neighbor} date {neighbor_date}")]
  DateOrdering {
    stage:         StageKey,
    date:          NaiveDate,
    neighbor:      StageKey,
    neighbor_date: NaiveDate,
  },

  #[error("store stayed locked after {attempts} attempts")]
  TransientStore { attempts: u32 },
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::CandidateNotFound(_)
      | Self::ProcessNotFound(_)
      | Self::ReferenceNotFound { .. } => ErrorKind::NotFound,
      Self::UnknownKey { .. }
      | Self::InvalidTarget(_)
      | Self::NoActiveProcess(_)
      | Self::ProcessClosed { .. } => ErrorKind::InvalidState,
      Self::Validation(_) => ErrorKind::Validation,
      Self::AlreadyAbsent { .. } => ErrorKind::AlreadyAbsent,
      Self::CycleComplete { .. } => ErrorKind::CycleComplete,
      Self::OutOfWindow { .. } => ErrorKind::OutOfWindow,
      Self::DateOrdering { .. } => ErrorKind::DateOrdering,
      Self::TransientStore { .. } => ErrorKind::TransientStore,
    }
  }

  pub(crate) fn unknown_key(domain: &'static str, key: &str) -> Self {
    Self::UnknownKey { domain, key: key.to_owned() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
