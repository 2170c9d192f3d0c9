//! Pipeline state machine: pure decisions about process transitions.
//!
//! Legality at the single-record level is deliberately permissive so an
//! operator can correct mistakes: any non-terminal process may move to any
//! state. Terminal processes never move again. Bulk moves add an ordering
//! check on the candidate's master status.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  candidate::{CandidateStatus, DiscardReason, DocumentNumber, UserRef},
  process::{NewProcess, OutcomeFlags, Process, ProcessState, StageKey},
  reference::{CompanyId, SiteId, SupervisorId},
};

// ─── Single transition ───────────────────────────────────────────────────────

/// A stage-entry date written as a side effect of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStamp {
  pub stage: StageKey,
  pub date:  NaiveDate,
}

/// The computed effect of moving one process to a new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
  pub from:    ProcessState,
  pub to:      ProcessState,
  pub stamped: Option<StageStamp>,
  /// Only present for `Hired` / `NotApt` targets.
  pub outcome: Option<OutcomeFlags>,
}

impl TransitionPlan {
  pub fn apply(&self, process: &mut Process) {
    process.state = self.to;
    if let Some(stamp) = self.stamped {
      process.dates.set(stamp.stage, stamp.date);
    }
    if let Some(outcome) = self.outcome {
      process.outcome = outcome;
    }
  }
}

/// Decide the effect of moving `process` to `target` on `today`.
///
/// Entering a state whose stage date is still unset stamps it; an existing
/// date is never overwritten. Outcome flags are kept only for `Hired` and
/// `NotApt` targets and silently dropped otherwise.
pub fn plan_transition(
  process: &Process,
  target: ProcessState,
  flags: Option<OutcomeFlags>,
  today: NaiveDate,
) -> Result<TransitionPlan> {
  if process.state.is_terminal() {
    return Err(Error::ProcessClosed {
      process_id: process.process_id,
      state:      process.state,
    });
  }

  let stamped = target
    .stage()
    .filter(|stage| process.dates.get(*stage).is_none())
    .map(|stage| StageStamp { stage, date: stamp_date(process, stage, today) });

  let outcome = matches!(target, ProcessState::Hired | ProcessState::NotApt)
    .then(|| flags.unwrap_or_default());

  Ok(TransitionPlan { from: process.state, to: target, stamped, outcome })
}

/// The date stamped for a first entry into `stage`: today, clamped between
/// the nearest recorded neighbours so stage dates stay ordered. A future
/// convocation raises it; a later stage entered earlier (an operator going
/// back a step) lowers it.
fn stamp_date(process: &Process, stage: StageKey, today: NaiveDate) -> NaiveDate {
  let mut date = today;
  if let Some((_, later)) = process.dates.recorded_after(stage) {
    date = date.min(later);
  }
  if let Some((_, earlier)) = process.dates.recorded_before(stage) {
    date = date.max(earlier);
  }
  date
}

/// New master status for a candidate whose process enters `target`, or
/// `None` when the status must stay as it is.
///
/// The mapped status applies when it ranks strictly above the current one,
/// or when `target` is terminal: a candidate can be declared not apt (or
/// withdraw) from any stage.
pub fn master_status_after(
  current: CandidateStatus,
  target: ProcessState,
) -> Option<CandidateStatus> {
  let mapped = target.candidate_status();
  (target.is_terminal() || mapped.rank() > current.rank()).then_some(mapped)
}

/// Master status after opening a new process. A candidate whose previous
/// attempt ended (hired, not apt, withdrawn) starts over as convened.
pub fn master_status_on_open(current: CandidateStatus) -> Option<CandidateStatus> {
  let convened = CandidateStatus::Convened;
  (current.is_terminal() || convened.rank() > current.rank()).then_some(convened)
}

/// What a transition did, as reported to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
  pub process:          Process,
  /// `None` when the process was created by this operation.
  pub previous_state:   Option<ProcessState>,
  pub stamped:          Option<StageStamp>,
  /// Set when the candidate's master status changed.
  pub candidate_status: Option<CandidateStatus>,
}

// ─── Bulk transitions ────────────────────────────────────────────────────────

/// Company, site and supervisor assigned to processes opened by a mass
/// convocation. Resolved once by the caller and passed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConveneDefaults {
  pub company:    CompanyId,
  /// Falls back to the candidate's registration site when unset.
  #[serde(default)]
  pub site:       Option<SiteId>,
  #[serde(default)]
  pub supervisor: Option<SupervisorId>,
}

impl ConveneDefaults {
  pub fn new_process(&self, start_date: NaiveDate, registration_site: SiteId) -> NewProcess {
    NewProcess {
      start_date,
      company: self.company,
      site: self.site.unwrap_or(registration_site),
      supervisor: self.supervisor,
    }
  }
}

/// Move many candidates to one master status at once.
#[derive(Debug, Clone)]
pub struct BulkTransition {
  pub candidates:     Vec<DocumentNumber>,
  pub target:         CandidateStatus,
  /// Required when `target` is `Convened`.
  pub start_date:     Option<NaiveDate>,
  /// Recorded for `NotApt` / `Withdrawn` targets.
  pub discard_reason: Option<DiscardReason>,
  pub actor:          Option<UserRef>,
}

impl BulkTransition {
  /// Checks that must pass before any candidate is touched.
  pub fn validate(&self) -> Result<()> {
    if self.candidates.is_empty() {
      return Err(Error::Validation("no candidates selected".into()));
    }
    if self.target.process_state().is_none() {
      return Err(Error::InvalidTarget(self.target.key().into()));
    }
    if self.target == CandidateStatus::Convened && self.start_date.is_none() {
      return Err(Error::Validation(
        "a start date is required to convene candidates".into(),
      ));
    }
    Ok(())
  }

  pub fn records_discard_reason(&self) -> bool {
    matches!(self.target, CandidateStatus::NotApt | CandidateStatus::Withdrawn)
  }
}

/// Why one candidate of a bulk move was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
  NotFound,
  /// Already at or beyond the target status.
  NotEligible { current: CandidateStatus },
  NoActiveProcess,
  /// A process with the same start date and company already exists.
  DuplicateProcess,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCandidate {
  pub candidate: DocumentNumber,
  #[serde(flatten)]
  pub reason:    SkipReason,
}

/// Per-candidate decision of a bulk move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
  /// Open a new process from [`ConveneDefaults`].
  OpenProcess,
  /// Run the single-record transition on the active process.
  Transition { process_id: Uuid, target: ProcessState },
  /// No process to move; only the master status (and discard reason)
  /// change.
  StatusOnly,
  Skip(SkipReason),
}

/// Decide what a bulk move to `target` does for one candidate.
pub fn plan_bulk_member(
  current: CandidateStatus,
  active: Option<&Process>,
  target: CandidateStatus,
) -> BulkAction {
  if !(target.rank() > current.rank() || target.is_terminal()) {
    return BulkAction::Skip(SkipReason::NotEligible { current });
  }

  match (active, target.process_state()) {
    (_, None) => BulkAction::Skip(SkipReason::NotEligible { current }),
    (None, Some(ProcessState::Convened)) => BulkAction::OpenProcess,
    (None, Some(ProcessState::NotApt | ProcessState::Withdrawn)) => BulkAction::StatusOnly,
    (None, Some(_)) => BulkAction::Skip(SkipReason::NoActiveProcess),
    (Some(process), Some(state)) => {
      BulkAction::Transition { process_id: process.process_id, target: state }
    }
  }
}

/// Result of a bulk move.
#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
  pub updated:        usize,
  pub new_status_key: CandidateStatus,
  pub skipped:        Vec<SkippedCandidate>,
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;
  use crate::{ErrorKind, process::StageDates};

  fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 3, d).unwrap() }

  fn convened_process(start: NaiveDate) -> Process {
    Process {
      process_id: Uuid::new_v4(),
      candidate:  "12345678".into(),
      start_date: start,
      company:    1,
      site:       1,
      supervisor: None,
      state:      ProcessState::Convened,
      dates:      StageDates { convened: Some(start), ..Default::default() },
      outcome:    OutcomeFlags::default(),
      visible:    true,
      created_at: Utc.timestamp_opt(0, 0).unwrap(),
    }
  }

  #[test]
  fn first_entry_stamps_today() {
    let p = convened_process(day(1));
    let plan = plan_transition(&p, ProcessState::Confirmed, None, day(2)).unwrap();
    assert_eq!(
      plan.stamped,
      Some(StageStamp { stage: StageKey::Confirmed, date: day(2) })
    );
    assert_eq!(plan.outcome, None);
  }

  #[test]
  fn reentry_keeps_existing_date() {
    let mut p = convened_process(day(1));
    plan_transition(&p, ProcessState::Theory, None, day(3))
      .unwrap()
      .apply(&mut p);
    plan_transition(&p, ProcessState::Confirmed, None, day(4))
      .unwrap()
      .apply(&mut p);
    let back = plan_transition(&p, ProcessState::Theory, None, day(9)).unwrap();
    assert_eq!(back.stamped, None);
    back.apply(&mut p);
    assert_eq!(p.dates.theory, Some(day(3)));
  }

  #[test]
  fn stamp_is_raised_to_future_convocation() {
    let p = convened_process(day(10));
    let plan = plan_transition(&p, ProcessState::Confirmed, None, day(8)).unwrap();
    assert_eq!(plan.stamped.unwrap().date, day(10));
  }

  #[test]
  fn stamp_is_capped_by_later_stage() {
    let mut p = convened_process(day(1));
    plan_transition(&p, ProcessState::Theory, None, day(3))
      .unwrap()
      .apply(&mut p);
    let plan = plan_transition(&p, ProcessState::Confirmed, None, day(6)).unwrap();
    assert_eq!(plan.stamped.unwrap().date, day(3));
  }

  #[test]
  fn outcome_flags_only_kept_for_closing_targets() {
    let p = convened_process(day(1));
    let flags = OutcomeFlags { sales_objective_met: true, attitude_exception_applies: true };

    let practice = plan_transition(&p, ProcessState::Practice, Some(flags), day(2)).unwrap();
    assert_eq!(practice.outcome, None);

    let hired = plan_transition(&p, ProcessState::Hired, Some(flags), day(2)).unwrap();
    assert_eq!(hired.outcome, Some(flags));

    let not_apt = plan_transition(&p, ProcessState::NotApt, None, day(2)).unwrap();
    assert_eq!(not_apt.outcome, Some(OutcomeFlags::default()));
    assert_eq!(not_apt.stamped, None);
  }

  #[test]
  fn terminal_processes_are_absorbing() {
    for terminal in [ProcessState::Hired, ProcessState::NotApt, ProcessState::Withdrawn] {
      let mut p = convened_process(day(1));
      p.state = terminal;
      for target in ProcessState::ALL {
        let err = plan_transition(&p, target, None, day(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(matches!(err, Error::ProcessClosed { state, .. } if state == terminal));
      }
    }
  }

  #[test]
  fn master_status_only_moves_forward_or_to_terminal() {
    use CandidateStatus as C;
    assert_eq!(
      master_status_after(C::Convened, ProcessState::Theory),
      Some(C::TheoryTraining)
    );
    assert_eq!(master_status_after(C::PracticeTraining, ProcessState::Confirmed), None);
    assert_eq!(master_status_after(C::Confirmed, ProcessState::Confirmed), None);
    assert_eq!(
      master_status_after(C::PracticeTraining, ProcessState::Withdrawn),
      Some(C::Withdrawn)
    );
    assert_eq!(master_status_after(C::Hired, ProcessState::NotApt), Some(C::NotApt));
  }

  #[test]
  fn opening_a_process_restarts_closed_candidates() {
    use CandidateStatus as C;
    assert_eq!(master_status_on_open(C::Registered), Some(C::Convened));
    assert_eq!(master_status_on_open(C::Withdrawn), Some(C::Convened));
    assert_eq!(master_status_on_open(C::Convened), None);
    assert_eq!(master_status_on_open(C::TheoryTraining), None);
  }

  /// Every sequence of three transitions keeps the status rank monotonic,
  /// except for moves to a terminal status.
  #[test]
  fn status_rank_never_regresses_over_sequences() {
    for a in ProcessState::ALL {
      for b in ProcessState::ALL {
        for c in ProcessState::ALL {
          let mut p = convened_process(day(1));
          let mut status = CandidateStatus::Convened;
          for (i, target) in [a, b, c].into_iter().enumerate() {
            let Ok(plan) = plan_transition(&p, target, None, day(2 + i as u32)) else {
              assert!(p.state.is_terminal());
              continue;
            };
            plan.apply(&mut p);
            if let Some(next) = master_status_after(status, target) {
              assert!(next.rank() > status.rank() || next.is_terminal());
              status = next;
            }
            assert!(p.dates.is_ordered());
          }
        }
      }
    }
  }

  #[test]
  fn bulk_convene_without_start_date_is_rejected() {
    let req = BulkTransition {
      candidates:     vec!["12345678".into()],
      target:         CandidateStatus::Convened,
      start_date:     None,
      discard_reason: None,
      actor:          None,
    };
    assert_eq!(req.validate().unwrap_err().kind(), ErrorKind::Validation);
  }

  #[test]
  fn bulk_to_registered_is_invalid() {
    let req = BulkTransition {
      candidates:     vec!["12345678".into()],
      target:         CandidateStatus::Registered,
      start_date:     None,
      discard_reason: None,
      actor:          None,
    };
    assert_eq!(req.validate().unwrap_err().kind(), ErrorKind::InvalidState);
  }

  #[test]
  fn bulk_member_plans() {
    use CandidateStatus as C;
    let p = convened_process(day(1));

    assert_eq!(plan_bulk_member(C::Registered, None, C::Convened), BulkAction::OpenProcess);
    assert_eq!(
      plan_bulk_member(C::Convened, Some(&p), C::TheoryTraining),
      BulkAction::Transition { process_id: p.process_id, target: ProcessState::Theory }
    );
    assert_eq!(
      plan_bulk_member(C::TheoryTraining, Some(&p), C::Confirmed),
      BulkAction::Skip(SkipReason::NotEligible { current: C::TheoryTraining })
    );
    assert_eq!(
      plan_bulk_member(C::Registered, None, C::Confirmed),
      BulkAction::Skip(SkipReason::NoActiveProcess)
    );
    assert_eq!(plan_bulk_member(C::Registered, None, C::Withdrawn), BulkAction::StatusOnly);
    assert_eq!(
      plan_bulk_member(C::PracticeTraining, Some(&p), C::NotApt),
      BulkAction::Transition { process_id: p.process_id, target: ProcessState::NotApt }
    );
    assert_eq!(
      plan_bulk_member(C::Registered, None, C::Hired),
      BulkAction::Skip(SkipReason::NoActiveProcess)
    );
  }

  #[test]
  fn convene_defaults_fall_back_to_registration_site() {
    let defaults = ConveneDefaults { company: 3, site: None, supervisor: Some(7) };
    let new = defaults.new_process(day(1), 42);
    assert_eq!(new.site, 42);
    assert_eq!(new.company, 3);
    assert_eq!(new.supervisor, Some(7));
  }
}
