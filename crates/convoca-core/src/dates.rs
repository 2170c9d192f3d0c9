//! Date-consistency validator for manual stage-date corrections.
//!
//! An operator may correct the date of the stage a process is in, or set
//! the date of the stage immediately after it. Older history is frozen.
//! Either way the new date must sit between the nearest recorded dates on
//! both sides.

use chrono::NaiveDate;

use crate::{
  Error, Result,
  process::{Process, ProcessState, StageKey},
};

/// Stages whose date may be edited while a process is in `state`. A
/// closed process has none.
pub fn editable_stages(state: ProcessState) -> Vec<StageKey> {
  if state.is_terminal() {
    return Vec::new();
  }
  state
    .stage()
    .map(|current| std::iter::once(current).chain(current.next()).collect())
    .unwrap_or_default()
}

/// Check that `stage` of `process` may be set to `date`.
pub fn validate_date_edit(process: &Process, stage: StageKey, date: NaiveDate) -> Result<()> {
  if !editable_stages(process.state).contains(&stage) {
    return Err(Error::OutOfWindow { stage, state: process.state });
  }

  if let Some((neighbor, neighbor_date)) = process.dates.recorded_before(stage) {
    if date < neighbor_date {
      return Err(Error::DateOrdering { stage, date, neighbor, neighbor_date });
    }
  }
  if let Some((neighbor, neighbor_date)) = process.dates.recorded_after(stage) {
    if date > neighbor_date {
      return Err(Error::DateOrdering { stage, date, neighbor, neighbor_date });
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use uuid::Uuid;

  use super::*;
  use crate::{
    ErrorKind,
    process::{OutcomeFlags, StageDates},
  };

  fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 3, d).unwrap() }

  fn process(state: ProcessState, dates: StageDates) -> Process {
    Process {
      process_id: Uuid::new_v4(),
      candidate: "12345678".into(),
      start_date: day(1),
      company: 1,
      site: 1,
      supervisor: None,
      state,
      dates,
      outcome: OutcomeFlags::default(),
      visible: true,
      created_at: Utc.timestamp_opt(0, 0).unwrap(),
    }
  }

  #[test]
  fn window_is_current_and_next_stage() {
    assert_eq!(
      editable_stages(ProcessState::Confirmed),
      vec![StageKey::Confirmed, StageKey::Theory]
    );
    assert_eq!(
      editable_stages(ProcessState::Practice),
      vec![StageKey::Practice, StageKey::Hire]
    );
  }

  #[test]
  fn closed_processes_have_no_editable_stage() {
    for state in [ProcessState::Hired, ProcessState::NotApt, ProcessState::Withdrawn] {
      assert!(editable_stages(state).is_empty(), "{state}");
    }
    let p = process(ProcessState::Hired, StageDates {
      convened: Some(day(1)),
      hire: Some(day(4)),
      ..Default::default()
    });
    let err = validate_date_edit(&p, StageKey::Hire, day(5)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfWindow);
  }

  #[test]
  fn editing_two_stages_ahead_is_out_of_window() {
    let p = process(ProcessState::Confirmed, StageDates {
      convened: Some(day(1)),
      confirmed: Some(day(2)),
      ..Default::default()
    });
    let err = validate_date_edit(&p, StageKey::Practice, day(5)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfWindow);

    let err = validate_date_edit(&p, StageKey::Convened, day(1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfWindow);
  }

  #[test]
  fn theory_before_confirmed_names_the_neighbour() {
    let p = process(ProcessState::Theory, StageDates {
      convened: Some(day(1)),
      confirmed: Some(day(5)),
      theory: Some(day(6)),
      ..Default::default()
    });
    let err = validate_date_edit(&p, StageKey::Theory, day(4)).unwrap_err();
    assert!(matches!(
      err,
      Error::DateOrdering { neighbor: StageKey::Confirmed, neighbor_date, .. }
        if neighbor_date == day(5)
    ));
  }

  #[test]
  fn later_neighbour_bounds_the_edit() {
    let p = process(ProcessState::Confirmed, StageDates {
      convened: Some(day(1)),
      confirmed: Some(day(2)),
      theory: Some(day(4)),
      ..Default::default()
    });
    let err = validate_date_edit(&p, StageKey::Confirmed, day(5)).unwrap_err();
    assert!(matches!(err, Error::DateOrdering { neighbor: StageKey::Theory, .. }));
    validate_date_edit(&p, StageKey::Confirmed, day(4)).unwrap();
  }

  #[test]
  fn missing_neighbours_are_skipped() {
    let p = process(ProcessState::Convened, StageDates {
      convened: Some(day(3)),
      ..Default::default()
    });
    validate_date_edit(&p, StageKey::Confirmed, day(3)).unwrap();
    let err = validate_date_edit(&p, StageKey::Confirmed, day(2)).unwrap_err();
    assert!(matches!(err, Error::DateOrdering { neighbor: StageKey::Convened, .. }));
  }
}
