//! Attendance ledger types and the check-in/check-out classifier.
//!
//! Each process gets at most one ENTRY and one EXIT per local day. The
//! classifier decides which of the two a mark becomes and how punctual it
//! was, from the events already on record for that day and the time of the
//! mark. It never writes; the store runs it inside the insert transaction.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  candidate::{DocumentNumber, UserRef},
  pipeline::TransitionOutcome,
  process::ProcessState,
};

// ─── Vocabulary ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Movement {
  #[serde(rename = "ENTRADA")]
  Entry,
  #[serde(rename = "SALIDA")]
  Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
  #[serde(rename = "A")]
  OnTime,
  #[serde(rename = "T")]
  Late,
  #[serde(rename = "F")]
  Absent,
  /// Set by staff on an absence with a valid excuse; never produced by the
  /// classifier.
  #[serde(rename = "J")]
  Justified,
}

/// Pipeline phase an attendance event counts towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendancePhase {
  #[serde(rename = "CONVOCADO")]
  Convened,
  #[serde(rename = "CONFIRMADO")]
  Confirmed,
  #[serde(rename = "TEORIA")]
  Theory,
  #[serde(rename = "PRACTICA")]
  Practice,
}

/// Informational flag on an EXIT: did the candidate leave before the late
/// cutoff?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitTiming {
  Early,
  OnTime,
}

keyed!(Movement, "movement", { Entry => "ENTRADA", Exit => "SALIDA" });
keyed!(Quality, "attendance quality", {
  OnTime => "A",
  Late => "T",
  Absent => "F",
  Justified => "J",
});
keyed!(AttendancePhase, "attendance phase", {
  Convened => "CONVOCADO",
  Confirmed => "CONFIRMADO",
  Theory => "TEORIA",
  Practice => "PRACTICA",
});

// ─── Events ──────────────────────────────────────────────────────────────────

/// One immutable row of the attendance ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEvent {
  pub event_id:    Uuid,
  pub process_id:  Uuid,
  /// Copied from the process when the event is written.
  pub candidate:   DocumentNumber,
  pub recorded_at: DateTime<FixedOffset>,
  pub phase:       AttendancePhase,
  pub movement:    Movement,
  pub quality:     Quality,
  pub recorded_by: Option<UserRef>,
}

impl AttendanceEvent {
  /// Calendar day of the event in the operational time zone.
  pub fn local_day(&self) -> NaiveDate { self.recorded_at.date_naive() }
}

/// A request to record attendance for a process at the current time.
#[derive(Debug, Clone)]
pub struct AttendanceMark {
  pub process_id:  Uuid,
  /// What the operator asked for. The classifier may override it.
  pub requested:   Option<Movement>,
  pub recorded_by: Option<UserRef>,
}

/// Result of [`record_attendance`](crate::store::PipelineStore::record_attendance).
#[derive(Debug, Clone, Serialize)]
pub struct MarkOutcome {
  pub event:       AttendanceEvent,
  pub exit_timing: Option<ExitTiming>,
  /// `true` when the recorded movement differs from the requested one.
  pub overridden:  bool,
  /// Present when the mark advanced the process to theory training.
  pub advanced:    Option<TransitionOutcome>,
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Cutoff times and phase assignment for attendance marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendancePolicy {
  /// Entries after this time are late.
  #[serde(with = "hhmm")]
  pub on_time_cutoff:    NaiveTime,
  /// Entries at or after this time are absences.
  #[serde(with = "hhmm")]
  pub late_cutoff:       NaiveTime,
  pub phases:            BTreeMap<ProcessState, AttendancePhase>,
  /// Attending in this phase proves the candidate showed up to the
  /// convocation.
  pub convocation_phase: AttendancePhase,
}

impl Default for AttendancePolicy {
  fn default() -> Self {
    let phases = BTreeMap::from([
      (ProcessState::Convened, AttendancePhase::Confirmed),
      (ProcessState::Confirmed, AttendancePhase::Confirmed),
      (ProcessState::Theory, AttendancePhase::Theory),
      (ProcessState::Practice, AttendancePhase::Practice),
      (ProcessState::Hired, AttendancePhase::Practice),
      (ProcessState::NotApt, AttendancePhase::Practice),
      (ProcessState::Withdrawn, AttendancePhase::Practice),
    ]);
    Self {
      on_time_cutoff: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or(NaiveTime::MIN),
      late_cutoff: NaiveTime::from_hms_opt(14, 0, 0).unwrap_or(NaiveTime::MIN),
      phases,
      convocation_phase: AttendancePhase::Confirmed,
    }
  }
}

impl AttendancePolicy {
  pub fn validate(&self) -> Result<()> {
    if self.on_time_cutoff >= self.late_cutoff {
      return Err(Error::Validation(format!(
        "on-time cutoff {} must be before late cutoff {}",
        self.on_time_cutoff.format("%H:%M"),
        self.late_cutoff.format("%H:%M"),
      )));
    }
    Ok(())
  }

  /// Unmapped states count towards theory.
  pub fn phase_for(&self, state: ProcessState) -> AttendancePhase {
    self
      .phases
      .get(&state)
      .copied()
      .unwrap_or(AttendancePhase::Theory)
  }

  /// Whether a mark of `quality` in `phase` moves a process still in
  /// `state` forward to theory training.
  pub fn should_advance(
    &self,
    state: ProcessState,
    phase: AttendancePhase,
    quality: Quality,
  ) -> bool {
    matches!(state, ProcessState::Convened | ProcessState::Confirmed)
      && phase == self.convocation_phase
      && quality != Quality::Absent
  }
}

/// `"HH:MM"` (de)serialization for cutoff times.
mod hhmm {
  use chrono::NaiveTime;
  use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

  const FORMAT: &str = "%H:%M";

  pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&time.format(FORMAT))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
    let raw = String::deserialize(d)?;
    NaiveTime::parse_from_str(raw.trim(), FORMAT)
      .map_err(|e| D::Error::custom(format!("invalid time {raw:?}: {e}")))
  }
}

// ─── Classifier ──────────────────────────────────────────────────────────────

/// What the classifier decided a mark should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkDecision {
  pub movement:    Movement,
  pub quality:     Quality,
  pub exit_timing: Option<ExitTiming>,
  pub overridden:  bool,
}

/// Classify a mark made at `now` given the process's events for that day.
///
/// The requested movement is only a hint: the day's history alone decides
/// whether the mark is an ENTRY or an EXIT.
pub fn classify(
  day_events: &[AttendanceEvent],
  requested: Option<Movement>,
  now: DateTime<FixedOffset>,
  policy: &AttendancePolicy,
) -> Result<MarkDecision> {
  if let Some(absent) = day_events.iter().find(|e| e.quality == Quality::Absent) {
    return Err(Error::AlreadyAbsent {
      process_id: absent.process_id,
      date:       absent.local_day(),
      event_id:   absent.event_id,
    });
  }

  let entry = day_events.iter().find(|e| e.movement == Movement::Entry);
  let exit = day_events.iter().find(|e| e.movement == Movement::Exit);
  let time = now.time();

  let (movement, quality, exit_timing) = match (entry, exit) {
    (Some(entry), Some(exit)) => {
      return Err(Error::CycleComplete {
        process_id: entry.process_id,
        date:       entry.local_day(),
        entry_id:   entry.event_id,
        exit_id:    exit.event_id,
      });
    }
    (Some(entry), None) => {
      let timing = if time < policy.late_cutoff {
        ExitTiming::Early
      } else {
        ExitTiming::OnTime
      };
      (Movement::Exit, entry.quality, Some(timing))
    }
    (None, _) => {
      let quality = if time >= policy.late_cutoff {
        Quality::Absent
      } else if time > policy.on_time_cutoff {
        Quality::Late
      } else {
        Quality::OnTime
      };
      (Movement::Entry, quality, None)
    }
  };

  Ok(MarkDecision {
    movement,
    quality,
    exit_timing,
    overridden: requested.is_some_and(|r| r != movement),
  })
}

// ─── Daily summary ───────────────────────────────────────────────────────────

/// Entry counts per quality for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DaySummary {
  pub date:      NaiveDate,
  pub on_time:   usize,
  pub late:      usize,
  pub absent:    usize,
  pub justified: usize,
}

impl DaySummary {
  /// Count the ENTRY events among `events`; exits are ignored so each
  /// process is counted once.
  pub fn summarize<'a>(
    date: NaiveDate,
    events: impl IntoIterator<Item = &'a AttendanceEvent>,
  ) -> Self {
    let mut summary = Self { date, ..Default::default() };
    for event in events {
      if event.movement != Movement::Entry || event.local_day() != date {
        continue;
      }
      match event.quality {
        Quality::OnTime => summary.on_time += 1,
        Quality::Late => summary.late += 1,
        Quality::Absent => summary.absent += 1,
        Quality::Justified => summary.justified += 1,
      }
    }
    summary
  }

  pub fn total(&self) -> usize { self.on_time + self.late + self.absent + self.justified }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::ErrorKind;

  fn lima() -> FixedOffset { FixedOffset::west_opt(5 * 3600).unwrap() }

  fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
    lima().with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
  }

  fn event(movement: Movement, quality: Quality, when: DateTime<FixedOffset>) -> AttendanceEvent {
    AttendanceEvent {
      event_id: Uuid::new_v4(),
      process_id: Uuid::nil(),
      candidate: "12345678".into(),
      recorded_at: when,
      phase: AttendancePhase::Theory,
      movement,
      quality,
      recorded_by: None,
    }
  }

  fn entry_quality(h: u32, m: u32) -> Quality {
    let decision = classify(&[], None, at(h, m), &AttendancePolicy::default()).unwrap();
    assert_eq!(decision.movement, Movement::Entry);
    assert_eq!(decision.exit_timing, None);
    decision.quality
  }

  #[test]
  fn entry_quality_follows_cutoffs() {
    assert_eq!(entry_quality(6, 59), Quality::OnTime);
    assert_eq!(entry_quality(7, 0), Quality::OnTime);
    assert_eq!(entry_quality(7, 1), Quality::Late);
    assert_eq!(entry_quality(13, 59), Quality::Late);
    assert_eq!(entry_quality(14, 0), Quality::Absent);
    assert_eq!(entry_quality(14, 1), Quality::Absent);
  }

  #[test]
  fn exit_copies_entry_quality() {
    let policy = AttendancePolicy::default();
    let entry = event(Movement::Entry, Quality::OnTime, at(6, 50));

    let late_exit = classify(&[entry.clone()], None, at(14, 1), &policy).unwrap();
    assert_eq!(late_exit.movement, Movement::Exit);
    assert_eq!(late_exit.quality, Quality::OnTime);
    assert_eq!(late_exit.exit_timing, Some(ExitTiming::OnTime));

    let early_exit = classify(&[entry], None, at(12, 0), &policy).unwrap();
    assert_eq!(early_exit.exit_timing, Some(ExitTiming::Early));
  }

  #[test]
  fn requested_movement_is_overridden_by_history() {
    let policy = AttendancePolicy::default();
    let decision = classify(&[], Some(Movement::Exit), at(6, 0), &policy).unwrap();
    assert_eq!(decision.movement, Movement::Entry);
    assert!(decision.overridden);

    let decision = classify(&[], Some(Movement::Entry), at(6, 0), &policy).unwrap();
    assert!(!decision.overridden);
  }

  #[test]
  fn absence_blocks_further_marks() {
    let absent = event(Movement::Entry, Quality::Absent, at(14, 5));
    let err = classify(&[absent.clone()], None, at(15, 0), &AttendancePolicy::default())
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyAbsent);
    assert!(matches!(err, Error::AlreadyAbsent { event_id, .. } if event_id == absent.event_id));
  }

  #[test]
  fn third_mark_is_rejected() {
    let events = [
      event(Movement::Entry, Quality::Late, at(7, 30)),
      event(Movement::Exit, Quality::Late, at(15, 0)),
    ];
    let err = classify(&events, None, at(16, 0), &AttendancePolicy::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CycleComplete);
  }

  #[test]
  fn convocation_attendance_advances_early_states() {
    let policy = AttendancePolicy::default();
    let phase = policy.phase_for(ProcessState::Convened);
    assert_eq!(phase, AttendancePhase::Confirmed);
    assert!(policy.should_advance(ProcessState::Convened, phase, Quality::Late));
    assert!(policy.should_advance(ProcessState::Confirmed, phase, Quality::OnTime));
    assert!(!policy.should_advance(ProcessState::Convened, phase, Quality::Absent));
    assert!(!policy.should_advance(
      ProcessState::Theory,
      policy.phase_for(ProcessState::Theory),
      Quality::OnTime
    ));
  }

  #[test]
  fn policy_reads_hh_mm_cutoffs() {
    let policy: AttendancePolicy = serde_json::from_str(
      r#"{ "on_time_cutoff": "7:30", "late_cutoff": "13:00", "phases": { "CONVOCADO": "TEORIA" } }"#,
    )
    .unwrap();
    assert_eq!(policy.on_time_cutoff, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
    assert_eq!(policy.phase_for(ProcessState::Convened), AttendancePhase::Theory);
    assert_eq!(policy.phase_for(ProcessState::Practice), AttendancePhase::Theory);
    assert_eq!(policy.convocation_phase, AttendancePhase::Confirmed);
    policy.validate().unwrap();

    let inverted = AttendancePolicy {
      on_time_cutoff: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
      ..AttendancePolicy::default()
    };
    assert!(inverted.validate().is_err());
  }

  #[test]
  fn summary_counts_entries_only() {
    let events = [
      event(Movement::Entry, Quality::OnTime, at(6, 40)),
      event(Movement::Exit, Quality::OnTime, at(15, 0)),
      event(Movement::Entry, Quality::Late, at(7, 20)),
      event(Movement::Entry, Quality::Absent, at(14, 30)),
    ];
    let summary = DaySummary::summarize(at(0, 0).date_naive(), &events);
    assert_eq!((summary.on_time, summary.late, summary.absent), (1, 1, 1));
    assert_eq!(summary.total(), 3);
  }
}
