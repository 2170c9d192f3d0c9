//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Calendar dates are stored as `YYYY-MM-DD` so they sort and compare as
//! text. Timestamps are RFC 3339 strings. Enumerations are stored under their
//! wire keys. The document type is compact JSON.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use convoca_core::{
  attendance::AttendanceEvent,
  audit::{CandidateDocument, Comment, TestRecord},
  candidate::{Candidate, CandidateMatch, DiscardReason, DocumentNumber, DocumentType, UserRef},
  process::{OutcomeFlags, Process, StageDates},
  qualification::{Qualification, SalesTenure},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref().map(decode_date).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  Ok(decode_local_dt(s)?.with_timezone(&Utc))
}

/// Local timestamps keep their offset so the recorded wall-clock time
/// survives a round trip.
pub fn encode_local_dt(dt: DateTime<FixedOffset>) -> String { dt.to_rfc3339() }

pub fn decode_local_dt(s: &str) -> Result<DateTime<FixedOffset>> {
  DateTime::parse_from_rfc3339(s).map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn encode_document_type(t: &DocumentType) -> Result<String> { Ok(serde_json::to_string(t)?) }

pub fn decode_document_type(s: &str) -> Result<DocumentType> { Ok(serde_json::from_str(s)?) }

pub fn encode_user(user: &Option<UserRef>) -> Option<String> {
  user.as_ref().map(|u| u.0.clone())
}

fn decode_user(s: Option<String>) -> Option<UserRef> { s.map(UserRef) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `candidates` row.
pub struct RawCandidate {
  pub document:          String,
  pub document_type:     String,
  pub full_name:         String,
  pub phone:             String,
  pub email:             Option<String>,
  pub district:          String,
  pub registration_site: i64,
  pub registered_on:     String,
  pub status:            String,
  pub discard_reason:    Option<String>,
  pub last_modified_by:  Option<String>,
  pub active_in_board:   bool,
}

impl RawCandidate {
  pub const COLUMNS: &'static str = "document, document_type, full_name, phone, email, \
     district, registration_site, registered_on, status, discard_reason, \
     last_modified_by, active_in_board";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      document:          row.get(0)?,
      document_type:     row.get(1)?,
      full_name:         row.get(2)?,
      phone:             row.get(3)?,
      email:             row.get(4)?,
      district:          row.get(5)?,
      registration_site: row.get(6)?,
      registered_on:     row.get(7)?,
      status:            row.get(8)?,
      discard_reason:    row.get(9)?,
      last_modified_by:  row.get(10)?,
      active_in_board:   row.get(11)?,
    })
  }

  pub fn into_candidate(self) -> Result<Candidate> {
    Ok(Candidate {
      document:          DocumentNumber::new(self.document),
      document_type:     decode_document_type(&self.document_type)?,
      full_name:         self.full_name,
      phone:             self.phone,
      email:             self.email,
      district:          self.district,
      registration_site: self.registration_site,
      registered_on:     decode_date(&self.registered_on)?,
      status:            self.status.parse()?,
      discard_reason:    self
        .discard_reason
        .as_deref()
        .map(str::parse::<DiscardReason>)
        .transpose()?,
      last_modified_by:  decode_user(self.last_modified_by),
      active_in_board:   self.active_in_board,
    })
  }
}

/// Raw values read directly from a `processes` row.
pub struct RawProcess {
  pub process_id:                 String,
  pub candidate:                  String,
  pub start_date:                 String,
  pub company_id:                 i64,
  pub site_id:                    i64,
  pub supervisor_id:              Option<i64>,
  pub state:                      String,
  pub convened_on:                Option<String>,
  pub confirmed_on:               Option<String>,
  pub theory_on:                  Option<String>,
  pub practice_on:                Option<String>,
  pub hired_on:                   Option<String>,
  pub sales_objective_met:        bool,
  pub attitude_exception_applies: bool,
  pub visible:                    bool,
  pub created_at:                 String,
}

impl RawProcess {
  pub const COLUMNS: &'static str = "process_id, candidate, start_date, company_id, site_id, \
     supervisor_id, state, convened_on, confirmed_on, theory_on, practice_on, hired_on, \
     sales_objective_met, attitude_exception_applies, visible, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      process_id:                 row.get(0)?,
      candidate:                  row.get(1)?,
      start_date:                 row.get(2)?,
      company_id:                 row.get(3)?,
      site_id:                    row.get(4)?,
      supervisor_id:              row.get(5)?,
      state:                      row.get(6)?,
      convened_on:                row.get(7)?,
      confirmed_on:               row.get(8)?,
      theory_on:                  row.get(9)?,
      practice_on:                row.get(10)?,
      hired_on:                   row.get(11)?,
      sales_objective_met:        row.get(12)?,
      attitude_exception_applies: row.get(13)?,
      visible:                    row.get(14)?,
      created_at:                 row.get(15)?,
    })
  }

  pub fn into_process(self) -> Result<Process> {
    Ok(Process {
      process_id: decode_uuid(&self.process_id)?,
      candidate:  DocumentNumber::new(self.candidate),
      start_date: decode_date(&self.start_date)?,
      company:    self.company_id,
      site:       self.site_id,
      supervisor: self.supervisor_id,
      state:      self.state.parse()?,
      dates:      StageDates {
        convened:  decode_opt_date(self.convened_on)?,
        confirmed: decode_opt_date(self.confirmed_on)?,
        theory:    decode_opt_date(self.theory_on)?,
        practice:  decode_opt_date(self.practice_on)?,
        hire:      decode_opt_date(self.hired_on)?,
      },
      outcome:    OutcomeFlags {
        sales_objective_met:        self.sales_objective_met,
        attitude_exception_applies: self.attitude_exception_applies,
      },
      visible:    self.visible,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from an `attendance` row.
pub struct RawEvent {
  pub event_id:    String,
  pub process_id:  String,
  pub candidate:   String,
  pub recorded_at: String,
  pub phase:       String,
  pub movement:    String,
  pub quality:     String,
  pub recorded_by: Option<String>,
}

impl RawEvent {
  pub const COLUMNS: &'static str =
    "event_id, process_id, candidate, recorded_at, phase, movement, quality, recorded_by";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:    row.get(0)?,
      process_id:  row.get(1)?,
      candidate:   row.get(2)?,
      recorded_at: row.get(3)?,
      phase:       row.get(4)?,
      movement:    row.get(5)?,
      quality:     row.get(6)?,
      recorded_by: row.get(7)?,
    })
  }

  pub fn into_event(self) -> Result<AttendanceEvent> {
    Ok(AttendanceEvent {
      event_id:    decode_uuid(&self.event_id)?,
      process_id:  decode_uuid(&self.process_id)?,
      candidate:   DocumentNumber::new(self.candidate),
      recorded_at: decode_local_dt(&self.recorded_at)?,
      phase:       self.phase.parse()?,
      movement:    self.movement.parse()?,
      quality:     self.quality.parse()?,
      recorded_by: decode_user(self.recorded_by),
    })
  }
}

/// Raw values read directly from a `comments` row.
pub struct RawComment {
  pub comment_id: String,
  pub process_id: String,
  pub phase:      String,
  pub text:       String,
  pub author:     Option<String>,
  pub created_at: String,
}

impl RawComment {
  pub const COLUMNS: &'static str = "comment_id, process_id, phase, text, author, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      comment_id: row.get(0)?,
      process_id: row.get(1)?,
      phase:      row.get(2)?,
      text:       row.get(3)?,
      author:     row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      comment_id: decode_uuid(&self.comment_id)?,
      process_id: decode_uuid(&self.process_id)?,
      phase:      self.phase.parse()?,
      text:       self.text,
      author:     decode_user(self.author),
      created_at: decode_local_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `test_records` row.
pub struct RawTestRecord {
  pub record_id:   String,
  pub process_id:  String,
  pub kind:        String,
  pub file_ref:    String,
  pub result:      Option<String>,
  pub uploaded_by: Option<String>,
  pub uploaded_at: String,
}

impl RawTestRecord {
  pub const COLUMNS: &'static str =
    "record_id, process_id, kind, file_ref, result, uploaded_by, uploaded_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:   row.get(0)?,
      process_id:  row.get(1)?,
      kind:        row.get(2)?,
      file_ref:    row.get(3)?,
      result:      row.get(4)?,
      uploaded_by: row.get(5)?,
      uploaded_at: row.get(6)?,
    })
  }

  pub fn into_record(self) -> Result<TestRecord> {
    Ok(TestRecord {
      record_id:   decode_uuid(&self.record_id)?,
      process_id:  decode_uuid(&self.process_id)?,
      kind:        self.kind.parse()?,
      file_ref:    self.file_ref,
      result:      self.result,
      uploaded_by: decode_user(self.uploaded_by),
      uploaded_at: decode_local_dt(&self.uploaded_at)?,
    })
  }
}

/// Raw values of a candidate search hit.
pub struct RawMatch {
  pub document:  String,
  pub full_name: String,
  pub phone:     String,
}

impl RawMatch {
  pub const COLUMNS: &'static str = "document, full_name, phone";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { document: row.get(0)?, full_name: row.get(1)?, phone: row.get(2)? })
  }

  pub fn into_match(self) -> CandidateMatch {
    CandidateMatch {
      document:  DocumentNumber::new(self.document),
      full_name: self.full_name,
      phone:     self.phone,
    }
  }
}

/// Raw values read directly from a `qualifications` row.
pub struct RawQualification {
  pub secondary_complete:          bool,
  pub spanish_campaign_experience: bool,
  pub sales_experience:            String,
  pub sales_employer:              Option<String>,
  pub sales_tenure:                Option<String>,
  pub benefits_agreement:          String,
  pub benefits_detail:             Option<String>,
  pub schedule_available:          bool,
  pub chronic_condition:           Option<String>,
  pub speech_difficulty:           bool,
}

impl RawQualification {
  pub const COLUMNS: &'static str = "secondary_complete, spanish_campaign_experience, \
     sales_experience, sales_employer, sales_tenure, benefits_agreement, benefits_detail, \
     schedule_available, chronic_condition, speech_difficulty";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      secondary_complete:          row.get(0)?,
      spanish_campaign_experience: row.get(1)?,
      sales_experience:            row.get(2)?,
      sales_employer:              row.get(3)?,
      sales_tenure:                row.get(4)?,
      benefits_agreement:          row.get(5)?,
      benefits_detail:             row.get(6)?,
      schedule_available:          row.get(7)?,
      chronic_condition:           row.get(8)?,
      speech_difficulty:           row.get(9)?,
    })
  }

  pub fn into_qualification(self) -> Result<Qualification> {
    Ok(Qualification {
      secondary_complete:          self.secondary_complete,
      spanish_campaign_experience: self.spanish_campaign_experience,
      sales_experience:            self.sales_experience.parse()?,
      sales_employer:              self.sales_employer,
      sales_tenure:                self
        .sales_tenure
        .as_deref()
        .map(str::parse::<SalesTenure>)
        .transpose()?,
      benefits_agreement:          self.benefits_agreement.parse()?,
      benefits_detail:             self.benefits_detail,
      schedule_available:          self.schedule_available,
      chronic_condition:           self.chronic_condition,
      speech_difficulty:           self.speech_difficulty,
    })
  }
}

/// Raw values read directly from a `candidate_documents` row.
pub struct RawCandidateDocument {
  pub document_id: String,
  pub candidate:   String,
  pub process_id:  Option<String>,
  pub kind:        String,
  pub file_ref:    String,
  pub notes:       Option<String>,
  pub uploaded_by: Option<String>,
  pub uploaded_at: String,
}

impl RawCandidateDocument {
  pub const COLUMNS: &'static str =
    "document_id, candidate, process_id, kind, file_ref, notes, uploaded_by, uploaded_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      document_id: row.get(0)?,
      candidate:   row.get(1)?,
      process_id:  row.get(2)?,
      kind:        row.get(3)?,
      file_ref:    row.get(4)?,
      notes:       row.get(5)?,
      uploaded_by: row.get(6)?,
      uploaded_at: row.get(7)?,
    })
  }

  pub fn into_document(self) -> Result<CandidateDocument> {
    Ok(CandidateDocument {
      document_id: decode_uuid(&self.document_id)?,
      candidate:   DocumentNumber::new(self.candidate),
      process_id:  decode_opt_uuid(self.process_id)?,
      kind:        self.kind.parse()?,
      file_ref:    self.file_ref,
      notes:       self.notes,
      uploaded_by: decode_user(self.uploaded_by),
      uploaded_at: decode_local_dt(&self.uploaded_at)?,
    })
  }
}
