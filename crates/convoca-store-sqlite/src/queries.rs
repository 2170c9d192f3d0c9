//! Synchronous row-level helpers run on the database thread.
//!
//! Every function takes a plain [`Connection`]; callers pass the open
//! transaction (which derefs to one) so reads and writes of one operation
//! share it.

use chrono::NaiveDate;
use convoca_core::{
  Error as CoreError,
  attendance::AttendanceEvent,
  candidate::{
    Candidate, CandidateMatch, CandidateStatus, DiscardReason, DocumentNumber, SEARCH_LIMIT,
    UserRef,
  },
  process::Process,
  qualification::{Qualification, SalesTenure},
  reference::{CompanyId, SiteId, SupervisorId},
};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    RawCandidate, RawEvent, RawMatch, RawProcess, RawQualification, encode_date, encode_document_type, encode_dt,
    encode_local_dt, encode_user, encode_uuid,
  },
};

// ─── Reference data ──────────────────────────────────────────────────────────

fn exists(conn: &Connection, sql: &str, id: i64) -> Result<bool> {
  Ok(conn.query_row(sql, params![id], |_| Ok(())).optional()?.is_some())
}

pub fn require_company(conn: &Connection, id: CompanyId) -> Result<()> {
  if !exists(conn, "SELECT 1 FROM companies WHERE company_id = ?1", id)? {
    return Err(CoreError::ReferenceNotFound { entity: "company", id }.into());
  }
  Ok(())
}

pub fn require_site(conn: &Connection, id: SiteId) -> Result<()> {
  if !exists(conn, "SELECT 1 FROM sites WHERE site_id = ?1", id)? {
    return Err(CoreError::ReferenceNotFound { entity: "site", id }.into());
  }
  Ok(())
}

pub fn require_supervisor(conn: &Connection, id: SupervisorId) -> Result<()> {
  if !exists(conn, "SELECT 1 FROM supervisors WHERE supervisor_id = ?1", id)? {
    return Err(CoreError::ReferenceNotFound { entity: "supervisor", id }.into());
  }
  Ok(())
}

// ─── Candidates ──────────────────────────────────────────────────────────────

pub fn find_candidate(conn: &Connection, document: &DocumentNumber) -> Result<Option<Candidate>> {
  let sql = format!("SELECT {} FROM candidates WHERE document = ?1", RawCandidate::COLUMNS);
  conn
    .query_row(&sql, params![document.as_str()], RawCandidate::from_row)
    .optional()?
    .map(RawCandidate::into_candidate)
    .transpose()
}

pub fn require_candidate(conn: &Connection, document: &DocumentNumber) -> Result<Candidate> {
  find_candidate(conn, document)?
    .ok_or_else(|| CoreError::CandidateNotFound(document.clone()).into())
}

pub fn insert_candidate(conn: &Connection, c: &Candidate) -> Result<()> {
  conn.execute(
    "INSERT INTO candidates (
       document, document_type, full_name, phone, email, district,
       registration_site, registered_on, status, discard_reason,
       last_modified_by, active_in_board
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    params![
      c.document.as_str(),
      encode_document_type(&c.document_type)?,
      c.full_name,
      c.phone,
      c.email,
      c.district,
      c.registration_site,
      encode_date(c.registered_on),
      c.status.key(),
      c.discard_reason.map(DiscardReason::key),
      encode_user(&c.last_modified_by),
      c.active_in_board,
    ],
  )?;
  Ok(())
}

/// Overwrite the profile fields; status and registration date are left
/// alone.
pub fn update_candidate_profile(conn: &Connection, c: &Candidate) -> Result<()> {
  conn.execute(
    "UPDATE candidates
        SET document_type = ?2, full_name = ?3, phone = ?4, email = ?5,
            district = ?6, registration_site = ?7, last_modified_by = ?8
      WHERE document = ?1",
    params![
      c.document.as_str(),
      encode_document_type(&c.document_type)?,
      c.full_name,
      c.phone,
      c.email,
      c.district,
      c.registration_site,
      encode_user(&c.last_modified_by),
    ],
  )?;
  Ok(())
}

/// Candidate whose document number or phone equals `key`. A document match
/// wins over a phone match.
pub fn find_candidate_by_key(conn: &Connection, key: &str) -> Result<Option<Candidate>> {
  let sql = format!(
    "SELECT {} FROM candidates WHERE document = ?1 OR phone = ?1
      ORDER BY document = ?1 DESC, registered_on DESC
      LIMIT 1",
    RawCandidate::COLUMNS
  );
  conn
    .query_row(&sql, params![key], RawCandidate::from_row)
    .optional()?
    .map(RawCandidate::into_candidate)
    .transpose()
}

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'`
/// pattern.
fn like_escape(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    if matches!(c, '\\' | '%' | '_') {
      out.push('\\');
    }
    out.push(c);
  }
  out
}

pub fn search_candidates(conn: &Connection, query: &str) -> Result<Vec<CandidateMatch>> {
  let query = query.trim();
  if query.is_empty() {
    return Ok(Vec::new());
  }
  let escaped = like_escape(query);
  let sql = format!(
    "SELECT {} FROM candidates
      WHERE document LIKE ?1 ESCAPE '\\'
         OR phone LIKE ?1 ESCAPE '\\'
         OR full_name LIKE ?2 ESCAPE '\\'
      ORDER BY full_name, document
      LIMIT ?3",
    RawMatch::COLUMNS
  );
  let mut stmt = conn.prepare(&sql)?;
  let matches = stmt
    .query_map(
      params![format!("{escaped}%"), format!("%{escaped}%"), SEARCH_LIMIT as i64],
      RawMatch::from_row,
    )?
    .map(|row| row.map(RawMatch::into_match))
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(matches)
}

pub fn find_qualification(
  conn: &Connection,
  document: &DocumentNumber,
) -> Result<Option<Qualification>> {
  let sql = format!(
    "SELECT {} FROM qualifications WHERE candidate = ?1",
    RawQualification::COLUMNS
  );
  conn
    .query_row(&sql, params![document.as_str()], RawQualification::from_row)
    .optional()?
    .map(RawQualification::into_qualification)
    .transpose()
}

/// Insert or replace the screening answers of a candidate.
pub fn upsert_qualification(
  conn: &Connection,
  document: &DocumentNumber,
  q: &Qualification,
) -> Result<()> {
  conn.execute(
    "INSERT INTO qualifications (
       candidate, secondary_complete, spanish_campaign_experience, sales_experience,
       sales_employer, sales_tenure, benefits_agreement, benefits_detail,
       schedule_available, chronic_condition, speech_difficulty
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
     ON CONFLICT (candidate) DO UPDATE SET
       secondary_complete = excluded.secondary_complete,
       spanish_campaign_experience = excluded.spanish_campaign_experience,
       sales_experience = excluded.sales_experience,
       sales_employer = excluded.sales_employer,
       sales_tenure = excluded.sales_tenure,
       benefits_agreement = excluded.benefits_agreement,
       benefits_detail = excluded.benefits_detail,
       schedule_available = excluded.schedule_available,
       chronic_condition = excluded.chronic_condition,
       speech_difficulty = excluded.speech_difficulty",
    params![
      document.as_str(),
      q.secondary_complete,
      q.spanish_campaign_experience,
      q.sales_experience.key(),
      q.sales_employer,
      q.sales_tenure.map(SalesTenure::key),
      q.benefits_agreement.key(),
      q.benefits_detail,
      q.schedule_available,
      q.chronic_condition,
      q.speech_difficulty,
    ],
  )?;
  Ok(())
}

/// Set the master status. A `None` discard reason or actor keeps the stored
/// value.
pub fn set_candidate_status(
  conn: &Connection,
  document: &DocumentNumber,
  status: CandidateStatus,
  discard_reason: Option<DiscardReason>,
  actor: &Option<UserRef>,
) -> Result<()> {
  conn.execute(
    "UPDATE candidates
        SET status = ?2,
            discard_reason = COALESCE(?3, discard_reason),
            last_modified_by = COALESCE(?4, last_modified_by)
      WHERE document = ?1",
    params![
      document.as_str(),
      status.key(),
      discard_reason.map(DiscardReason::key),
      encode_user(actor),
    ],
  )?;
  Ok(())
}

// ─── Processes ───────────────────────────────────────────────────────────────

pub fn find_process(conn: &Connection, id: Uuid) -> Result<Option<Process>> {
  let sql = format!("SELECT {} FROM processes WHERE process_id = ?1", RawProcess::COLUMNS);
  conn
    .query_row(&sql, params![encode_uuid(id)], RawProcess::from_row)
    .optional()?
    .map(RawProcess::into_process)
    .transpose()
}

pub fn require_process(conn: &Connection, id: Uuid) -> Result<Process> {
  find_process(conn, id)?.ok_or_else(|| CoreError::ProcessNotFound(id).into())
}

/// A candidate's processes, oldest start date first.
pub fn processes_of(conn: &Connection, document: &DocumentNumber) -> Result<Vec<Process>> {
  let sql = format!(
    "SELECT {} FROM processes WHERE candidate = ?1
      ORDER BY start_date, created_at, rowid",
    RawProcess::COLUMNS
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params![document.as_str()], RawProcess::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawProcess::into_process).collect()
}

/// Whether the (candidate, start date, company) triple is already used by
/// a process other than `except`.
pub fn triple_taken(
  conn: &Connection,
  document: &DocumentNumber,
  start_date: NaiveDate,
  company: CompanyId,
  except: Option<Uuid>,
) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM processes
          WHERE candidate = ?1 AND start_date = ?2 AND company_id = ?3
            AND (?4 IS NULL OR process_id != ?4)",
        params![
          document.as_str(),
          encode_date(start_date),
          company,
          except.map(encode_uuid),
        ],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

pub fn insert_process(conn: &Connection, p: &Process) -> Result<()> {
  conn.execute(
    "INSERT INTO processes (
       process_id, candidate, start_date, company_id, site_id, supervisor_id,
       state, convened_on, confirmed_on, theory_on, practice_on, hired_on,
       sales_objective_met, attitude_exception_applies, visible, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
    params![
      encode_uuid(p.process_id),
      p.candidate.as_str(),
      encode_date(p.start_date),
      p.company,
      p.site,
      p.supervisor,
      p.state.key(),
      p.dates.convened.map(encode_date),
      p.dates.confirmed.map(encode_date),
      p.dates.theory.map(encode_date),
      p.dates.practice.map(encode_date),
      p.dates.hire.map(encode_date),
      p.outcome.sales_objective_met,
      p.outcome.attitude_exception_applies,
      p.visible,
      encode_dt(p.created_at),
    ],
  )?;
  Ok(())
}

/// Write back the mutable columns of a process. Candidate and company never
/// change; the start date follows edits of the convocation date.
pub fn update_process(conn: &Connection, p: &Process) -> Result<()> {
  conn.execute(
    "UPDATE processes
        SET site_id = ?2, supervisor_id = ?3, state = ?4,
            convened_on = ?5, confirmed_on = ?6, theory_on = ?7,
            practice_on = ?8, hired_on = ?9,
            sales_objective_met = ?10, attitude_exception_applies = ?11,
            visible = ?12, start_date = ?13
      WHERE process_id = ?1",
    params![
      encode_uuid(p.process_id),
      p.site,
      p.supervisor,
      p.state.key(),
      p.dates.convened.map(encode_date),
      p.dates.confirmed.map(encode_date),
      p.dates.theory.map(encode_date),
      p.dates.practice.map(encode_date),
      p.dates.hire.map(encode_date),
      p.outcome.sales_objective_met,
      p.outcome.attitude_exception_applies,
      p.visible,
      encode_date(p.start_date),
    ],
  )?;
  Ok(())
}

// ─── Attendance ──────────────────────────────────────────────────────────────

/// Events of one process on one local day, in recording order.
pub fn day_events(conn: &Connection, process_id: Uuid, day: NaiveDate) -> Result<Vec<AttendanceEvent>> {
  let sql = format!(
    "SELECT {} FROM attendance WHERE process_id = ?1 AND local_day = ?2
      ORDER BY recorded_at, rowid",
    RawEvent::COLUMNS
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params![encode_uuid(process_id), encode_date(day)], RawEvent::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawEvent::into_event).collect()
}

pub fn insert_event(conn: &Connection, e: &AttendanceEvent) -> Result<()> {
  conn.execute(
    "INSERT INTO attendance (
       event_id, process_id, candidate, recorded_at, local_day,
       phase, movement, quality, recorded_by
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    params![
      encode_uuid(e.event_id),
      encode_uuid(e.process_id),
      e.candidate.as_str(),
      encode_local_dt(e.recorded_at),
      encode_date(e.local_day()),
      e.phase.key(),
      e.movement.key(),
      e.quality.key(),
      encode_user(&e.recorded_by),
    ],
  )?;
  Ok(())
}
