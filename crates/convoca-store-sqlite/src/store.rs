//! [`SqliteStore`], the SQLite implementation of [`PipelineStore`].

use std::{collections::HashSet, path::Path, sync::Arc, time::Duration};

use chrono::{DateTime, FixedOffset, NaiveDate, Offset as _, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior, params};
use uuid::Uuid;

use convoca_core::{
  Error as CoreError,
  attendance::{
    AttendanceEvent, AttendanceMark, AttendancePolicy, DaySummary, MarkOutcome, Movement,
    classify,
  },
  audit::{
    CandidateDocument, Comment, NewCandidateDocument, NewComment, NewTestRecord, TestRecord,
  },
  board::DateScope,
  candidate::{
    Candidate, CandidateMatch, CandidateStatus, DocumentNumber, NewCandidate, Registration,
    UserRef, check_in_key,
  },
  clock::{Clock, SystemClock},
  dates::validate_date_edit,
  pipeline::{
    BulkAction, BulkOutcome, BulkTransition, ConveneDefaults, SkipReason, SkippedCandidate,
    StageStamp, TransitionOutcome, master_status_after, master_status_on_open, plan_bulk_member,
    plan_transition,
  },
  process::{
    NewProcess, OutcomeFlags, Process, ProcessState, StageDates, StageKey, active_process,
  },
  qualification::Qualification,
  reference::{Company, CompanyId, Site, Supervisor, SupervisorId},
  retry::RetryPolicy,
  store::PipelineStore,
};

use crate::{
  Result,
  encode::{
    RawCandidateDocument, RawComment, RawEvent, RawTestRecord, encode_date, encode_local_dt,
    encode_user, encode_uuid,
  },
  queries,
  retry::with_retry,
  schema::SCHEMA,
};

/// How long a writer waits for a competing transaction to release the
/// database before SQLite reports it busy.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A hiring-pipeline store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  clock:  Arc<dyn Clock>,
  policy: Arc<AttendancePolicy>,
  retry:  RetryPolicy,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self::with_connection(conn);
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self::with_connection(conn);
    store.init_schema().await?;
    Ok(store)
  }

  fn with_connection(conn: tokio_rusqlite::Connection) -> Self {
    Self {
      conn,
      clock: Arc::new(SystemClock::new(Utc.fix())),
      policy: Arc::new(AttendancePolicy::default()),
      retry: RetryPolicy::default(),
    }
  }

  /// Replace the clock (system time in UTC by default).
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_attendance_policy(mut self, policy: AttendancePolicy) -> Result<Self> {
    policy.validate()?;
    self.policy = Arc::new(policy);
    Ok(self)
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `op` inside one `BEGIN IMMEDIATE` transaction. The write lock is
  /// taken up front so two operations on the same process serialise instead
  /// of failing at commit. Any error rolls everything back.
  async fn write<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = match op(&tx) {
          Ok(out) => out,
          Err(e) => return Ok(Err(e)),
        };
        tx.commit()?;
        Ok(Ok(out))
      })
      .await?
  }

  async fn read<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(op(conn))).await?
  }

  async fn insert_comment(&self, input: NewComment) -> Result<Comment> {
    let now = self.clock.now();
    self
      .write(move |tx| {
        let process = queries::require_process(tx, input.process_id)?;
        let comment = Comment {
          comment_id: Uuid::new_v4(),
          process_id: process.process_id,
          phase:      process.state,
          text:       input.text,
          author:     input.author,
          created_at: now,
        };
        tx.execute(
          "INSERT INTO comments (comment_id, process_id, phase, text, author, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![
            encode_uuid(comment.comment_id),
            encode_uuid(comment.process_id),
            comment.phase.key(),
            comment.text,
            encode_user(&comment.author),
            encode_local_dt(comment.created_at),
          ],
        )?;
        Ok(comment)
      })
      .await
  }

  async fn insert_test_record(&self, input: NewTestRecord) -> Result<TestRecord> {
    let now = self.clock.now();
    self
      .write(move |tx| {
        let process = queries::require_process(tx, input.process_id)?;
        let record = TestRecord {
          record_id:   Uuid::new_v4(),
          process_id:  process.process_id,
          kind:        input.kind,
          file_ref:    input.file_ref,
          result:      input.result,
          uploaded_by: input.uploaded_by,
          uploaded_at: now,
        };
        tx.execute(
          "INSERT INTO test_records (
             record_id, process_id, kind, file_ref, result, uploaded_by, uploaded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          params![
            encode_uuid(record.record_id),
            encode_uuid(record.process_id),
            record.kind.key(),
            record.file_ref,
            record.result,
            encode_user(&record.uploaded_by),
            encode_local_dt(record.uploaded_at),
          ],
        )?;
        Ok(record)
      })
      .await
  }

  async fn insert_document(&self, input: NewCandidateDocument) -> Result<CandidateDocument> {
    let now = self.clock.now();
    self
      .write(move |tx| {
        queries::require_candidate(tx, &input.candidate)?;
        if let Some(process_id) = input.process_id {
          let process = queries::require_process(tx, process_id)?;
          if process.candidate != input.candidate {
            return Err(
              CoreError::Validation(format!(
                "process {process_id} belongs to candidate {}, not {}",
                process.candidate, input.candidate
              ))
              .into(),
            );
          }
        }
        let document = CandidateDocument {
          document_id: Uuid::new_v4(),
          candidate:   input.candidate,
          process_id:  input.process_id,
          kind:        input.kind,
          file_ref:    input.file_ref,
          notes:       input.notes,
          uploaded_by: input.uploaded_by,
          uploaded_at: now,
        };
        tx.execute(
          "INSERT INTO candidate_documents (
             document_id, candidate, process_id, kind, file_ref, notes, uploaded_by, uploaded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          params![
            encode_uuid(document.document_id),
            document.candidate.as_str(),
            document.process_id.map(encode_uuid),
            document.kind.key(),
            document.file_ref,
            document.notes,
            encode_user(&document.uploaded_by),
            encode_local_dt(document.uploaded_at),
          ],
        )?;
        Ok(document)
      })
      .await
  }
}

// ─── Transaction bodies ──────────────────────────────────────────────────────

/// Move `process` to `target` and propagate the candidate's master status.
fn transition_in(
  conn: &Connection,
  mut process: Process,
  target: ProcessState,
  flags: Option<OutcomeFlags>,
  actor: &Option<UserRef>,
  today: NaiveDate,
) -> Result<TransitionOutcome> {
  let plan = plan_transition(&process, target, flags, today)?;
  plan.apply(&mut process);
  queries::update_process(conn, &process)?;

  let candidate = queries::require_candidate(conn, &process.candidate)?;
  let candidate_status = master_status_after(candidate.status, target);
  if let Some(status) = candidate_status {
    queries::set_candidate_status(conn, &process.candidate, status, None, actor)?;
  }

  tracing::info!(
    process = %process.process_id,
    candidate = %process.candidate,
    from = %plan.from,
    to = %plan.to,
    stamped = ?plan.stamped,
    "process transitioned"
  );

  Ok(TransitionOutcome {
    process,
    previous_state: Some(plan.from),
    stamped: plan.stamped,
    candidate_status,
  })
}

/// Create a CONVENED process for `candidate`. The caller has already
/// checked the uniqueness triple.
fn open_process_in(
  conn: &Connection,
  candidate: &Candidate,
  new: NewProcess,
  actor: &Option<UserRef>,
  now: DateTime<Utc>,
) -> Result<TransitionOutcome> {
  queries::require_company(conn, new.company)?;
  queries::require_site(conn, new.site)?;
  if let Some(supervisor) = new.supervisor {
    queries::require_supervisor(conn, supervisor)?;
  }

  let process = Process {
    process_id: Uuid::new_v4(),
    candidate:  candidate.document.clone(),
    start_date: new.start_date,
    company:    new.company,
    site:       new.site,
    supervisor: new.supervisor,
    state:      ProcessState::Convened,
    dates:      StageDates { convened: Some(new.start_date), ..Default::default() },
    outcome:    OutcomeFlags::default(),
    visible:    true,
    created_at: now,
  };
  queries::insert_process(conn, &process)?;

  let candidate_status = master_status_on_open(candidate.status);
  if let Some(status) = candidate_status {
    queries::set_candidate_status(conn, &candidate.document, status, None, actor)?;
  }

  tracing::info!(
    process = %process.process_id,
    candidate = %process.candidate,
    start_date = %process.start_date,
    company = process.company,
    "process opened"
  );

  Ok(TransitionOutcome {
    process,
    previous_state: None,
    stamped: Some(StageStamp { stage: StageKey::Convened, date: new.start_date }),
    candidate_status,
  })
}

fn bulk_in(
  conn: &Connection,
  request: &BulkTransition,
  convene: Option<(ConveneDefaults, NaiveDate)>,
  today: NaiveDate,
  now: DateTime<Utc>,
) -> Result<BulkOutcome> {
  let mut updated = 0;
  let mut skipped = Vec::new();
  let mut skip = |candidate: &DocumentNumber, reason: SkipReason| {
    tracing::warn!(
      candidate = %candidate,
      target = %request.target,
      reason = ?reason,
      "bulk transition skipped candidate"
    );
    skipped.push(SkippedCandidate { candidate: candidate.clone(), reason });
  };
  let discard_reason = request
    .discard_reason
    .filter(|_| request.records_discard_reason());

  for document in &request.candidates {
    let Some(candidate) = queries::find_candidate(conn, document)? else {
      skip(document, SkipReason::NotFound);
      continue;
    };
    let processes = queries::processes_of(conn, document)?;
    let active = active_process(&processes);

    match plan_bulk_member(candidate.status, active, request.target) {
      BulkAction::OpenProcess => {
        let Some((defaults, start_date)) = convene else {
          return Err(CoreError::Validation("convene defaults are not configured".into()).into());
        };
        let new = defaults.new_process(start_date, candidate.registration_site);
        if queries::triple_taken(conn, document, new.start_date, new.company, None)? {
          skip(document, SkipReason::DuplicateProcess);
          continue;
        }
        open_process_in(conn, &candidate, new, &request.actor, now)?;
      }
      BulkAction::Transition { process_id, target } => {
        let process = queries::require_process(conn, process_id)?;
        transition_in(conn, process, target, None, &request.actor, today)?;
        if discard_reason.is_some() {
          queries::set_candidate_status(conn, document, request.target, discard_reason, &request.actor)?;
        }
      }
      BulkAction::StatusOnly => {
        queries::set_candidate_status(conn, document, request.target, discard_reason, &request.actor)?;
      }
      BulkAction::Skip(reason) => {
        skip(document, reason);
        continue;
      }
    }
    updated += 1;
  }

  tracing::info!(
    target = %request.target,
    updated,
    skipped = skipped.len(),
    "bulk transition applied"
  );

  Ok(BulkOutcome { updated, new_status_key: request.target, skipped })
}

/// Classify and record one attendance mark for `process` at `now`,
/// advancing it to theory when the policy says so.
fn mark_in(
  conn: &Connection,
  process: Process,
  requested: Option<Movement>,
  recorded_by: Option<UserRef>,
  now: DateTime<FixedOffset>,
  policy: &AttendancePolicy,
) -> Result<MarkOutcome> {
  if process.state.is_terminal() {
    return Err(
      CoreError::ProcessClosed { process_id: process.process_id, state: process.state }.into(),
    );
  }

  let day = now.date_naive();
  let events = queries::day_events(conn, process.process_id, day)?;
  let decision = classify(&events, requested, now, policy)?;
  let phase = policy.phase_for(process.state);

  let event = AttendanceEvent {
    event_id:    Uuid::new_v4(),
    process_id:  process.process_id,
    candidate:   process.candidate.clone(),
    recorded_at: now,
    phase,
    movement:    decision.movement,
    quality:     decision.quality,
    recorded_by,
  };
  queries::insert_event(conn, &event)?;

  tracing::info!(
    process = %event.process_id,
    movement = %event.movement,
    quality = %event.quality,
    overridden = decision.overridden,
    "attendance recorded"
  );

  let advanced = if policy.should_advance(process.state, phase, decision.quality) {
    Some(transition_in(conn, process, ProcessState::Theory, None, &event.recorded_by, day)?)
  } else {
    None
  };

  Ok(MarkOutcome {
    event,
    exit_timing: decision.exit_timing,
    overridden: decision.overridden,
    advanced,
  })
}

fn set_visibility_in(conn: &Connection, sql: &str, scope: DateScope, visible: bool) -> Result<usize> {
  let (start, end) = scope.bounds()?;
  Ok(conn.execute(sql, params![visible, encode_date(start), encode_date(end)])?)
}

fn events_in(conn: &Connection, filter: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<AttendanceEvent>> {
  let sql = format!(
    "SELECT {} FROM attendance WHERE {filter} ORDER BY recorded_at, rowid",
    RawEvent::COLUMNS
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params, RawEvent::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawEvent::into_event).collect()
}

// ─── PipelineStore impl ──────────────────────────────────────────────────────

impl PipelineStore for SqliteStore {
  type Error = crate::Error;

  // ── Reference data ────────────────────────────────────────────────────────

  async fn add_company(&self, name: String) -> Result<Company> {
    self
      .write(move |tx| {
        tx.execute("INSERT INTO companies (name) VALUES (?1)", params![name])?;
        Ok(Company { company_id: tx.last_insert_rowid(), name })
      })
      .await
  }

  async fn add_site(&self, company: CompanyId, name: String, city: String) -> Result<Site> {
    self
      .write(move |tx| {
        queries::require_company(tx, company)?;
        tx.execute(
          "INSERT INTO sites (company_id, name, city) VALUES (?1, ?2, ?3)",
          params![company, name, city],
        )?;
        Ok(Site { site_id: tx.last_insert_rowid(), company_id: company, name, city })
      })
      .await
  }

  async fn add_supervisor(&self, name: String) -> Result<Supervisor> {
    self
      .write(move |tx| {
        tx.execute("INSERT INTO supervisors (name) VALUES (?1)", params![name])?;
        Ok(Supervisor { supervisor_id: tx.last_insert_rowid(), name })
      })
      .await
  }

  async fn remove_supervisor(&self, id: SupervisorId) -> Result<usize> {
    let detached = self
      .write(move |tx| {
        queries::require_supervisor(tx, id)?;
        let detached = tx.execute(
          "UPDATE processes SET supervisor_id = NULL WHERE supervisor_id = ?1",
          params![id],
        )?;
        tx.execute("DELETE FROM supervisors WHERE supervisor_id = ?1", params![id])?;
        Ok(detached)
      })
      .await?;
    tracing::info!(supervisor = id, detached, "supervisor removed");
    Ok(detached)
  }

  // ── Candidates ────────────────────────────────────────────────────────────

  async fn register_candidate(&self, input: NewCandidate) -> Result<Registration> {
    let mut input = input.validated()?;
    let today = self.clock.today();
    let answers = input.qualification.take();

    let registration = self
      .write(move |tx| {
        queries::require_site(tx, input.registration_site)?;

        let registration = match queries::find_candidate(tx, &input.document)? {
          Some(mut existing) => {
            existing.document_type = input.document_type;
            existing.full_name = input.full_name;
            existing.phone = input.phone;
            existing.email = input.email;
            existing.district = input.district;
            existing.registration_site = input.registration_site;
            if input.actor.is_some() {
              existing.last_modified_by = input.actor;
            }
            queries::update_candidate_profile(tx, &existing)?;
            Registration::Updated(existing)
          }
          None => {
            let candidate = Candidate {
              document:          input.document,
              document_type:     input.document_type,
              full_name:         input.full_name,
              phone:             input.phone,
              email:             input.email,
              district:          input.district,
              registration_site: input.registration_site,
              registered_on:     today,
              status:            CandidateStatus::Registered,
              discard_reason:    None,
              last_modified_by:  input.actor,
              active_in_board:   true,
            };
            queries::insert_candidate(tx, &candidate)?;
            Registration::Created(candidate)
          }
        };

        if let Some(answers) = &answers {
          queries::upsert_qualification(tx, &registration.candidate().document, answers)?;
        }
        Ok(registration)
      })
      .await?;

    tracing::debug!(candidate = %registration.candidate().document, "candidate registered");
    Ok(registration)
  }

  async fn get_candidate(&self, document: DocumentNumber) -> Result<Option<Candidate>> {
    self.read(move |conn| queries::find_candidate(conn, &document)).await
  }

  async fn search_candidates(&self, query: String) -> Result<Vec<CandidateMatch>> {
    self.read(move |conn| queries::search_candidates(conn, &query)).await
  }

  async fn get_qualification(&self, document: DocumentNumber) -> Result<Option<Qualification>> {
    self.read(move |conn| queries::find_qualification(conn, &document)).await
  }

  // ── Processes ─────────────────────────────────────────────────────────────

  async fn convene(
    &self,
    document: DocumentNumber,
    new: NewProcess,
    actor: Option<UserRef>,
  ) -> Result<TransitionOutcome> {
    let now = self.clock.now().with_timezone(&Utc);
    self
      .write(move |tx| {
        let candidate = queries::require_candidate(tx, &document)?;
        let processes = queries::processes_of(tx, &document)?;
        if let Some(active) = active_process(&processes) {
          return Err(
            CoreError::Validation(format!(
              "candidate {document} already has an active process {}",
              active.process_id
            ))
            .into(),
          );
        }
        if queries::triple_taken(tx, &document, new.start_date, new.company, None)? {
          return Err(
            CoreError::Validation(format!(
              "candidate {document} already has a process starting {} with company {}",
              new.start_date, new.company
            ))
            .into(),
          );
        }
        open_process_in(tx, &candidate, new, &actor, now)
      })
      .await
  }

  async fn get_process(&self, id: Uuid) -> Result<Option<Process>> {
    self.read(move |conn| queries::find_process(conn, id)).await
  }

  async fn processes_for_candidate(&self, document: DocumentNumber) -> Result<Vec<Process>> {
    self.read(move |conn| queries::processes_of(conn, &document)).await
  }

  async fn active_process_for(&self, document: DocumentNumber) -> Result<Option<Process>> {
    let processes = self.processes_for_candidate(document).await?;
    Ok(active_process(&processes).cloned())
  }

  // ── Pipeline ──────────────────────────────────────────────────────────────

  async fn transition(
    &self,
    process_id: Uuid,
    target: ProcessState,
    flags: Option<OutcomeFlags>,
    actor: Option<UserRef>,
  ) -> Result<TransitionOutcome> {
    let today = self.clock.today();
    self
      .write(move |tx| {
        let process = queries::require_process(tx, process_id)?;
        transition_in(tx, process, target, flags, &actor, today)
      })
      .await
  }

  async fn bulk_transition(
    &self,
    mut request: BulkTransition,
    defaults: Option<ConveneDefaults>,
  ) -> Result<BulkOutcome> {
    request.validate()?;
    let convene = match (request.target, defaults, request.start_date) {
      (CandidateStatus::Convened, None, _) => {
        return Err(CoreError::Validation("convene defaults are not configured".into()).into());
      }
      (_, Some(defaults), Some(start_date)) => Some((defaults, start_date)),
      _ => None,
    };

    let mut seen = HashSet::new();
    request.candidates.retain(|d| seen.insert(d.clone()));

    let today = self.clock.today();
    let now = self.clock.now().with_timezone(&Utc);
    self
      .write(move |tx| bulk_in(tx, &request, convene, today, now))
      .await
  }

  async fn assign_supervisor(
    &self,
    process_id: Uuid,
    supervisor: SupervisorId,
    actor: Option<UserRef>,
  ) -> Result<TransitionOutcome> {
    let today = self.clock.today();
    self
      .write(move |tx| {
        queries::require_supervisor(tx, supervisor)?;
        let mut process = queries::require_process(tx, process_id)?;
        process.supervisor = Some(supervisor);
        transition_in(tx, process, ProcessState::Practice, None, &actor, today)
      })
      .await
  }

  async fn edit_stage_date(&self, process_id: Uuid, stage: StageKey, date: NaiveDate) -> Result<Process> {
    self
      .write(move |tx| {
        let mut process = queries::require_process(tx, process_id)?;
        validate_date_edit(&process, stage, date)?;
        process.dates.set(stage, date);
        if stage == StageKey::Convened && process.start_date != date {
          let taken =
            queries::triple_taken(tx, &process.candidate, date, process.company, Some(process_id))?;
          if taken {
            return Err(
              CoreError::Validation(format!(
                "candidate {} already has a process starting {date} with company {}",
                process.candidate, process.company
              ))
              .into(),
            );
          }
          process.start_date = date;
        }
        queries::update_process(tx, &process)?;
        tracing::info!(process = %process_id, %stage, %date, "stage date edited");
        Ok(process)
      })
      .await
  }

  // ── Attendance ────────────────────────────────────────────────────────────

  async fn record_attendance(&self, mark: AttendanceMark) -> Result<MarkOutcome> {
    let policy = Arc::clone(&self.policy);
    let now = self.clock.now();
    self
      .write(move |tx| {
        let process = queries::require_process(tx, mark.process_id)?;
        mark_in(tx, process, mark.requested, mark.recorded_by, now, &policy)
      })
      .await
  }

  async fn check_in(&self, query: String, recorded_by: Option<UserRef>) -> Result<MarkOutcome> {
    let key = check_in_key(&query)?;
    let policy = Arc::clone(&self.policy);
    let now = self.clock.now();
    self
      .write(move |tx| {
        let candidate = queries::find_candidate_by_key(tx, &key)?
          .ok_or_else(|| CoreError::CandidateNotFound(DocumentNumber::new(key.as_str())))?;
        let processes = queries::processes_of(tx, &candidate.document)?;
        let Some(process) = active_process(&processes).cloned() else {
          return Err(CoreError::NoActiveProcess(candidate.document).into());
        };
        mark_in(tx, process, None, recorded_by, now, &policy)
      })
      .await
  }

  async fn attendance_for_process(&self, process_id: Uuid) -> Result<Vec<AttendanceEvent>> {
    self
      .read(move |conn| events_in(conn, "process_id = ?1", params![encode_uuid(process_id)]))
      .await
  }

  async fn attendance_for_day(&self, date: NaiveDate) -> Result<Vec<AttendanceEvent>> {
    self
      .read(move |conn| events_in(conn, "local_day = ?1", params![encode_date(date)]))
      .await
  }

  async fn attendance_summary(&self, date: NaiveDate) -> Result<DaySummary> {
    let events = self
      .read(move |conn| {
        events_in(
          conn,
          "local_day = ?1 AND process_id IN (
             SELECT process_id FROM processes WHERE state IN (?2, ?3, ?4, ?5)
           )",
          params![
            encode_date(date),
            ProcessState::Convened.key(),
            ProcessState::Confirmed.key(),
            ProcessState::Theory.key(),
            ProcessState::Practice.key(),
          ],
        )
      })
      .await?;
    Ok(DaySummary::summarize(date, &events))
  }

  // ── Board visibility ──────────────────────────────────────────────────────

  async fn set_process_visibility(&self, scope: DateScope, visible: bool) -> Result<usize> {
    let changed = self
      .write(move |tx| {
        set_visibility_in(
          tx,
          "UPDATE processes SET visible = ?1
            WHERE start_date >= ?2 AND start_date < ?3 AND visible != ?1",
          scope,
          visible,
        )
      })
      .await?;
    tracing::info!(?scope, visible, changed, "process visibility updated");
    Ok(changed)
  }

  async fn set_registered_visibility(&self, scope: DateScope, visible: bool) -> Result<usize> {
    let changed = self
      .write(move |tx| {
        set_visibility_in(
          tx,
          "UPDATE candidates SET active_in_board = ?1
            WHERE status = 'REGISTRADO'
              AND registered_on >= ?2 AND registered_on < ?3
              AND active_in_board != ?1
              AND NOT EXISTS (
                SELECT 1 FROM processes p WHERE p.candidate = candidates.document
              )",
          scope,
          visible,
        )
      })
      .await?;
    tracing::info!(?scope, visible, changed, "registered candidate visibility updated");
    Ok(changed)
  }

  // ── Observations, tests and documents ─────────────────────────────────────

  async fn add_comment(&self, comment: NewComment) -> Result<Comment> {
    let comment = comment.validated()?;
    with_retry(self.retry, "add_comment", || self.insert_comment(comment.clone())).await
  }

  async fn comments_for_process(&self, process_id: Uuid) -> Result<Vec<Comment>> {
    self
      .read(move |conn| {
        let sql = format!(
          "SELECT {} FROM comments WHERE process_id = ?1 ORDER BY created_at, rowid",
          RawComment::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let raws = stmt
          .query_map(params![encode_uuid(process_id)], RawComment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawComment::into_comment).collect()
      })
      .await
  }

  async fn add_test_record(&self, record: NewTestRecord) -> Result<TestRecord> {
    let record = record.validated()?;
    with_retry(self.retry, "add_test_record", || self.insert_test_record(record.clone())).await
  }

  async fn test_records_for_process(&self, process_id: Uuid) -> Result<Vec<TestRecord>> {
    self
      .read(move |conn| {
        let sql = format!(
          "SELECT {} FROM test_records WHERE process_id = ?1 ORDER BY uploaded_at, rowid",
          RawTestRecord::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let raws = stmt
          .query_map(params![encode_uuid(process_id)], RawTestRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawTestRecord::into_record).collect()
      })
      .await
  }

  async fn add_candidate_document(
    &self,
    document: NewCandidateDocument,
  ) -> Result<CandidateDocument> {
    let document = document.validated()?;
    with_retry(self.retry, "add_candidate_document", || {
      self.insert_document(document.clone())
    })
    .await
  }

  async fn documents_for_candidate(
    &self,
    candidate: DocumentNumber,
  ) -> Result<Vec<CandidateDocument>> {
    self
      .read(move |conn| {
        let sql = format!(
          "SELECT {} FROM candidate_documents WHERE candidate = ?1
            ORDER BY uploaded_at DESC, rowid DESC",
          RawCandidateDocument::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let raws = stmt
          .query_map(params![candidate.as_str()], RawCandidateDocument::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawCandidateDocument::into_document).collect()
      })
      .await
  }
}
