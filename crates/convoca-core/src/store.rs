//! The `PipelineStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `convoca-store-sqlite`).
//! Every mutating method is one atomic unit of work: either all of its
//! writes are visible afterwards or none are.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  attendance::{AttendanceEvent, AttendanceMark, DaySummary, MarkOutcome},
  audit::{
    CandidateDocument, Comment, NewCandidateDocument, NewComment, NewTestRecord, TestRecord,
  },
  board::DateScope,
  candidate::{Candidate, CandidateMatch, DocumentNumber, NewCandidate, Registration, UserRef},
  pipeline::{BulkOutcome, BulkTransition, ConveneDefaults, TransitionOutcome},
  process::{NewProcess, OutcomeFlags, Process, ProcessState, StageKey},
  qualification::Qualification,
  reference::{Company, CompanyId, Site, Supervisor, SupervisorId},
};

/// Abstraction over a hiring-pipeline store backend.
///
/// Business-rule rejections surface as [`crate::Error`] values wrapped in
/// the backend's error type; implementations expose them through a
/// `kind()` accessor.
pub trait PipelineStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reference data ────────────────────────────────────────────────────

  fn add_company(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Company, Self::Error>> + Send + '_;

  fn add_site(
    &self,
    company: CompanyId,
    name: String,
    city: String,
  ) -> impl Future<Output = Result<Site, Self::Error>> + Send + '_;

  fn add_supervisor(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Supervisor, Self::Error>> + Send + '_;

  /// Delete a supervisor. Processes they supervised keep running without
  /// one. Returns the number of processes detached.
  fn remove_supervisor(
    &self,
    id: SupervisorId,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Candidates ────────────────────────────────────────────────────────

  /// Create a candidate as REGISTERED, or refresh the profile of an
  /// existing one without touching status or registration date.
  fn register_candidate(
    &self,
    candidate: NewCandidate,
  ) -> impl Future<Output = Result<Registration, Self::Error>> + Send + '_;

  fn get_candidate(
    &self,
    document: DocumentNumber,
  ) -> impl Future<Output = Result<Option<Candidate>, Self::Error>> + Send + '_;

  /// Candidates whose document or phone starts with `query`, or whose name
  /// contains it. At most [`SEARCH_LIMIT`](crate::candidate::SEARCH_LIMIT)
  /// rows; a blank query matches nothing.
  fn search_candidates(
    &self,
    query: String,
  ) -> impl Future<Output = Result<Vec<CandidateMatch>, Self::Error>> + Send + '_;

  fn get_qualification(
    &self,
    document: DocumentNumber,
  ) -> impl Future<Output = Result<Option<Qualification>, Self::Error>> + Send + '_;

  // ── Processes ─────────────────────────────────────────────────────────

  /// Open a CONVENED process for a candidate with no active process.
  fn convene(
    &self,
    document: DocumentNumber,
    process: NewProcess,
    actor: Option<UserRef>,
  ) -> impl Future<Output = Result<TransitionOutcome, Self::Error>> + Send + '_;

  fn get_process(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Process>, Self::Error>> + Send + '_;

  /// All processes of a candidate, oldest start date first.
  fn processes_for_candidate(
    &self,
    document: DocumentNumber,
  ) -> impl Future<Output = Result<Vec<Process>, Self::Error>> + Send + '_;

  fn active_process_for(
    &self,
    document: DocumentNumber,
  ) -> impl Future<Output = Result<Option<Process>, Self::Error>> + Send + '_;

  // ── Pipeline ──────────────────────────────────────────────────────────

  /// Move one process to `target`, stamping the stage date and updating
  /// the candidate's master status.
  fn transition(
    &self,
    process_id: Uuid,
    target: ProcessState,
    flags: Option<OutcomeFlags>,
    actor: Option<UserRef>,
  ) -> impl Future<Output = Result<TransitionOutcome, Self::Error>> + Send + '_;

  /// Move many candidates to one master status. Ineligible candidates are
  /// skipped and reported; they never abort the batch.
  fn bulk_transition(
    &self,
    request: BulkTransition,
    defaults: Option<ConveneDefaults>,
  ) -> impl Future<Output = Result<BulkOutcome, Self::Error>> + Send + '_;

  /// Assign a supervisor and move the process to PRACTICE.
  fn assign_supervisor(
    &self,
    process_id: Uuid,
    supervisor: SupervisorId,
    actor: Option<UserRef>,
  ) -> impl Future<Output = Result<TransitionOutcome, Self::Error>> + Send + '_;

  /// Correct a stage-entry date within the edit window.
  fn edit_stage_date(
    &self,
    process_id: Uuid,
    stage: StageKey,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Process, Self::Error>> + Send + '_;

  // ── Attendance ────────────────────────────────────────────────────────

  fn record_attendance(
    &self,
    mark: AttendanceMark,
  ) -> impl Future<Output = Result<MarkOutcome, Self::Error>> + Send + '_;

  /// Kiosk check-in: find the candidate by document number or phone and
  /// mark their active process.
  fn check_in(
    &self,
    query: String,
    recorded_by: Option<UserRef>,
  ) -> impl Future<Output = Result<MarkOutcome, Self::Error>> + Send + '_;

  fn attendance_for_process(
    &self,
    process_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AttendanceEvent>, Self::Error>> + Send + '_;

  fn attendance_for_day(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<AttendanceEvent>, Self::Error>> + Send + '_;

  /// Entry counts per quality over processes that are still open.
  fn attendance_summary(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<DaySummary, Self::Error>> + Send + '_;

  // ── Board visibility ──────────────────────────────────────────────────

  /// Hide or show every process starting within `scope`. Returns the
  /// number of rows changed.
  fn set_process_visibility(
    &self,
    scope: DateScope,
    visible: bool,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Hide or show REGISTERED candidates without any process, registered
  /// within `scope`.
  fn set_registered_visibility(
    &self,
    scope: DateScope,
    visible: bool,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Observations, tests and documents ─────────────────────────────────

  fn add_comment(
    &self,
    comment: NewComment,
  ) -> impl Future<Output = Result<Comment, Self::Error>> + Send + '_;

  fn comments_for_process(
    &self,
    process_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  fn add_test_record(
    &self,
    record: NewTestRecord,
  ) -> impl Future<Output = Result<TestRecord, Self::Error>> + Send + '_;

  fn test_records_for_process(
    &self,
    process_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TestRecord>, Self::Error>> + Send + '_;

  fn add_candidate_document(
    &self,
    document: NewCandidateDocument,
  ) -> impl Future<Output = Result<CandidateDocument, Self::Error>> + Send + '_;

  /// Documents of a candidate, newest first.
  fn documents_for_candidate(
    &self,
    candidate: DocumentNumber,
  ) -> impl Future<Output = Result<Vec<CandidateDocument>, Self::Error>> + Send + '_;
}
