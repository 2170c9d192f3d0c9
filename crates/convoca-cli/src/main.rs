//! `convoca`, the command-line front end for the hiring pipeline store.
//!
//! Reads `convoca.toml` (or the path given with `--config`) and
//! `CONVOCA_*` environment variables, opens the SQLite store, runs one
//! operation and prints its result as JSON on stdout.
//!
//! # Usage
//!
//! ```
//! convoca register 45678912 --name "Ana Quispe" --phone 987654321 --district Surco --site 1
//! convoca convene 45678912 --start 2024-03-04 --company 1 --site 1
//! convoca bulk CONFIRMADO 45678912 41234567
//! convoca mark 6f1c…
//! convoca check-in 45678912
//! ```

mod config;

use std::{
  path::{Path, PathBuf},
  process::ExitCode,
  sync::Arc,
};

use anyhow::Context as _;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use convoca_core::{
  attendance::{AttendanceMark, Movement},
  audit::{DocumentKind, NewCandidateDocument, NewComment, NewTestRecord, TestKind},
  board::DateScope,
  candidate::{CandidateStatus, DiscardReason, DocumentNumber, DocumentType, NewCandidate, UserRef},
  clock::Clock,
  error::ErrorKind,
  pipeline::BulkTransition,
  process::{NewProcess, OutcomeFlags, ProcessState, StageKey},
  qualification::Qualification,
  reference::{CompanyId, SiteId, SupervisorId},
  store::PipelineStore,
};
use convoca_store_sqlite::SqliteStore;
use serde::Serialize;
use serde_json::json;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::AppConfig;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Convoca hiring pipeline")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "convoca.toml", global = true)]
  config: PathBuf,

  /// Operator recorded as the actor of changes. Overrides `operator` in
  /// the configuration.
  #[arg(short, long, global = true)]
  user: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Add a client company.
  AddCompany { name: String },
  /// Add a site of a company.
  AddSite {
    company: CompanyId,
    name:    String,
    city:    String,
  },
  /// Add a supervisor.
  AddSupervisor { name: String },
  /// Remove a supervisor; their processes continue unsupervised.
  RemoveSupervisor { supervisor: SupervisorId },

  /// Register a candidate, or refresh the profile of an existing one.
  Register(RegisterArgs),
  /// Show a candidate with their screening answers and processes.
  Candidate { document: DocumentNumber },
  /// Find candidates by document or phone prefix, or part of the name.
  Search { query: String },
  /// Show one process.
  Process { process: Uuid },

  /// Open a new process for a candidate.
  Convene {
    document:   DocumentNumber,
    #[arg(long)]
    start:      NaiveDate,
    #[arg(long)]
    company:    CompanyId,
    #[arg(long)]
    site:       SiteId,
    #[arg(long)]
    supervisor: Option<SupervisorId>,
  },
  /// Move a process to another state.
  Transition {
    process:             Uuid,
    target:              ProcessState,
    /// The candidate met the sales objective (HIRED / NOT_APT only).
    #[arg(long)]
    sales_objective_met: bool,
    /// The attitude exception applies (HIRED / NOT_APT only).
    #[arg(long)]
    attitude_exception:  bool,
  },
  /// Move many candidates to one master status.
  Bulk {
    target:     CandidateStatus,
    #[arg(required = true)]
    candidates: Vec<DocumentNumber>,
    /// Start date of the processes opened by a CONVOCADO bulk.
    #[arg(long)]
    start:      Option<NaiveDate>,
    #[arg(long)]
    reason:     Option<DiscardReason>,
  },
  /// Assign a supervisor and move the process to practice.
  Supervise {
    process:    Uuid,
    supervisor: SupervisorId,
  },
  /// Correct the entry date of a stage.
  EditDate {
    process: Uuid,
    stage:   StageKey,
    date:    NaiveDate,
  },

  /// Record an attendance mark at the current time.
  Mark {
    process:  Uuid,
    /// ENTRADA or SALIDA; inferred from the day's marks when omitted.
    #[arg(long)]
    movement: Option<Movement>,
  },
  /// Kiosk check-in: mark the active process of the candidate with this
  /// document number or phone.
  CheckIn { query: String },
  /// List the attendance marks of a process.
  Attendance { process: Uuid },
  /// List all marks of one day.
  Day { date: NaiveDate },
  /// Entry counts per quality for one day (today by default).
  Summary { date: Option<NaiveDate> },

  /// Hide processes (or registered candidates) from the board.
  Hide(VisibilityArgs),
  /// Show processes (or registered candidates) on the board again.
  Unhide(VisibilityArgs),

  /// Add an observation to a process.
  Comment { process: Uuid, text: String },
  /// List the observations of a process.
  Comments { process: Uuid },
  /// Attach a test result to a process.
  AddTest {
    process: Uuid,
    kind:    TestKind,
    file:    String,
    #[arg(long)]
    result:  Option<String>,
  },
  /// List the tests of a process.
  Tests { process: Uuid },
  /// Attach a supporting document to a candidate.
  AddDocument {
    document: DocumentNumber,
    kind:     DocumentKind,
    file:     String,
    /// The process the document was collected for.
    #[arg(long)]
    process:  Option<Uuid>,
    #[arg(long)]
    notes:    Option<String>,
  },
  /// List the documents of a candidate, newest first.
  Documents { document: DocumentNumber },
}

#[derive(Args)]
struct RegisterArgs {
  document: DocumentNumber,
  #[arg(long)]
  name:     String,
  #[arg(long)]
  phone:    String,
  #[arg(long)]
  email:    Option<String>,
  #[arg(long)]
  district: String,
  #[arg(long)]
  site:     SiteId,
  /// Document type name; defaults to a Peruvian DNI.
  #[arg(long, requires = "country")]
  doc_type: Option<String>,
  #[arg(long)]
  country:  Option<String>,
  /// Required document length for a custom document type.
  #[arg(long)]
  length:   Option<usize>,
  /// Allow letters in a custom document type.
  #[arg(long)]
  alphanumeric: bool,
  /// JSON file with the candidate's screening answers.
  #[arg(long)]
  qualification: Option<PathBuf>,
}

impl RegisterArgs {
  fn document_type(&self) -> DocumentType {
    match (&self.doc_type, &self.country) {
      (Some(name), Some(country)) => DocumentType {
        name:            name.clone(),
        country_code:    country.clone(),
        required_length: self.length,
        numeric_only:    !self.alphanumeric,
      },
      _ => DocumentType::dni(),
    }
  }

  fn qualification(&self) -> anyhow::Result<Option<Qualification>> {
    let Some(path) = &self.qualification else {
      return Ok(None);
    };
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("failed to read qualification answers from {path:?}"))?;
    let answers = serde_json::from_str(&raw)
      .with_context(|| format!("failed to parse qualification answers in {path:?}"))?;
    Ok(Some(answers))
  }
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ScopeArgs {
  /// A single start (or registration) date.
  #[arg(long)]
  day:   Option<NaiveDate>,
  /// A calendar month, as YYYY-MM.
  #[arg(long, value_parser = parse_month)]
  month: Option<DateScope>,
}

#[derive(Args)]
struct VisibilityArgs {
  #[command(flatten)]
  scope:      ScopeArgs,
  /// Act on REGISTERED candidates without a process instead.
  #[arg(long)]
  registered: bool,
}

impl VisibilityArgs {
  fn scope(&self) -> anyhow::Result<DateScope> {
    match (self.scope.day, self.scope.month) {
      (Some(date), None) => Ok(DateScope::Day { date }),
      (None, Some(scope)) => Ok(scope),
      _ => anyhow::bail!("exactly one of --day or --month is required"),
    }
  }
}

fn parse_month(s: &str) -> Result<DateScope, String> {
  let (year, month) = s
    .split_once('-')
    .ok_or_else(|| format!("expected YYYY-MM, got {s:?}"))?;
  let year = year.parse().map_err(|_| format!("invalid year in {s:?}"))?;
  let month = month.parse().map_err(|_| format!("invalid month in {s:?}"))?;
  DateScope::month(year, month).map_err(|e| e.to_string())
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
  // Logs go to stderr; stdout carries the JSON result.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = AppConfig::load(&cli.config)?;

  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_clock(Arc::new(cfg.clock()?))
    .with_attendance_policy(cfg.attendance.clone())?
    .with_retry(cfg.retry);

  let actor = cli.user.clone().or_else(|| cfg.operator.clone()).map(UserRef);

  match run(&store, &cfg, actor, cli.command).await {
    Ok(()) => Ok(ExitCode::SUCCESS),
    Err(err) => match rejection(&err) {
      Some(report) => {
        emit(&report)?;
        Ok(ExitCode::from(2))
      }
      None => Err(err),
    },
  }
}

/// The JSON report for a business rejection. Storage faults and errors
/// outside the store give `None` and propagate.
fn rejection(err: &anyhow::Error) -> Option<serde_json::Value> {
  let store_err = err.downcast_ref::<convoca_store_sqlite::Error>()?;
  let kind = store_err.kind();
  (kind != ErrorKind::Internal).then(|| json!({ "error": kind, "message": store_err.to_string() }))
}

async fn run(
  store: &SqliteStore,
  cfg: &AppConfig,
  actor: Option<UserRef>,
  command: Command,
) -> anyhow::Result<()> {
  match command {
    Command::AddCompany { name } => emit(&store.add_company(name).await?),
    Command::AddSite { company, name, city } => {
      emit(&store.add_site(company, name, city).await?)
    }
    Command::AddSupervisor { name } => emit(&store.add_supervisor(name).await?),
    Command::RemoveSupervisor { supervisor } => {
      let detached = store.remove_supervisor(supervisor).await?;
      emit(&json!({ "supervisor": supervisor, "processes_detached": detached }))
    }

    Command::Register(args) => {
      let candidate = NewCandidate {
        qualification:     args.qualification()?,
        document_type:     args.document_type(),
        document:          args.document,
        full_name:         args.name,
        phone:             args.phone,
        email:             args.email,
        district:          args.district,
        registration_site: args.site,
        actor,
      };
      emit(&store.register_candidate(candidate).await?)
    }
    Command::Candidate { document } => {
      let candidate = store
        .get_candidate(document.clone())
        .await?
        .with_context(|| format!("no candidate with document {document}"))?;
      let qualification = store.get_qualification(document.clone()).await?;
      let processes = store.processes_for_candidate(document).await?;
      emit(&json!({
        "candidate": candidate,
        "qualification": qualification,
        "processes": processes,
      }))
    }
    Command::Search { query } => emit(&store.search_candidates(query).await?),
    Command::Process { process } => {
      let found = store
        .get_process(process)
        .await?
        .with_context(|| format!("no process {process}"))?;
      emit(&found)
    }

    Command::Convene { document, start, company, site, supervisor } => {
      let process = NewProcess { start_date: start, company, site, supervisor };
      emit(&store.convene(document, process, actor).await?)
    }
    Command::Transition { process, target, sales_objective_met, attitude_exception } => {
      let flags = (sales_objective_met || attitude_exception).then_some(OutcomeFlags {
        sales_objective_met,
        attitude_exception_applies: attitude_exception,
      });
      emit(&store.transition(process, target, flags, actor).await?)
    }
    Command::Bulk { target, candidates, start, reason } => {
      let request = BulkTransition {
        candidates,
        target,
        start_date: start,
        discard_reason: reason,
        actor,
      };
      emit(&store.bulk_transition(request, cfg.convene).await?)
    }
    Command::Supervise { process, supervisor } => {
      emit(&store.assign_supervisor(process, supervisor, actor).await?)
    }
    Command::EditDate { process, stage, date } => {
      emit(&store.edit_stage_date(process, stage, date).await?)
    }

    Command::Mark { process, movement } => {
      let mark = AttendanceMark { process_id: process, requested: movement, recorded_by: actor };
      emit(&store.record_attendance(mark).await?)
    }
    Command::CheckIn { query } => emit(&store.check_in(query, actor).await?),
    Command::Attendance { process } => emit(&store.attendance_for_process(process).await?),
    Command::Day { date } => emit(&store.attendance_for_day(date).await?),
    Command::Summary { date } => {
      let date = match date {
        Some(date) => date,
        None => cfg.clock()?.today(),
      };
      let summary = store.attendance_summary(date).await?;
      emit(&json!({ "summary": summary, "total": summary.total() }))
    }

    Command::Hide(args) => set_visibility(store, &args, false).await,
    Command::Unhide(args) => set_visibility(store, &args, true).await,

    Command::Comment { process, text } => {
      let comment = NewComment { process_id: process, text, author: actor };
      emit(&store.add_comment(comment).await?)
    }
    Command::Comments { process } => emit(&store.comments_for_process(process).await?),
    Command::AddTest { process, kind, file, result } => {
      let record = NewTestRecord {
        process_id: process,
        kind,
        file_ref: file,
        result,
        uploaded_by: actor,
      };
      emit(&store.add_test_record(record).await?)
    }
    Command::Tests { process } => emit(&store.test_records_for_process(process).await?),
    Command::AddDocument { document, kind, file, process, notes } => {
      let upload = NewCandidateDocument {
        candidate: document,
        process_id: process,
        kind,
        file_ref: file,
        notes,
        uploaded_by: actor,
      };
      emit(&store.add_candidate_document(upload).await?)
    }
    Command::Documents { document } => emit(&store.documents_for_candidate(document).await?),
  }
}

async fn set_visibility(
  store: &SqliteStore,
  args: &VisibilityArgs,
  visible: bool,
) -> anyhow::Result<()> {
  let scope = args.scope()?;
  let changed = if args.registered {
    store.set_registered_visibility(scope, visible).await?
  } else {
    store.set_process_visibility(scope, visible).await?
  };
  emit(&json!({ "scope": scope, "visible": visible, "changed": changed }))
}

fn emit<T: Serialize>(value: &T) -> anyhow::Result<()> {
  let out = serde_json::to_string_pretty(value).context("failed to serialise output")?;
  println!("{out}");
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/") {
    if let Ok(home) = std::env::var("HOME") {
      return PathBuf::from(home).join(rest);
    }
  }
  path.to_path_buf()
}
