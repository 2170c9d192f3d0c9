//! SQL schema for the Convoca SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS companies (
    company_id  INTEGER PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS sites (
    site_id     INTEGER PRIMARY KEY,
    company_id  INTEGER NOT NULL REFERENCES companies(company_id),
    name        TEXT NOT NULL,
    city        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS supervisors (
    supervisor_id INTEGER PRIMARY KEY,
    name          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS candidates (
    document          TEXT PRIMARY KEY,
    document_type     TEXT NOT NULL,   -- JSON-encoded DocumentType
    full_name         TEXT NOT NULL,
    phone             TEXT NOT NULL,
    email             TEXT,
    district          TEXT NOT NULL,
    registration_site INTEGER NOT NULL REFERENCES sites(site_id),
    registered_on     TEXT NOT NULL,   -- YYYY-MM-DD; never updated
    status            TEXT NOT NULL,   -- CandidateStatus key
    discard_reason    TEXT,
    last_modified_by  TEXT,
    active_in_board   INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS processes (
    process_id                 TEXT PRIMARY KEY,
    candidate                  TEXT NOT NULL REFERENCES candidates(document),
    start_date                 TEXT NOT NULL,
    company_id                 INTEGER NOT NULL REFERENCES companies(company_id),
    site_id                    INTEGER NOT NULL REFERENCES sites(site_id),
    supervisor_id              INTEGER REFERENCES supervisors(supervisor_id)
                               ON DELETE SET NULL,
    state                      TEXT NOT NULL,   -- ProcessState key
    convened_on                TEXT,
    confirmed_on               TEXT,
    theory_on                  TEXT,
    practice_on                TEXT,
    hired_on                   TEXT,
    sales_objective_met        INTEGER NOT NULL DEFAULT 0,
    attitude_exception_applies INTEGER NOT NULL DEFAULT 0,
    visible                    INTEGER NOT NULL DEFAULT 1,
    created_at                 TEXT NOT NULL,   -- RFC 3339 UTC
    UNIQUE (candidate, start_date, company_id)
);

-- Attendance events are strictly append-only.
CREATE TABLE IF NOT EXISTS attendance (
    event_id    TEXT PRIMARY KEY,
    process_id  TEXT NOT NULL REFERENCES processes(process_id),
    candidate   TEXT NOT NULL REFERENCES candidates(document),  -- copied from the process
    recorded_at TEXT NOT NULL,   -- RFC 3339 in the operational offset
    local_day   TEXT NOT NULL,   -- YYYY-MM-DD of recorded_at
    phase       TEXT NOT NULL,
    movement    TEXT NOT NULL,   -- 'ENTRADA' | 'SALIDA'
    quality     TEXT NOT NULL,   -- 'A' | 'T' | 'F' | 'J'
    recorded_by TEXT,
    UNIQUE (process_id, local_day, movement)
);

CREATE TABLE IF NOT EXISTS comments (
    comment_id  TEXT PRIMARY KEY,
    process_id  TEXT NOT NULL REFERENCES processes(process_id),
    phase       TEXT NOT NULL,
    text        TEXT NOT NULL,
    author      TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS test_records (
    record_id   TEXT PRIMARY KEY,
    process_id  TEXT NOT NULL REFERENCES processes(process_id),
    kind        TEXT NOT NULL,
    file_ref    TEXT NOT NULL,
    result      TEXT,
    uploaded_by TEXT,
    uploaded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS qualifications (
    candidate                   TEXT PRIMARY KEY REFERENCES candidates(document),
    secondary_complete          INTEGER NOT NULL,
    spanish_campaign_experience INTEGER NOT NULL,
    sales_experience            TEXT NOT NULL,   -- SalesExperience key
    sales_employer              TEXT,
    sales_tenure                TEXT,            -- SalesTenure key
    benefits_agreement          TEXT NOT NULL,   -- 'SI' | 'NO' | 'OTRO'
    benefits_detail             TEXT,
    schedule_available          INTEGER NOT NULL,
    chronic_condition           TEXT,
    speech_difficulty           INTEGER NOT NULL
);

-- Candidate documents are append-only.
CREATE TABLE IF NOT EXISTS candidate_documents (
    document_id TEXT PRIMARY KEY,
    candidate   TEXT NOT NULL REFERENCES candidates(document),
    process_id  TEXT REFERENCES processes(process_id) ON DELETE SET NULL,
    kind        TEXT NOT NULL,   -- DocumentKind key
    file_ref    TEXT NOT NULL,
    notes       TEXT,
    uploaded_by TEXT,
    uploaded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS processes_candidate_idx ON processes(candidate);
CREATE INDEX IF NOT EXISTS processes_start_idx     ON processes(start_date);
CREATE INDEX IF NOT EXISTS attendance_day_idx      ON attendance(local_day);
CREATE INDEX IF NOT EXISTS comments_process_idx    ON comments(process_id);
CREATE INDEX IF NOT EXISTS test_records_process_idx ON test_records(process_id);
CREATE INDEX IF NOT EXISTS documents_candidate_idx ON candidate_documents(candidate);
CREATE INDEX IF NOT EXISTS candidates_phone_idx    ON candidates(phone);

PRAGMA user_version = 1;
";
