//! Observations and test records attached to a process, and supporting
//! documents attached to a candidate.
//!
//! All are append-only. File content lives in an external file store;
//! records only hold an opaque reference to it.

use std::{fmt, str::FromStr};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  candidate::{DocumentNumber, UserRef},
  process::ProcessState,
};

pub const MAX_COMMENT_CHARS: usize = 500;
pub const MAX_DOCUMENT_NOTES_CHARS: usize = 500;

fn require_file_ref(file_ref: String) -> Result<String> {
  let file_ref = file_ref.trim().to_owned();
  if file_ref.is_empty() {
    return Err(Error::Validation("a file reference is required".into()));
  }
  Ok(file_ref)
}

/// A free-text observation written by staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id: Uuid,
  pub process_id: Uuid,
  /// Process state at the time of writing.
  pub phase:      ProcessState,
  pub text:       String,
  pub author:     Option<UserRef>,
  pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
  pub process_id: Uuid,
  pub text:       String,
  pub author:     Option<UserRef>,
}

impl NewComment {
  pub fn validated(mut self) -> Result<Self> {
    self.text = self.text.trim().to_owned();
    if self.text.is_empty() {
      return Err(Error::Validation("comment text is required".into()));
    }
    let len = self.text.chars().count();
    if len > MAX_COMMENT_CHARS {
      return Err(Error::Validation(format!(
        "comment has {len} characters; the limit is {MAX_COMMENT_CHARS}"
      )));
    }
    Ok(self)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestKind {
  #[serde(rename = "PSICOLOGICO")]
  Psychological,
  #[serde(rename = "CONOCIMIENTO")]
  Knowledge,
  #[serde(rename = "VENTAS_PRACTICA")]
  SalesPractice,
  #[serde(rename = "DOCUMENTO")]
  Document,
  #[serde(rename = "OTRO")]
  Other,
}

impl TestKind {
  pub const ALL: [Self; 5] = [
    Self::Psychological,
    Self::Knowledge,
    Self::SalesPractice,
    Self::Document,
    Self::Other,
  ];

  pub fn key(self) -> &'static str {
    match self {
      Self::Psychological => "PSICOLOGICO",
      Self::Knowledge => "CONOCIMIENTO",
      Self::SalesPractice => "VENTAS_PRACTICA",
      Self::Document => "DOCUMENTO",
      Self::Other => "OTRO",
    }
  }
}

impl fmt::Display for TestKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.key()) }
}

impl FromStr for TestKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|kind| kind.key() == s)
      .ok_or_else(|| Error::unknown_key("test kind", s))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRecord {
  pub record_id:   Uuid,
  pub process_id:  Uuid,
  pub kind:        TestKind,
  pub file_ref:    String,
  pub result:      Option<String>,
  pub uploaded_by: Option<UserRef>,
  pub uploaded_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone)]
pub struct NewTestRecord {
  pub process_id:  Uuid,
  pub kind:        TestKind,
  pub file_ref:    String,
  pub result:      Option<String>,
  pub uploaded_by: Option<UserRef>,
}

impl NewTestRecord {
  pub fn validated(mut self) -> Result<Self> {
    self.file_ref = require_file_ref(self.file_ref)?;
    self.result = self
      .result
      .map(|r| r.trim().to_owned())
      .filter(|r| !r.is_empty());
    Ok(self)
  }
}

// ─── Candidate documents ─────────────────────────────────────────────────────

/// Paperwork a candidate hands in (work certificates, background checks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
  #[serde(rename = "CERTIFICADO_LABORAL")]
  WorkCertificate,
  /// Certificado Único Laboral.
  #[serde(rename = "CUL")]
  UnifiedWorkCertificate,
  #[serde(rename = "ANTECEDENTES")]
  BackgroundCheck,
  #[serde(rename = "CURRICULUM")]
  Resume,
  #[serde(rename = "OTRO")]
  Other,
}

keyed!(DocumentKind, "document kind", {
  WorkCertificate => "CERTIFICADO_LABORAL",
  UnifiedWorkCertificate => "CUL",
  BackgroundCheck => "ANTECEDENTES",
  Resume => "CURRICULUM",
  Other => "OTRO",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDocument {
  pub document_id: Uuid,
  pub candidate:   DocumentNumber,
  /// The process the document was collected for, if any. Cleared when
  /// that process is deleted.
  pub process_id:  Option<Uuid>,
  pub kind:        DocumentKind,
  pub file_ref:    String,
  pub notes:       Option<String>,
  pub uploaded_by: Option<UserRef>,
  pub uploaded_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone)]
pub struct NewCandidateDocument {
  pub candidate:   DocumentNumber,
  pub process_id:  Option<Uuid>,
  pub kind:        DocumentKind,
  pub file_ref:    String,
  pub notes:       Option<String>,
  pub uploaded_by: Option<UserRef>,
}

impl NewCandidateDocument {
  pub fn validated(mut self) -> Result<Self> {
    self.file_ref = require_file_ref(self.file_ref)?;
    self.notes = self
      .notes
      .map(|n| n.trim().to_owned())
      .filter(|n| !n.is_empty());
    if let Some(notes) = &self.notes {
      let len = notes.chars().count();
      if len > MAX_DOCUMENT_NOTES_CHARS {
        return Err(Error::Validation(format!(
          "document notes have {len} characters; the limit is {MAX_DOCUMENT_NOTES_CHARS}"
        )));
      }
    }
    Ok(self)
  }
}
