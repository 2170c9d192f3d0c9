//! Candidate: one row per person, keyed by national document number.
//!
//! The candidate owns the *master* lifecycle status, a summary of its most
//! relevant hiring process. Detailed pipeline state lives on
//! [`Process`](crate::process::Process).

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  process::ProcessState,
  qualification::Qualification,
  reference::SiteId,
};

// ─── Identity ────────────────────────────────────────────────────────────────

/// National document number; the immutable primary key of a candidate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentNumber(String);

impl DocumentNumber {
  pub fn new(value: impl Into<String>) -> Self { Self(value.into().trim().to_owned()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for DocumentNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for DocumentNumber {
  fn from(value: &str) -> Self { Self::new(value) }
}

/// Describes the shape of a national document for one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentType {
  /// e.g. "DNI", "Cédula".
  pub name:            String,
  /// e.g. "PER", "COL".
  pub country_code:    String,
  pub required_length: Option<usize>,
  pub numeric_only:    bool,
}

impl DocumentType {
  /// Peruvian national identity document: eight digits.
  pub fn dni() -> Self {
    Self {
      name:            "DNI".into(),
      country_code:    "PER".into(),
      required_length: Some(8),
      numeric_only:    true,
    }
  }

  pub fn validate(&self, number: &DocumentNumber) -> Result<()> {
    let value = number.as_str();
    if value.is_empty() {
      return Err(Error::Validation("document number is empty".into()));
    }
    if self.numeric_only && !value.chars().all(|c| c.is_ascii_digit()) {
      return Err(Error::Validation(format!(
        "{} {value:?} must contain digits only",
        self.name
      )));
    }
    if let Some(len) = self.required_length {
      if value.chars().count() != len {
        return Err(Error::Validation(format!(
          "{} {value:?} must be exactly {len} characters long",
          self.name
        )));
      }
    }
    Ok(())
  }
}

// ─── Master status ───────────────────────────────────────────────────────────

/// Candidate-level lifecycle status.
///
/// Declaration order is the total order used for monotonic progress:
/// a candidate only moves to a status with a greater [`rank`](Self::rank),
/// except that terminal statuses always apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateStatus {
  #[serde(rename = "REGISTRADO")]
  Registered,
  #[serde(rename = "CONVOCADO")]
  Convened,
  #[serde(rename = "CONFIRMADO")]
  Confirmed,
  #[serde(rename = "CAPACITACION_TEORICA")]
  TheoryTraining,
  #[serde(rename = "CAPACITACION_PRACTICA")]
  PracticeTraining,
  #[serde(rename = "NO_APTO")]
  NotApt,
  #[serde(rename = "DESISTE")]
  Withdrawn,
  #[serde(rename = "CONTRATADO")]
  Hired,
}

impl CandidateStatus {
  pub const ALL: [Self; 8] = [
    Self::Registered,
    Self::Convened,
    Self::Confirmed,
    Self::TheoryTraining,
    Self::PracticeTraining,
    Self::NotApt,
    Self::Withdrawn,
    Self::Hired,
  ];

  pub fn key(self) -> &'static str {
    match self {
      Self::Registered => "REGISTRADO",
      Self::Convened => "CONVOCADO",
      Self::Confirmed => "CONFIRMADO",
      Self::TheoryTraining => "CAPACITACION_TEORICA",
      Self::PracticeTraining => "CAPACITACION_PRACTICA",
      Self::NotApt => "NO_APTO",
      Self::Withdrawn => "DESISTE",
      Self::Hired => "CONTRATADO",
    }
  }

  pub fn rank(self) -> u8 { self as u8 }

  pub fn is_terminal(self) -> bool {
    matches!(self, Self::NotApt | Self::Withdrawn | Self::Hired)
  }

  /// The process state a bulk move to this status drives the active
  /// process into. `Registered` has none.
  pub fn process_state(self) -> Option<ProcessState> {
    match self {
      Self::Registered => None,
      Self::Convened => Some(ProcessState::Convened),
      Self::Confirmed => Some(ProcessState::Confirmed),
      Self::TheoryTraining => Some(ProcessState::Theory),
      Self::PracticeTraining => Some(ProcessState::Practice),
      Self::NotApt => Some(ProcessState::NotApt),
      Self::Withdrawn => Some(ProcessState::Withdrawn),
      Self::Hired => Some(ProcessState::Hired),
    }
  }
}

impl fmt::Display for CandidateStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.key()) }
}

impl FromStr for CandidateStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|status| status.key() == s)
      .ok_or_else(|| Error::unknown_key("candidate status", s))
  }
}

/// Why a candidate left the pipeline without being hired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscardReason {
  #[serde(rename = "NO_CONFIRMA")]
  NoConfirmation,
  #[serde(rename = "NO_SE_PRESENTE")]
  NoShow,
  #[serde(rename = "SALARIO_NO_CONVENIENTE")]
  SalaryMismatch,
  #[serde(rename = "PROBLEMAS_PERSONALES")]
  PersonalIssues,
  #[serde(rename = "OTRO")]
  Other,
}

impl DiscardReason {
  pub const ALL: [Self; 5] = [
    Self::NoConfirmation,
    Self::NoShow,
    Self::SalaryMismatch,
    Self::PersonalIssues,
    Self::Other,
  ];

  pub fn key(self) -> &'static str {
    match self {
      Self::NoConfirmation => "NO_CONFIRMA",
      Self::NoShow => "NO_SE_PRESENTE",
      Self::SalaryMismatch => "SALARIO_NO_CONVENIENTE",
      Self::PersonalIssues => "PROBLEMAS_PERSONALES",
      Self::Other => "OTRO",
    }
  }
}

impl FromStr for DiscardReason {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|reason| reason.key() == s)
      .ok_or_else(|| Error::unknown_key("discard reason", s))
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

/// Opaque reference to the operator performing an action, supplied by the
/// surrounding identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRef(pub String);

impl fmt::Display for UserRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Candidate ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
  pub document:          DocumentNumber,
  pub document_type:     DocumentType,
  pub full_name:         String,
  pub phone:             String,
  pub email:             Option<String>,
  pub district:          String,
  pub registration_site: SiteId,
  /// Set once, when the candidate is first registered.
  pub registered_on:     NaiveDate,
  pub status:            CandidateStatus,
  pub discard_reason:    Option<DiscardReason>,
  pub last_modified_by:  Option<UserRef>,
  /// Board visibility; independent of `status`.
  pub active_in_board:   bool,
}

/// Input for registering (or re-registering) a candidate.
#[derive(Debug, Clone)]
pub struct NewCandidate {
  pub document:          DocumentNumber,
  pub document_type:     DocumentType,
  pub full_name:         String,
  pub phone:             String,
  pub email:             Option<String>,
  pub district:          String,
  pub registration_site: SiteId,
  /// Screening answers, when collected at this registration.
  pub qualification:     Option<Qualification>,
  pub actor:             Option<UserRef>,
}

impl NewCandidate {
  /// Check required fields and the document/phone formats, and normalise
  /// whitespace and empty e-mail addresses.
  pub fn validated(mut self) -> Result<Self> {
    self.full_name = self.full_name.trim().to_owned();
    self.phone = self.phone.trim().to_owned();
    self.district = self.district.trim().to_owned();
    self.email = self
      .email
      .map(|e| e.trim().to_owned())
      .filter(|e| !e.is_empty());

    self.document_type.validate(&self.document)?;

    if self.full_name.is_empty() {
      return Err(Error::Validation("full name is required".into()));
    }
    if self.phone.is_empty() {
      return Err(Error::Validation("phone is required".into()));
    }
    if !self.phone.chars().all(|c| c.is_ascii_digit()) {
      return Err(Error::Validation(format!(
        "phone {:?} must contain digits only",
        self.phone
      )));
    }
    self.qualification = self.qualification.map(Qualification::validated).transpose()?;
    Ok(self)
  }
}

/// Result of [`register_candidate`](crate::store::PipelineStore::register_candidate).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", content = "candidate", rename_all = "snake_case")]
pub enum Registration {
  Created(Candidate),
  /// The document number already existed; profile fields were refreshed.
  Updated(Candidate),
}

impl Registration {
  pub fn candidate(&self) -> &Candidate {
    match self {
      Self::Created(c) | Self::Updated(c) => c,
    }
  }
}

// ─── Lookup ──────────────────────────────────────────────────────────────────

/// Most rows a candidate search returns.
pub const SEARCH_LIMIT: usize = 10;

/// One hit of a candidate search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateMatch {
  pub document:  DocumentNumber,
  pub full_name: String,
  pub phone:     String,
}

/// Reduce what was typed at the check-in kiosk to its digits, which are
/// matched against document numbers and phones.
pub fn check_in_key(raw: &str) -> Result<String> {
  let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
  if digits.is_empty() {
    return Err(Error::Validation(format!("{raw:?} holds no document or phone number")));
  }
  Ok(digits)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn new_candidate(document: &str, phone: &str) -> NewCandidate {
    NewCandidate {
      document:          document.into(),
      document_type:     DocumentType::dni(),
      full_name:         "  Rosa Quispe ".into(),
      phone:             phone.into(),
      email:             Some("   ".into()),
      district:          "Miraflores".into(),
      registration_site: 1,
      qualification:     None,
      actor:             None,
    }
  }

  #[test]
  fn dni_requires_eight_digits() {
    let dni = DocumentType::dni();
    assert!(dni.validate(&"12345678".into()).is_ok());
    assert!(matches!(
      dni.validate(&"1234567".into()),
      Err(Error::Validation(_))
    ));
    assert!(matches!(
      dni.validate(&"1234567A".into()),
      Err(Error::Validation(_))
    ));
  }

  #[test]
  fn alphanumeric_document_types_skip_digit_check() {
    let passport = DocumentType {
      name:            "Pasaporte".into(),
      country_code:    "VEN".into(),
      required_length: None,
      numeric_only:    false,
    };
    assert!(passport.validate(&"AB123".into()).is_ok());
    assert!(passport.validate(&"  ".into()).is_err());
  }

  #[test]
  fn validated_normalises_fields() {
    let c = new_candidate("12345678", "987654321").validated().unwrap();
    assert_eq!(c.full_name, "Rosa Quispe");
    assert_eq!(c.email, None);
  }

  #[test]
  fn validated_rejects_non_numeric_phone() {
    let err = new_candidate("12345678", "98-765").validated().unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn check_in_key_keeps_digits_only() {
    assert_eq!(check_in_key(" 4567-8912 ").unwrap(), "45678912");
    assert_eq!(check_in_key("+51 987 654 321").unwrap(), "51987654321");
    assert!(matches!(check_in_key("DNI"), Err(Error::Validation(_))));
  }

  #[test]
  fn status_rank_follows_declaration_order() {
    let ranks: Vec<u8> = CandidateStatus::ALL.iter().map(|s| s.rank()).collect();
    assert_eq!(ranks, (0..8).collect::<Vec<u8>>());
    assert!(CandidateStatus::Convened.rank() < CandidateStatus::Hired.rank());
  }

  #[test]
  fn status_keys_roundtrip_through_from_str() {
    for status in CandidateStatus::ALL {
      assert_eq!(status.key().parse::<CandidateStatus>().unwrap(), status);
    }
    let err = "ENTREVISTADO".parse::<CandidateStatus>().unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::InvalidState);
  }

  #[test]
  fn serde_uses_status_keys() {
    let json = serde_json::to_string(&CandidateStatus::PracticeTraining).unwrap();
    assert_eq!(json, "\"CAPACITACION_PRACTICA\"");
  }
}
