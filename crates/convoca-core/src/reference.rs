//! Reference data: client companies, their sites, and supervisors.
//!
//! These rows are maintained by the surrounding application; the pipeline
//! only holds references to them.

use serde::{Deserialize, Serialize};

pub type CompanyId = i64;
pub type SiteId = i64;
pub type SupervisorId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
  pub company_id: CompanyId,
  pub name:       String,
}

/// A physical location of a client company where candidates register and
/// train.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
  pub site_id:    SiteId,
  pub company_id: CompanyId,
  pub name:       String,
  pub city:       String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supervisor {
  pub supervisor_id: SupervisorId,
  pub name:          String,
}
