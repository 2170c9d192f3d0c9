//! Screening answers a candidate gives when registering.
//!
//! One record per candidate. Re-registering with new answers replaces the
//! stored record; re-registering without answers leaves it alone.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const MAX_EMPLOYER_CHARS: usize = 150;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesExperience {
  #[serde(rename = "CALLCENTER")]
  CallCenter,
  #[serde(rename = "ESCRITOS")]
  Written,
  #[serde(rename = "PRESENCIALES")]
  InPerson,
  #[default]
  #[serde(rename = "NO")]
  NoExperience,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesTenure {
  #[serde(rename = "MENOS_3")]
  UnderThreeMonths,
  #[serde(rename = "MENOS_6")]
  UnderSixMonths,
  #[serde(rename = "MENOS_1_ANIO")]
  UnderOneYear,
  #[serde(rename = "MAS_1_ANIO")]
  OneYearOrMore,
}

/// Whether the candidate accepts the offered benefits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BenefitsAgreement {
  #[serde(rename = "SI")]
  Yes,
  #[serde(rename = "NO")]
  No,
  #[serde(rename = "OTRO")]
  Other,
}

keyed!(SalesExperience, "sales experience", {
  CallCenter => "CALLCENTER",
  Written => "ESCRITOS",
  InPerson => "PRESENCIALES",
  NoExperience => "NO",
});
keyed!(SalesTenure, "sales tenure", {
  UnderThreeMonths => "MENOS_3",
  UnderSixMonths => "MENOS_6",
  UnderOneYear => "MENOS_1_ANIO",
  OneYearOrMore => "MAS_1_ANIO",
});
keyed!(BenefitsAgreement, "benefits agreement", { Yes => "SI", No => "NO", Other => "OTRO" });

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualification {
  pub secondary_complete:          bool,
  /// Has sold for Spanish campaigns before.
  pub spanish_campaign_experience: bool,
  #[serde(default)]
  pub sales_experience:            SalesExperience,
  #[serde(default)]
  pub sales_employer:              Option<String>,
  #[serde(default)]
  pub sales_tenure:                Option<SalesTenure>,
  pub benefits_agreement:          BenefitsAgreement,
  /// Free text explaining an `OTRO` benefits answer.
  #[serde(default)]
  pub benefits_detail:             Option<String>,
  /// Can work the 06:15 to 15:00 shift.
  pub schedule_available:          bool,
  /// Disability or chronic illness, as declared.
  #[serde(default)]
  pub chronic_condition:           Option<String>,
  pub speech_difficulty:           bool,
}

fn clean(text: Option<String>) -> Option<String> {
  text.map(|t| t.trim().to_owned()).filter(|t| !t.is_empty())
}

impl Qualification {
  /// Trim free text and drop answers that only apply to another choice:
  /// employer and tenure without sales experience, benefits detail
  /// without an `OTRO` answer.
  pub fn validated(mut self) -> Result<Self> {
    self.sales_employer = clean(self.sales_employer);
    self.benefits_detail = clean(self.benefits_detail);
    self.chronic_condition = clean(self.chronic_condition);

    if self.sales_experience == SalesExperience::NoExperience {
      self.sales_employer = None;
      self.sales_tenure = None;
    }
    if self.benefits_agreement != BenefitsAgreement::Other {
      self.benefits_detail = None;
    }
    if let Some(employer) = &self.sales_employer {
      if employer.chars().count() > MAX_EMPLOYER_CHARS {
        return Err(Error::Validation(format!(
          "sales employer exceeds {MAX_EMPLOYER_CHARS} characters"
        )));
      }
    }
    Ok(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn answers() -> Qualification {
    Qualification {
      secondary_complete:          true,
      spanish_campaign_experience: false,
      sales_experience:            SalesExperience::CallCenter,
      sales_employer:              Some("  Atento Perú ".into()),
      sales_tenure:                Some(SalesTenure::UnderSixMonths),
      benefits_agreement:          BenefitsAgreement::Yes,
      benefits_detail:             Some("más vacaciones".into()),
      schedule_available:          true,
      chronic_condition:           Some("   ".into()),
      speech_difficulty:           false,
    }
  }

  #[test]
  fn validated_trims_and_drops_unrelated_answers() {
    let q = answers().validated().unwrap();
    assert_eq!(q.sales_employer.as_deref(), Some("Atento Perú"));
    assert_eq!(q.benefits_detail, None);
    assert_eq!(q.chronic_condition, None);
  }

  #[test]
  fn no_sales_experience_clears_employer_and_tenure() {
    let mut q = answers();
    q.sales_experience = SalesExperience::NoExperience;
    q.benefits_agreement = BenefitsAgreement::Other;
    let q = q.validated().unwrap();
    assert_eq!(q.sales_employer, None);
    assert_eq!(q.sales_tenure, None);
    assert_eq!(q.benefits_detail.as_deref(), Some("más vacaciones"));
  }

  #[test]
  fn long_employer_is_rejected() {
    let mut q = answers();
    q.sales_employer = Some("x".repeat(MAX_EMPLOYER_CHARS + 1));
    assert!(matches!(q.validated(), Err(Error::Validation(_))));
  }

  #[test]
  fn json_uses_wire_keys_and_defaults() {
    let q: Qualification = serde_json::from_str(
      r#"{
        "secondary_complete": true,
        "spanish_campaign_experience": true,
        "benefits_agreement": "OTRO",
        "schedule_available": false,
        "speech_difficulty": false
      }"#,
    )
    .unwrap();
    assert_eq!(q.sales_experience, SalesExperience::NoExperience);
    assert_eq!(q.benefits_agreement, BenefitsAgreement::Other);
    assert_eq!("MAS_1_ANIO".parse::<SalesTenure>().unwrap(), SalesTenure::OneYearOrMore);
    assert!("MAS_2_ANIOS".parse::<SalesTenure>().is_err());
  }
}
