//! Runtime configuration, read from `convoca.toml` and `CONVOCA_*`
//! environment variables.
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `CONVOCA_ATTENDANCE__LATE_CUTOFF=13:30`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use convoca_core::{
  attendance::AttendancePolicy,
  clock::{SystemClock, offset_from_minutes},
  pipeline::ConveneDefaults,
  retry::RetryPolicy,
};
use serde::Deserialize;

/// Lima, UTC-5, with no daylight saving.
const DEFAULT_UTC_OFFSET_MINUTES: i32 = -300;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub store_path:         PathBuf,
  /// Offset of the operational time zone, in minutes east of UTC.
  pub utc_offset_minutes: i32,
  pub attendance:         AttendancePolicy,
  /// Company, site and supervisor for mass convocations. Bulk convene is
  /// refused when unset.
  pub convene:            Option<ConveneDefaults>,
  pub retry:              RetryPolicy,
  /// Recorded as the actor of every change when `--user` is not given.
  pub operator:           Option<String>,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      store_path:         PathBuf::from("convoca.db"),
      utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
      attendance:         AttendancePolicy::default(),
      convene:            None,
      retry:              RetryPolicy::default(),
      operator:           None,
    }
  }
}

impl AppConfig {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("CONVOCA").separator("__"))
      .build()
      .context("failed to read configuration")?;
    Self::from_settings(settings)
  }

  fn from_settings(settings: config::Config) -> anyhow::Result<Self> {
    let cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise AppConfig")?;
    cfg.attendance.validate()?;
    offset_from_minutes(cfg.utc_offset_minutes)?;
    Ok(cfg)
  }

  pub fn clock(&self) -> anyhow::Result<SystemClock> {
    Ok(SystemClock::new(offset_from_minutes(self.utc_offset_minutes)?))
  }
}
