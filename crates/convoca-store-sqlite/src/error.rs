//! Error type for `convoca-store-sqlite`.

use convoca_core::ErrorKind;
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] convoca_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl Error {
  /// Coarse classification shared with [`convoca_core::Error`]. Database
  /// faults other than lock contention are `Internal`.
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      _ if self.is_transient() => ErrorKind::TransientStore,
      _ => ErrorKind::Internal,
    }
  }

  /// Whether the failure is lock contention that may clear on retry.
  pub fn is_transient(&self) -> bool {
    let sqlite = match self {
      Self::Sqlite(e) => e,
      Self::Database(tokio_rusqlite::Error::Rusqlite(e)) => e,
      _ => return false,
    };
    matches!(
      sqlite.sqlite_error_code(),
      Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
