//! Error type for `allergen-store-sqlite`.

use allergen_core::store::{StoreError, StoreErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] allergen_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A UNIQUE or PRIMARY KEY constraint rejected the write.
  #[error("duplicate {0}")]
  Duplicate(&'static str),

  #[error("user not found: {0}")]
  UserNotFound(i64),

  #[error("allergen not found: {0}")]
  UnknownAllergen(i64),

  #[error("product not found: {0}")]
  UnknownProduct(i64),
}

impl StoreError for Error {
  fn kind(&self) -> StoreErrorKind {
    match self {
      Error::Duplicate(_) => StoreErrorKind::Duplicate,
      Error::UserNotFound(_) | Error::UnknownAllergen(_) | Error::UnknownProduct(_) => {
        StoreErrorKind::NotFound
      }
      _ => StoreErrorKind::Other,
    }
  }
}

/// Turn constraint violations into [`Error::Duplicate`]; pass anything else
/// through as a database error.
pub(crate) fn classify(err: tokio_rusqlite::Error, what: &'static str) -> Error {
  use rusqlite::ffi;

  if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _)) = &err
    && matches!(
      e.extended_code,
      ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
  {
    return Error::Duplicate(what);
  }
  Error::Database(err)
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
