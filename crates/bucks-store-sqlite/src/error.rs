//! Error type for `bucks-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A domain precondition failed; carries the core taxonomy unchanged so
  /// callers see the same stable reason strings from every backend.
  #[error(transparent)]
  Core(#[from] bucks_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("database error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored column held a value the codecs do not recognise.
  #[error("invalid column value: {0}")]
  Column(String),

  /// An amount cannot be represented as whole cents.
  #[error("invalid amount: {0}")]
  Amount(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
