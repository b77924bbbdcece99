//! Error taxonomy for the Kinderbucks ledger.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::note::NoteStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("note not found: {0}")]
  NoteNotFound(String),

  #[error("business not found: {0}")]
  BusinessNotFound(String),

  #[error("transaction not found: {0}")]
  TransactionNotFound(Uuid),

  #[error("serial {0:?} is not of the form KB-0000")]
  InvalidSerial(String),

  #[error("denomination must be a positive face value")]
  InvalidDenomination,

  #[error("a note with serial {0} already exists")]
  DuplicateSerial(String),

  #[error("note {serial} cannot move from {from} to {to}")]
  InvalidTransition {
    serial: String,
    from:   NoteStatus,
    to:     NoteStatus,
  },

  #[error("transaction {0} has already been processed")]
  AlreadyProcessed(Uuid),

  #[error("business {0} is not active")]
  BusinessInactive(String),

  /// A conditional write found the note in a different state than expected.
  /// The caller should re-validate and retry.
  #[error("note {0} changed state concurrently")]
  Conflict(String),

  #[error("redemption of {requested} exceeds available balance {available}")]
  InsufficientFunds {
    requested: Decimal,
    available: Decimal,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
