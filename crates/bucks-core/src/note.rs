//! Currency notes — the circulating unit of the Kinderbucks ledger.
//!
//! A note is created in bulk at a fixed denomination and moves through a
//! monotonic lifecycle: draft → issued → active → redeemed, with a separate
//! terminal `retired` for administrative removal from circulation. Notes are
//! never deleted; history is carried by status and audit timestamps.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Serials ─────────────────────────────────────────────────────────────────

/// Prefix shared by every note serial.
pub const SERIAL_PREFIX: &str = "KB-";

/// Format a note number as a printed serial (`KB-0042`).
pub fn format_serial(number: u32) -> String {
  format!("{SERIAL_PREFIX}{number:04}")
}

/// Check that a serial is `KB-` followed by exactly four ASCII digits.
pub fn is_valid_serial(serial: &str) -> bool {
  serial
    .strip_prefix(SERIAL_PREFIX)
    .is_some_and(|d| d.len() == 4 && d.bytes().all(|b| b.is_ascii_digit()))
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle state of a note. Transitions are strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
  /// Printed but not yet released.
  Draft,
  /// Released to an issue destination; not yet in circulation.
  Issued,
  /// In circulation; the only state a payment can accept.
  Active,
  /// Consumed by an approved redemption. Terminal.
  Redeemed,
  /// Administratively removed from circulation. Terminal.
  Retired,
}

impl NoteStatus {
  /// The discriminant string stored in the `status` column.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Draft => "draft",
      Self::Issued => "issued",
      Self::Active => "active",
      Self::Redeemed => "redeemed",
      Self::Retired => "retired",
    }
  }

  /// Whether the state machine permits moving to `next`.
  /// `Retired` is reachable from any non-redeemed state.
  pub fn can_become(self, next: NoteStatus) -> bool {
    use NoteStatus::*;
    matches!(
      (self, next),
      (Draft, Issued) | (Draft | Issued, Active) | (Active, Redeemed) | (Draft | Issued | Active, Retired)
    )
  }
}

impl fmt::Display for NoteStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Holder ──────────────────────────────────────────────────────────────────

/// The current possessor of a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Holder {
  /// No recorded possessor — the note is in a pocket somewhere.
  None,
  /// Resting in a business's till.
  Business { id: String },
}

impl Holder {
  pub fn is_business(&self) -> bool {
    matches!(self, Self::Business { .. })
  }

  /// The business id, if a business holds the note.
  pub fn business_id(&self) -> Option<&str> {
    match self {
      Self::Business { id } => Some(id),
      Self::None => None,
    }
  }
}

// ─── Note ────────────────────────────────────────────────────────────────────

/// One unit of the circulating currency. The serial is the immutable
/// identity; the denomination is fixed at creation and never changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
  pub serial:           String,
  /// Face value in whole bucks.
  pub denomination:     u32,
  pub status:           NoteStatus,
  /// Monotonic count of scans; only the first scan activates the note.
  pub scan_count:       u32,
  pub holder:           Holder,
  pub created_at:       DateTime<Utc>,
  pub issued_at:        Option<DateTime<Utc>>,
  /// Optional issue-destination tag (e.g. "spring fair booth").
  pub issued_to:        Option<String>,
  pub first_scanned_at: Option<DateTime<Utc>>,
  pub last_transfer_at: Option<DateTime<Utc>>,
  pub redeemed_at:      Option<DateTime<Utc>>,
  /// The redemption transaction that consumed this note.
  pub redeemed_in:      Option<Uuid>,
}

// ─── Payment eligibility ─────────────────────────────────────────────────────

/// Why a scanned note cannot be accepted as payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
  /// No note with the scanned serial exists.
  NotFound,
  /// The note exists but is not in circulation.
  NotActive { status: NoteStatus },
  /// The note is already resting in a business's till; a bill cannot be
  /// accepted twice without moving in between.
  HeldByBusiness,
}

impl fmt::Display for RejectReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NotFound => f.write_str("note not found"),
      Self::NotActive { status } => write!(f, "note is not active (status: {status})"),
      Self::HeldByBusiness => f.write_str("note is already held by a business"),
    }
  }
}

/// Advisory result of checking a note against the accept-payment
/// preconditions. Never raises; clients may call it repeatedly and
/// speculatively. The mutating payment path does its own guarding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaymentEligibility {
  Eligible { note: Note },
  Ineligible { reason: RejectReason },
}

impl PaymentEligibility {
  /// Evaluate the accept-payment preconditions against a looked-up note.
  pub fn evaluate(note: Option<Note>) -> Self {
    let Some(note) = note else {
      return Self::Ineligible { reason: RejectReason::NotFound };
    };
    if note.status != NoteStatus::Active {
      return Self::Ineligible {
        reason: RejectReason::NotActive { status: note.status },
      };
    }
    if note.holder.is_business() {
      return Self::Ineligible { reason: RejectReason::HeldByBusiness };
    }
    Self::Eligible { note }
  }

  pub fn is_eligible(&self) -> bool {
    matches!(self, Self::Eligible { .. })
  }
}
