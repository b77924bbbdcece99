//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 with fixed microsecond precision, so the stored
//! strings sort chronologically. Money is integer cents. String sets
//! (visited businesses, consumed serials) are compact JSON arrays.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use uuid::Uuid;

use bucks_core::{
  business::Business,
  note::{Holder, Note, NoteStatus},
  profile::{CheckinEvent, LoyaltyProfile},
  tier::Tier,
  transaction::{Transaction, TransactionKind, TransactionStatus},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_dt_opt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String {
  id.hyphenated().to_string()
}

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Uuid::parse_str(s).map_err(|e| Error::Column(format!("bad uuid {s:?}: {e}")))
}

// ─── Amounts ─────────────────────────────────────────────────────────────────

/// A decimal amount as whole cents. Sub-cent amounts are rejected; the
/// ledger never produces them.
pub fn encode_amount(amount: Decimal) -> Result<i64> {
  let scaled = amount * Decimal::from(100);
  if scaled.fract() != Decimal::ZERO {
    return Err(Error::Amount(format!("{amount} is not a whole cent amount")));
  }
  scaled
    .to_i64()
    .ok_or_else(|| Error::Amount(format!("{amount} does not fit in cents")))
}

pub fn decode_amount(cents: i64) -> Decimal {
  Decimal::new(cents, 2)
}

/// A note's face value (whole bucks) as cents.
pub fn denomination_cents(denomination: u32) -> i64 {
  i64::from(denomination) * 100
}

// ─── NoteStatus ──────────────────────────────────────────────────────────────

pub fn decode_note_status(s: &str) -> Result<NoteStatus> {
  match s {
    "draft" => Ok(NoteStatus::Draft),
    "issued" => Ok(NoteStatus::Issued),
    "active" => Ok(NoteStatus::Active),
    "redeemed" => Ok(NoteStatus::Redeemed),
    "retired" => Ok(NoteStatus::Retired),
    other => Err(Error::Column(format!("unknown note status: {other:?}"))),
  }
}

// ─── Holder ──────────────────────────────────────────────────────────────────

pub const HOLDER_NONE: &str = "none";
pub const HOLDER_BUSINESS: &str = "business";

pub fn decode_holder(kind: &str, id: Option<String>) -> Result<Holder> {
  match (kind, id) {
    (HOLDER_NONE, _) => Ok(Holder::None),
    (HOLDER_BUSINESS, Some(id)) => Ok(Holder::Business { id }),
    (HOLDER_BUSINESS, None) => {
      Err(Error::Column("business holder without an id".into()))
    }
    (other, _) => Err(Error::Column(format!("unknown holder kind: {other:?}"))),
  }
}

// ─── Tier ────────────────────────────────────────────────────────────────────

pub fn encode_tier(tier: Option<Tier>) -> Option<&'static str> {
  tier.map(Tier::as_str)
}

pub fn decode_tier(s: Option<&str>) -> Result<Option<Tier>> {
  match s {
    None => Ok(None),
    Some("curious") => Ok(Some(Tier::Curious)),
    Some("hooked") => Ok(Some(Tier::Hooked)),
    Some("line_and_sinker") => Ok(Some(Tier::LineAndSinker)),
    Some("patron") => Ok(Some(Tier::Patron)),
    Some(other) => Err(Error::Column(format!("unknown tier: {other:?}"))),
  }
}

// ─── Transaction kind / status ───────────────────────────────────────────────

pub fn decode_tx_kind(s: &str) -> Result<TransactionKind> {
  match s {
    "payment" => Ok(TransactionKind::Payment),
    "redemption" => Ok(TransactionKind::Redemption),
    other => Err(Error::Column(format!("unknown transaction kind: {other:?}"))),
  }
}

pub fn decode_tx_status(s: &str) -> Result<TransactionStatus> {
  match s {
    "completed" => Ok(TransactionStatus::Completed),
    "pending" => Ok(TransactionStatus::Pending),
    "approved" => Ok(TransactionStatus::Approved),
    "rejected" => Ok(TransactionStatus::Rejected),
    other => Err(Error::Column(format!("unknown transaction status: {other:?}"))),
  }
}

// ─── String lists ────────────────────────────────────────────────────────────

pub fn encode_string_list(items: &[String]) -> Result<String> {
  Ok(serde_json::to_string(items)?)
}

pub fn decode_string_list(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `notes` row.
pub struct RawNote {
  pub serial:           String,
  pub denomination:     i64,
  pub status:           String,
  pub scan_count:       i64,
  pub holder_kind:      String,
  pub holder_id:        Option<String>,
  pub created_at:       String,
  pub issued_at:        Option<String>,
  pub issued_to:        Option<String>,
  pub first_scanned_at: Option<String>,
  pub last_transfer_at: Option<String>,
  pub redeemed_at:      Option<String>,
  pub redeemed_in:      Option<String>,
}

impl RawNote {
  pub fn into_note(self) -> Result<Note> {
    Ok(Note {
      serial:           self.serial,
      denomination:     self.denomination as u32,
      status:           decode_note_status(&self.status)?,
      scan_count:       self.scan_count as u32,
      holder:           decode_holder(&self.holder_kind, self.holder_id)?,
      created_at:       decode_dt(&self.created_at)?,
      issued_at:        decode_dt_opt(self.issued_at.as_deref())?,
      issued_to:        self.issued_to,
      first_scanned_at: decode_dt_opt(self.first_scanned_at.as_deref())?,
      last_transfer_at: decode_dt_opt(self.last_transfer_at.as_deref())?,
      redeemed_at:      decode_dt_opt(self.redeemed_at.as_deref())?,
      redeemed_in:      self.redeemed_in.as_deref().map(decode_uuid).transpose()?,
    })
  }
}

/// Raw strings read directly from a `businesses` row.
pub struct RawBusiness {
  pub business_id:       String,
  pub label:             String,
  pub is_active:         bool,
  pub current_balance:   i64,
  pub lifetime_accepted: i64,
  pub lifetime_redeemed: i64,
  pub created_at:        String,
}

impl RawBusiness {
  pub fn into_business(self) -> Result<Business> {
    Ok(Business {
      business_id:       self.business_id,
      label:             self.label,
      is_active:         self.is_active,
      current_balance:   decode_amount(self.current_balance),
      lifetime_accepted: decode_amount(self.lifetime_accepted),
      lifetime_redeemed: decode_amount(self.lifetime_redeemed),
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `transactions` row.
pub struct RawTransaction {
  pub transaction_id:   String,
  pub kind:             String,
  pub amount_cents:     i64,
  pub note_serial:      Option<String>,
  pub business_id:      String,
  pub business_label:   String,
  pub status:           String,
  pub consumed_serials: String,
  pub created_at:       String,
  pub processed_at:     Option<String>,
  pub processed_by:     Option<String>,
}

impl RawTransaction {
  pub fn into_transaction(self) -> Result<Transaction> {
    Ok(Transaction {
      transaction_id:   decode_uuid(&self.transaction_id)?,
      kind:             decode_tx_kind(&self.kind)?,
      amount:           decode_amount(self.amount_cents),
      note_serial:      self.note_serial,
      business_id:      self.business_id,
      business_label:   self.business_label,
      status:           decode_tx_status(&self.status)?,
      consumed_serials: decode_string_list(&self.consumed_serials)?,
      created_at:       decode_dt(&self.created_at)?,
      processed_at:     decode_dt_opt(self.processed_at.as_deref())?,
      processed_by:     self.processed_by,
    })
  }
}

/// Raw strings read directly from a `profiles` row.
pub struct RawProfile {
  pub identity:        String,
  pub businesses:      String,
  pub checkin_count:   i64,
  pub tier:            Option<String>,
  pub created_at:      String,
  pub last_checkin_at: Option<String>,
}

impl RawProfile {
  pub fn into_profile(self) -> Result<LoyaltyProfile> {
    Ok(LoyaltyProfile {
      identity:        self.identity,
      businesses:      decode_string_list(&self.businesses)?,
      checkin_count:   self.checkin_count as u32,
      tier:            decode_tier(self.tier.as_deref())?,
      created_at:      decode_dt(&self.created_at)?,
      last_checkin_at: decode_dt_opt(self.last_checkin_at.as_deref())?,
    })
  }
}

/// Raw strings read directly from a `checkin_events` row.
pub struct RawCheckinEvent {
  pub event_id:      String,
  pub identity:      String,
  pub business_code: String,
  pub tier:          Option<String>,
  pub recorded_at:   String,
}

impl RawCheckinEvent {
  pub fn into_event(self) -> Result<CheckinEvent> {
    Ok(CheckinEvent {
      event_id:      decode_uuid(&self.event_id)?,
      identity:      self.identity,
      business_code: self.business_code,
      tier:          decode_tier(self.tier.as_deref())?,
      recorded_at:   decode_dt(&self.recorded_at)?,
    })
  }
}
