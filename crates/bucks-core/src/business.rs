//! Businesses and the note-value balance aggregate the ledger owns.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A participating business.
///
/// Directory metadata (name, category) is owned by the external business
/// directory; the ledger owns the three balance fields and reads
/// `is_active` to refuse check-ins at closed businesses.
///
/// Invariant: `current_balance = lifetime_accepted - lifetime_redeemed`,
/// and `current_balance` is never negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
  pub business_id:       String,
  pub label:             String,
  pub is_active:         bool,
  /// Note value accepted and not yet redeemed.
  pub current_balance:   Decimal,
  pub lifetime_accepted: Decimal,
  pub lifetime_redeemed: Decimal,
  pub created_at:        DateTime<Utc>,
}
