//! Transaction records — payments and redemptions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
  Payment,
  Redemption,
}

impl TransactionKind {
  /// The discriminant string stored in the `kind` column.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Payment => "payment",
      Self::Redemption => "redemption",
    }
  }
}

/// Payments are written `Completed`; redemptions start `Pending` and end
/// `Approved` or `Rejected`. Both end states are terminal — re-processing
/// a processed redemption fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
  Completed,
  Pending,
  Approved,
  Rejected,
}

impl TransactionStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Completed => "completed",
      Self::Pending => "pending",
      Self::Approved => "approved",
      Self::Rejected => "rejected",
    }
  }

  pub fn is_terminal(self) -> bool {
    !matches!(self, Self::Pending)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
  pub transaction_id:   Uuid,
  pub kind:             TransactionKind,
  pub amount:           Decimal,
  /// The note that moved; payments only.
  pub note_serial:      Option<String>,
  pub business_id:      String,
  pub business_label:   String,
  pub status:           TransactionStatus,
  /// Serials consumed by an approved redemption, in consumption order.
  pub consumed_serials: Vec<String>,
  pub created_at:       DateTime<Utc>,
  pub processed_at:     Option<DateTime<Utc>>,
  /// Who approved or rejected a redemption.
  pub processed_by:     Option<String>,
}
