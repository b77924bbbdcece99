//! The `LedgerStore` trait and supporting configuration types.
//!
//! The trait is implemented by storage backends (e.g. `bucks-store-sqlite`).
//! Higher layers depend on this abstraction, not on any concrete backend.

use std::future::Future;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
  business::Business,
  note::{Note, NoteStatus, PaymentEligibility},
  profile::{Checkin, CheckinEvent, LoyaltyProfile},
  transaction::Transaction,
};

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Whether redemption approval must verify that the requested amount is
/// covered by the business's current balance.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionPolicy {
  /// Reject approval when the request exceeds the balance.
  #[default]
  RequireCoveringBalance,
  /// Approve regardless; the note walk consumes what it can find and the
  /// balance debit is clamped at zero.
  AllowUncovered,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Kinderbucks ledger backend.
///
/// Every multi-entity effect (payment, redemption approval, check-in
/// mutation) must be applied as one atomic write: all of its mutations
/// become visible together or not at all. The backend's transaction is the
/// only concurrency primitive; the trait adds no locking of its own.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait LedgerStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Notes ─────────────────────────────────────────────────────────────

  /// Create a batch of draft notes at one denomination.
  ///
  /// Fails if any serial is malformed or already exists; no notes are
  /// created in that case.
  fn create_batch(
    &self,
    serials: Vec<String>,
    denomination: u32,
  ) -> impl Future<Output = Result<Vec<Note>, Self::Error>> + Send;

  /// Move a draft note to `Issued`, optionally tagging a destination.
  fn issue_note(
    &self,
    serial: &str,
    destination: Option<String>,
  ) -> impl Future<Output = Result<Note, Self::Error>> + Send;

  /// Record a scan. The first scan of a draft or issued note activates it;
  /// every scan increments the counter, whatever the status.
  fn record_scan(
    &self,
    serial: &str,
  ) -> impl Future<Output = Result<Note, Self::Error>> + Send;

  /// Retrieve a note by serial. Returns `None` if not found.
  fn get_note(
    &self,
    serial: &str,
  ) -> impl Future<Output = Result<Option<Note>, Self::Error>> + Send;

  /// List notes, optionally filtered by status, in ascending serial order.
  fn list_notes(
    &self,
    status: Option<NoteStatus>,
  ) -> impl Future<Output = Result<Vec<Note>, Self::Error>> + Send;

  /// Advisory accept-payment check; see [`PaymentEligibility`].
  fn validate_for_payment(
    &self,
    serial: &str,
  ) -> impl Future<Output = Result<PaymentEligibility, Self::Error>> + Send;

  /// Administratively remove a non-redeemed note from circulation.
  fn retire_note(
    &self,
    serial: &str,
  ) -> impl Future<Output = Result<Note, Self::Error>> + Send;

  // ── Payments ──────────────────────────────────────────────────────────

  /// Atomically move an active note into `business_id`'s till, credit the
  /// current balance and lifetime-accepted total by the note's
  /// denomination, and append a completed payment record.
  ///
  /// The holder change is conditional on the note still being active and
  /// not already held by a business; losing that race fails the whole
  /// write with a conflict error rather than double-crediting.
  fn record_payment(
    &self,
    serial: &str,
    business_id: &str,
  ) -> impl Future<Output = Result<Transaction, Self::Error>> + Send;

  // ── Redemptions ───────────────────────────────────────────────────────

  /// Append a pending redemption request for `amount`.
  fn create_redemption(
    &self,
    business_id: &str,
    amount: Decimal,
  ) -> impl Future<Output = Result<Transaction, Self::Error>> + Send;

  /// Approve or reject a pending redemption.
  ///
  /// Approval debits the balance by the requested amount and consumes the
  /// business's active notes in ascending serial order until their total
  /// covers it; the last note may overshoot ("round up to the next whole
  /// note"). Processing a non-pending transaction fails.
  fn process_redemption(
    &self,
    transaction_id: Uuid,
    approved: bool,
    actor: &str,
  ) -> impl Future<Output = Result<Transaction, Self::Error>> + Send;

  // ── Check-ins & profiles ──────────────────────────────────────────────

  /// Count a visit, unless the identity+business pair is on cooldown.
  /// Refuses check-ins at unknown or inactive businesses.
  fn check_in(
    &self,
    identity: &str,
    business_code: &str,
  ) -> impl Future<Output = Result<Checkin, Self::Error>> + Send;

  /// Retrieve a profile by identity. Returns `None` if not found.
  fn get_profile(
    &self,
    identity: &str,
  ) -> impl Future<Output = Result<Option<LoyaltyProfile>, Self::Error>> + Send;

  /// The identity's check-in history, newest first.
  fn list_checkins(
    &self,
    identity: &str,
  ) -> impl Future<Output = Result<Vec<CheckinEvent>, Self::Error>> + Send;

  /// Fold an anonymous profile into an authenticated identity: copy it if
  /// the authenticated profile does not exist yet, otherwise union the
  /// visited sets and sum the counts, recomputing the tier from the union.
  /// The anonymous profile is deleted.
  ///
  /// An absent anonymous profile is a harmless skip, so double invocation
  /// is a no-op. Returns the profile now stored under
  /// `authenticated_id`, or `None` if neither identity has one.
  fn migrate_profile(
    &self,
    anonymous_id: &str,
    authenticated_id: &str,
  ) -> impl Future<Output = Result<Option<LoyaltyProfile>, Self::Error>> + Send;

  // ── Businesses ────────────────────────────────────────────────────────

  /// Create a directory entry, or update its label if it already exists.
  /// Balances and the active flag are untouched on update.
  fn register_business(
    &self,
    business_id: &str,
    label: &str,
  ) -> impl Future<Output = Result<Business, Self::Error>> + Send;

  /// Retrieve a business by id. Returns `None` if not found.
  fn get_business(
    &self,
    business_id: &str,
  ) -> impl Future<Output = Result<Option<Business>, Self::Error>> + Send;

  /// Flip the directory's active flag.
  fn set_business_active(
    &self,
    business_id: &str,
    active: bool,
  ) -> impl Future<Output = Result<Business, Self::Error>> + Send;

  // ── Transactions ──────────────────────────────────────────────────────

  /// Retrieve a transaction by id. Returns `None` if not found.
  fn get_transaction(
    &self,
    transaction_id: Uuid,
  ) -> impl Future<Output = Result<Option<Transaction>, Self::Error>> + Send;

  /// List transactions, newest first, optionally for one business.
  fn list_transactions(
    &self,
    business_id: Option<&str>,
  ) -> impl Future<Output = Result<Vec<Transaction>, Self::Error>> + Send;
}
