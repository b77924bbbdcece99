//! Integration tests for `SqliteStore` against an in-memory database.

use bucks_core::{
  Error as CoreError,
  note::{Holder, NoteStatus, PaymentEligibility, RejectReason},
  profile::{Checkin, cooldown},
  store::{LedgerStore, RedemptionPolicy},
  tier::Tier,
  transaction::{TransactionKind, TransactionStatus},
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn serials(list: &[&str]) -> Vec<String> {
  list.iter().map(|s| s.to_string()).collect()
}

async fn cafe(s: &SqliteStore) -> &'static str {
  s.register_business("CAFE", "Corner Cafe").await.unwrap();
  "CAFE"
}

/// Issue and first-scan a note so it is active and unheld.
async fn activate(s: &SqliteStore, serial: &str) {
  s.issue_note(serial, None).await.unwrap();
  s.record_scan(serial).await.unwrap();
}

/// `current_balance == lifetime_accepted - lifetime_redeemed` must hold
/// after every operation.
async fn assert_conserved(s: &SqliteStore, business_id: &str) {
  let b = s.get_business(business_id).await.unwrap().unwrap();
  assert_eq!(b.current_balance, b.lifetime_accepted - b.lifetime_redeemed);
  assert!(b.current_balance >= Decimal::ZERO);
}

// ─── Note lifecycle ──────────────────────────────────────────────────────────

#[tokio::test]
async fn create_batch_creates_draft_notes() {
  let s = store().await;
  let notes = s
    .create_batch(serials(&["KB-0001", "KB-0002"]), 5)
    .await
    .unwrap();

  assert_eq!(notes.len(), 2);
  for note in &notes {
    assert_eq!(note.status, NoteStatus::Draft);
    assert_eq!(note.denomination, 5);
    assert_eq!(note.scan_count, 0);
    assert_eq!(note.holder, Holder::None);
  }

  let fetched = s.get_note("KB-0002").await.unwrap().unwrap();
  assert_eq!(fetched.status, NoteStatus::Draft);
}

#[tokio::test]
async fn create_batch_rejects_malformed_serial() {
  let s = store().await;
  let err = s
    .create_batch(serials(&["KB-0001", "KB-12"]), 5)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::InvalidSerial(_))));
}

#[tokio::test]
async fn create_batch_rejects_duplicates_and_writes_nothing() {
  let s = store().await;
  s.create_batch(serials(&["KB-0001"]), 5).await.unwrap();

  // Against an already stored serial.
  let err = s
    .create_batch(serials(&["KB-0002", "KB-0001"]), 5)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::DuplicateSerial(_))));
  // The batch is all-or-nothing: KB-0002 must not have been created.
  assert!(s.get_note("KB-0002").await.unwrap().is_none());

  // Against a duplicate within the batch itself.
  let err = s
    .create_batch(serials(&["KB-0003", "KB-0003"]), 5)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::DuplicateSerial(_))));
}

#[tokio::test]
async fn create_batch_rejects_zero_denomination() {
  let s = store().await;
  let err = s.create_batch(serials(&["KB-0001"]), 0).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::InvalidDenomination)));
}

#[tokio::test]
async fn issue_sets_destination_and_timestamp() {
  let s = store().await;
  s.create_batch(serials(&["KB-0001"]), 5).await.unwrap();

  let note = s
    .issue_note("KB-0001", Some("spring fair".into()))
    .await
    .unwrap();
  assert_eq!(note.status, NoteStatus::Issued);
  assert_eq!(note.issued_to.as_deref(), Some("spring fair"));
  assert!(note.issued_at.is_some());
}

#[tokio::test]
async fn issue_twice_errors() {
  let s = store().await;
  s.create_batch(serials(&["KB-0001"]), 5).await.unwrap();
  s.issue_note("KB-0001", None).await.unwrap();

  let err = s.issue_note("KB-0001", None).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::InvalidTransition { from: NoteStatus::Issued, .. })
  ));
}

#[tokio::test]
async fn first_scan_activates_later_scans_only_count() {
  let s = store().await;
  s.create_batch(serials(&["KB-0001"]), 5).await.unwrap();
  s.issue_note("KB-0001", None).await.unwrap();

  let note = s.record_scan("KB-0001").await.unwrap();
  assert_eq!(note.status, NoteStatus::Active);
  assert_eq!(note.scan_count, 1);
  assert!(note.first_scanned_at.is_some());
  let first_scanned_at = note.first_scanned_at;

  s.record_scan("KB-0001").await.unwrap();
  let note = s.record_scan("KB-0001").await.unwrap();
  assert_eq!(note.status, NoteStatus::Active);
  assert_eq!(note.scan_count, 3);
  assert_eq!(note.first_scanned_at, first_scanned_at);
}

#[tokio::test]
async fn scan_activates_straight_from_draft() {
  let s = store().await;
  s.create_batch(serials(&["KB-0001"]), 5).await.unwrap();

  let note = s.record_scan("KB-0001").await.unwrap();
  assert_eq!(note.status, NoteStatus::Active);
  assert_eq!(note.scan_count, 1);
}

#[tokio::test]
async fn scan_missing_note_errors() {
  let s = store().await;
  let err = s.record_scan("KB-0404").await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::NoteNotFound(_))));
}

#[tokio::test]
async fn retire_is_terminal() {
  let s = store().await;
  s.create_batch(serials(&["KB-0001"]), 5).await.unwrap();

  let note = s.retire_note("KB-0001").await.unwrap();
  assert_eq!(note.status, NoteStatus::Retired);

  let err = s.retire_note("KB-0001").await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::InvalidTransition { from: NoteStatus::Retired, .. })
  ));

  // A retired note can still be scanned; only the counter moves.
  let note = s.record_scan("KB-0001").await.unwrap();
  assert_eq!(note.status, NoteStatus::Retired);
  assert_eq!(note.scan_count, 1);
}

#[tokio::test]
async fn list_notes_filters_by_status() {
  let s = store().await;
  s.create_batch(serials(&["KB-0001", "KB-0002", "KB-0003"]), 5)
    .await
    .unwrap();
  activate(&s, "KB-0002").await;

  let active = s.list_notes(Some(NoteStatus::Active)).await.unwrap();
  assert_eq!(active.len(), 1);
  assert_eq!(active[0].serial, "KB-0002");

  let all = s.list_notes(None).await.unwrap();
  assert_eq!(all.len(), 3);
  // ascending serial order
  assert_eq!(all[0].serial, "KB-0001");
  assert_eq!(all[2].serial, "KB-0003");
}

// ─── Payment eligibility ─────────────────────────────────────────────────────

#[tokio::test]
async fn eligibility_reports_status_specific_reasons() {
  let s = store().await;
  let cafe = cafe(&s).await;
  s.create_batch(serials(&["KB-0001", "KB-0002"]), 5)
    .await
    .unwrap();

  assert!(matches!(
    s.validate_for_payment("KB-0404").await.unwrap(),
    PaymentEligibility::Ineligible { reason: RejectReason::NotFound }
  ));

  assert!(matches!(
    s.validate_for_payment("KB-0001").await.unwrap(),
    PaymentEligibility::Ineligible {
      reason: RejectReason::NotActive { status: NoteStatus::Draft },
    }
  ));

  s.issue_note("KB-0001", None).await.unwrap();
  assert!(matches!(
    s.validate_for_payment("KB-0001").await.unwrap(),
    PaymentEligibility::Ineligible {
      reason: RejectReason::NotActive { status: NoteStatus::Issued },
    }
  ));

  s.record_scan("KB-0001").await.unwrap();
  assert!(s.validate_for_payment("KB-0001").await.unwrap().is_eligible());

  // A note resting in a till cannot be accepted again.
  s.record_payment("KB-0001", cafe).await.unwrap();
  assert!(matches!(
    s.validate_for_payment("KB-0001").await.unwrap(),
    PaymentEligibility::Ineligible { reason: RejectReason::HeldByBusiness }
  ));
}

// ─── Payments ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn payment_moves_note_and_credits_business() {
  let s = store().await;
  let cafe = cafe(&s).await;
  s.create_batch(serials(&["KB-0001"]), 5).await.unwrap();
  activate(&s, "KB-0001").await;

  let tx = s.record_payment("KB-0001", cafe).await.unwrap();
  assert_eq!(tx.kind, TransactionKind::Payment);
  assert_eq!(tx.status, TransactionStatus::Completed);
  assert_eq!(tx.amount, Decimal::from(5));
  assert_eq!(tx.note_serial.as_deref(), Some("KB-0001"));
  assert_eq!(tx.business_label, "Corner Cafe");

  let note = s.get_note("KB-0001").await.unwrap().unwrap();
  assert_eq!(note.holder, Holder::Business { id: cafe.into() });
  assert_eq!(note.status, NoteStatus::Active);
  assert!(note.last_transfer_at.is_some());

  let b = s.get_business(cafe).await.unwrap().unwrap();
  assert_eq!(b.current_balance, Decimal::from(5));
  assert_eq!(b.lifetime_accepted, Decimal::from(5));
  assert_eq!(b.lifetime_redeemed, Decimal::ZERO);
  assert_conserved(&s, cafe).await;
}

#[tokio::test]
async fn payment_missing_note_errors() {
  let s = store().await;
  let cafe = cafe(&s).await;
  let err = s.record_payment("KB-0404", cafe).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::NoteNotFound(_))));
}

#[tokio::test]
async fn payment_to_unknown_business_errors() {
  let s = store().await;
  s.create_batch(serials(&["KB-0001"]), 5).await.unwrap();
  activate(&s, "KB-0001").await;

  let err = s.record_payment("KB-0001", "NOWHERE").await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::BusinessNotFound(_))));
}

#[tokio::test]
async fn payment_of_non_active_note_conflicts() {
  let s = store().await;
  let cafe = cafe(&s).await;
  s.create_batch(serials(&["KB-0001"]), 5).await.unwrap();

  // Still draft: the conditional transfer finds nothing to move.
  let err = s.record_payment("KB-0001", cafe).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::Conflict(_))));

  // And nothing was credited.
  let b = s.get_business(cafe).await.unwrap().unwrap();
  assert_eq!(b.current_balance, Decimal::ZERO);
  assert_eq!(b.lifetime_accepted, Decimal::ZERO);
}

#[tokio::test]
async fn double_accept_second_call_conflicts() {
  let s = store().await;
  let cafe = cafe(&s).await;
  s.register_business("BAKERY", "Old Mill Bakery").await.unwrap();
  s.create_batch(serials(&["KB-0001"]), 5).await.unwrap();
  activate(&s, "KB-0001").await;

  s.record_payment("KB-0001", cafe).await.unwrap();
  let err = s.record_payment("KB-0001", "BAKERY").await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::Conflict(_))));

  // Exactly one credit happened.
  let b = s.get_business(cafe).await.unwrap().unwrap();
  assert_eq!(b.lifetime_accepted, Decimal::from(5));
  let b = s.get_business("BAKERY").await.unwrap().unwrap();
  assert_eq!(b.lifetime_accepted, Decimal::ZERO);
}

#[tokio::test]
async fn concurrent_double_accept_exactly_one_wins() {
  let s = store().await;
  let cafe = cafe(&s).await;
  s.register_business("BAKERY", "Old Mill Bakery").await.unwrap();
  s.create_batch(serials(&["KB-0001"]), 5).await.unwrap();
  activate(&s, "KB-0001").await;

  let (a, b) = tokio::join!(
    s.record_payment("KB-0001", cafe),
    s.record_payment("KB-0001", "BAKERY"),
  );

  let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
  assert_eq!(successes, 1, "exactly one accept may win");
  for outcome in [a, b] {
    if let Err(err) = outcome {
      assert!(matches!(err, Error::Core(CoreError::Conflict(_))));
    }
  }

  // The note rests with exactly one business and value was credited once.
  let note = s.get_note("KB-0001").await.unwrap().unwrap();
  assert!(note.holder.business_id().is_some());
  let cafe_total = s.get_business(cafe).await.unwrap().unwrap().lifetime_accepted;
  let bakery_total = s
    .get_business("BAKERY")
    .await
    .unwrap()
    .unwrap()
    .lifetime_accepted;
  assert_eq!(cafe_total + bakery_total, Decimal::from(5));
}

// ─── Redemptions ─────────────────────────────────────────────────────────────

/// Pay a freshly-activated batch into `business`.
async fn fill_till(s: &SqliteStore, business: &str, notes: &[(&str, u32)]) {
  for &(serial, denomination) in notes {
    s.create_batch(serials(&[serial]), denomination).await.unwrap();
    activate(s, serial).await;
    s.record_payment(serial, business).await.unwrap();
  }
}

#[tokio::test]
async fn create_redemption_is_pending() {
  let s = store().await;
  let cafe = cafe(&s).await;

  let tx = s
    .create_redemption(cafe, Decimal::from(12))
    .await
    .unwrap();
  assert_eq!(tx.kind, TransactionKind::Redemption);
  assert_eq!(tx.status, TransactionStatus::Pending);
  assert_eq!(tx.amount, Decimal::from(12));
  assert!(tx.consumed_serials.is_empty());
  assert!(tx.processed_at.is_none());
}

#[tokio::test]
async fn rejection_touches_nothing_but_the_transaction() {
  let s = store().await;
  let cafe = cafe(&s).await;
  fill_till(&s, cafe, &[("KB-0001", 5)]).await;

  let tx = s.create_redemption(cafe, Decimal::from(5)).await.unwrap();
  let tx = s
    .process_redemption(tx.transaction_id, false, "treasurer")
    .await
    .unwrap();
  assert_eq!(tx.status, TransactionStatus::Rejected);
  assert!(tx.status.is_terminal());
  assert_eq!(tx.processed_by.as_deref(), Some("treasurer"));
  assert!(tx.processed_at.is_some());
  assert!(tx.consumed_serials.is_empty());

  let note = s.get_note("KB-0001").await.unwrap().unwrap();
  assert_eq!(note.status, NoteStatus::Active);
  let b = s.get_business(cafe).await.unwrap().unwrap();
  assert_eq!(b.current_balance, Decimal::from(5));
  assert_conserved(&s, cafe).await;
}

#[tokio::test]
async fn processing_twice_errors() {
  let s = store().await;
  let cafe = cafe(&s).await;
  fill_till(&s, cafe, &[("KB-0001", 5)]).await;

  let tx = s.create_redemption(cafe, Decimal::from(5)).await.unwrap();
  s.process_redemption(tx.transaction_id, true, "treasurer")
    .await
    .unwrap();

  let err = s
    .process_redemption(tx.transaction_id, true, "treasurer")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::AlreadyProcessed(_))));

  // Rejection is just as terminal.
  let tx = s.create_redemption(cafe, Decimal::ZERO).await.unwrap();
  s.process_redemption(tx.transaction_id, false, "treasurer")
    .await
    .unwrap();
  let err = s
    .process_redemption(tx.transaction_id, true, "treasurer")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::AlreadyProcessed(_))));
}

#[tokio::test]
async fn processing_unknown_transaction_errors() {
  let s = store().await;
  let err = s
    .process_redemption(Uuid::new_v4(), true, "treasurer")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::TransactionNotFound(_))));
}

#[tokio::test]
async fn approval_overshoots_but_debits_the_requested_amount() {
  let s = store().await;
  let cafe = cafe(&s).await;
  fill_till(&s, cafe, &[("KB-0001", 5), ("KB-0002", 5), ("KB-0010", 10)]).await;

  let tx = s.create_redemption(cafe, Decimal::from(12)).await.unwrap();
  let tx = s
    .process_redemption(tx.transaction_id, true, "treasurer")
    .await
    .unwrap();

  assert_eq!(tx.status, TransactionStatus::Approved);
  // Ascending serial: 5 + 5 = 10 < 12, so the 10 is pulled in too.
  assert_eq!(tx.consumed_serials, ["KB-0001", "KB-0002", "KB-0010"]);

  for serial in &tx.consumed_serials {
    let note = s.get_note(serial).await.unwrap().unwrap();
    assert_eq!(note.status, NoteStatus::Redeemed);
    assert_eq!(note.redeemed_in, Some(tx.transaction_id));
    assert!(note.redeemed_at.is_some());
  }

  // The balance moves by the requested 12, not the consumed 20.
  let b = s.get_business(cafe).await.unwrap().unwrap();
  assert_eq!(b.current_balance, Decimal::from(8));
  assert_eq!(b.lifetime_redeemed, Decimal::from(12));
  assert_conserved(&s, cafe).await;
}

#[tokio::test]
async fn approval_stops_once_the_amount_is_covered() {
  let s = store().await;
  let cafe = cafe(&s).await;
  fill_till(&s, cafe, &[("KB-0001", 5), ("KB-0002", 5), ("KB-0010", 10)]).await;

  let tx = s.create_redemption(cafe, Decimal::from(10)).await.unwrap();
  let tx = s
    .process_redemption(tx.transaction_id, true, "treasurer")
    .await
    .unwrap();

  assert_eq!(tx.consumed_serials, ["KB-0001", "KB-0002"]);
  let survivor = s.get_note("KB-0010").await.unwrap().unwrap();
  assert_eq!(survivor.status, NoteStatus::Active);
  assert_conserved(&s, cafe).await;
}

#[tokio::test]
async fn default_policy_rejects_uncovered_requests() {
  let s = store().await;
  let cafe = cafe(&s).await;
  fill_till(&s, cafe, &[("KB-0001", 5)]).await;

  let tx = s.create_redemption(cafe, Decimal::from(12)).await.unwrap();
  let err = s
    .process_redemption(tx.transaction_id, true, "treasurer")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::InsufficientFunds { .. })));

  // The request stays pending and the till is untouched.
  let tx = s.get_transaction(tx.transaction_id).await.unwrap().unwrap();
  assert_eq!(tx.status, TransactionStatus::Pending);
  let note = s.get_note("KB-0001").await.unwrap().unwrap();
  assert_eq!(note.status, NoteStatus::Active);
  assert_conserved(&s, cafe).await;
}

#[tokio::test]
async fn uncovered_policy_consumes_what_it_can() {
  let s = store()
    .await
    .with_policy(RedemptionPolicy::AllowUncovered);
  let cafe = cafe(&s).await;
  fill_till(&s, cafe, &[("KB-0001", 5)]).await;

  let tx = s.create_redemption(cafe, Decimal::from(12)).await.unwrap();
  let tx = s
    .process_redemption(tx.transaction_id, true, "treasurer")
    .await
    .unwrap();

  // Under-target walk: everything available is consumed, no error raised.
  assert_eq!(tx.status, TransactionStatus::Approved);
  assert_eq!(tx.consumed_serials, ["KB-0001"]);

  // The debit is clamped so the balance bottoms out at zero and the
  // conservation identity survives.
  let b = s.get_business(cafe).await.unwrap().unwrap();
  assert_eq!(b.current_balance, Decimal::ZERO);
  assert_eq!(b.lifetime_redeemed, Decimal::from(5));
  assert_conserved(&s, cafe).await;
}

// ─── End-to-end scenario ─────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_from_print_to_cash() {
  let s = store().await;
  let cafe = cafe(&s).await;

  s.create_batch(serials(&["KB-0001", "KB-0002", "KB-0003"]), 5)
    .await
    .unwrap();
  for serial in ["KB-0001", "KB-0002", "KB-0003"] {
    s.issue_note(serial, Some("welcome desk".into())).await.unwrap();
  }

  let note = s.record_scan("KB-0001").await.unwrap();
  assert_eq!(note.status, NoteStatus::Active);
  assert_eq!(note.scan_count, 1);

  let payment = s.record_payment("KB-0001", cafe).await.unwrap();
  assert_eq!(payment.kind, TransactionKind::Payment);
  assert_eq!(payment.amount, Decimal::from(5));

  let b = s.get_business(cafe).await.unwrap().unwrap();
  assert_eq!(b.current_balance, Decimal::from(5));
  assert_eq!(b.lifetime_accepted, Decimal::from(5));

  let redemption = s.create_redemption(cafe, Decimal::from(5)).await.unwrap();
  let redemption = s
    .process_redemption(redemption.transaction_id, true, "treasurer")
    .await
    .unwrap();
  assert_eq!(redemption.consumed_serials, ["KB-0001"]);

  let note = s.get_note("KB-0001").await.unwrap().unwrap();
  assert_eq!(note.status, NoteStatus::Redeemed);

  let b = s.get_business(cafe).await.unwrap().unwrap();
  assert_eq!(b.current_balance, Decimal::ZERO);
  assert_eq!(b.lifetime_redeemed, Decimal::from(5));
  assert_conserved(&s, cafe).await;
}

// ─── Check-ins ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_checkin_creates_a_profile() {
  let s = store().await;
  cafe(&s).await;

  let result = s.check_in("anon_7f3a", "CAFE").await.unwrap();
  let Checkin::Recorded(outcome) = result else {
    panic!("expected a recorded check-in");
  };
  assert!(outcome.new_business);
  assert_eq!(outcome.previous_tier, None);
  assert!(outcome.tier_changed);
  assert_eq!(outcome.profile.tier, Some(Tier::Curious));
  assert_eq!(outcome.profile.checkin_count, 1);
  assert_eq!(outcome.profile.businesses, ["CAFE"]);
}

#[tokio::test]
async fn second_checkin_within_the_hour_is_refused() {
  let s = store().await;
  cafe(&s).await;

  s.check_in("anon_7f3a", "CAFE").await.unwrap();
  let result = s.check_in("anon_7f3a", "CAFE").await.unwrap();

  let Checkin::OnCooldown { profile, retry_at } = result else {
    panic!("expected a cooldown refusal");
  };
  // Nothing was mutated: still one visit, one business, same tier.
  assert_eq!(profile.checkin_count, 1);
  assert_eq!(profile.businesses, ["CAFE"]);
  assert_eq!(profile.tier, Some(Tier::Curious));
  assert!(retry_at > chrono::Utc::now());

  let stored = s.get_profile("anon_7f3a").await.unwrap().unwrap();
  assert_eq!(stored.checkin_count, 1);
}

#[tokio::test]
async fn checkin_counts_again_after_the_cooldown() {
  let s = store().await;
  cafe(&s).await;

  s.check_in("anon_7f3a", "CAFE").await.unwrap();
  s.backdate_checkins("anon_7f3a", cooldown() + chrono::Duration::minutes(1))
    .await
    .unwrap();

  let result = s.check_in("anon_7f3a", "CAFE").await.unwrap();
  let Checkin::Recorded(outcome) = result else {
    panic!("expected a recorded check-in");
  };
  // A repeat visit: the count grows, the set and tier do not.
  assert!(!outcome.new_business);
  assert!(!outcome.tier_changed);
  assert_eq!(outcome.profile.checkin_count, 2);
  assert_eq!(outcome.profile.businesses, ["CAFE"]);
}

#[tokio::test]
async fn checkin_refused_at_inactive_or_unknown_business() {
  let s = store().await;
  cafe(&s).await;
  s.set_business_active("CAFE", false).await.unwrap();

  let err = s.check_in("anon_7f3a", "CAFE").await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::BusinessInactive(_))));

  let err = s.check_in("anon_7f3a", "NOWHERE").await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::BusinessNotFound(_))));

  assert!(s.get_profile("anon_7f3a").await.unwrap().is_none());
}

#[tokio::test]
async fn fifth_distinct_business_upgrades_the_tier() {
  let s = store().await;
  for i in 1..=5 {
    s.register_business(&format!("BIZ{i}"), &format!("Business {i}"))
      .await
      .unwrap();
  }

  for i in 1..=4 {
    let result = s.check_in("kid_1", &format!("BIZ{i}")).await.unwrap();
    assert_eq!(result.profile().tier, Some(Tier::Curious));
  }

  let result = s.check_in("kid_1", "BIZ5").await.unwrap();
  let Checkin::Recorded(outcome) = result else {
    panic!("expected a recorded check-in");
  };
  assert!(outcome.tier_changed);
  assert_eq!(outcome.previous_tier, Some(Tier::Curious));
  assert_eq!(outcome.profile.tier, Some(Tier::Hooked));
}

#[tokio::test]
async fn checkin_history_is_append_only_and_carries_the_tier() {
  let s = store().await;
  s.register_business("A", "Alpha").await.unwrap();
  s.register_business("B", "Beta").await.unwrap();

  s.check_in("kid_1", "A").await.unwrap();
  s.check_in("kid_1", "B").await.unwrap();
  // A cooldown refusal must not append an event.
  s.check_in("kid_1", "B").await.unwrap();

  let events = s.list_checkins("kid_1").await.unwrap();
  assert_eq!(events.len(), 2);
  assert!(events.iter().all(|e| e.identity == "kid_1"));
  assert!(events.iter().all(|e| e.tier == Some(Tier::Curious)));
  // newest first
  assert_eq!(events[0].business_code, "B");
  assert_eq!(events[1].business_code, "A");
}

// ─── Identity migration ──────────────────────────────────────────────────────

#[tokio::test]
async fn migrate_moves_an_anonymous_profile() {
  let s = store().await;
  s.register_business("A", "Alpha").await.unwrap();
  s.register_business("B", "Beta").await.unwrap();

  s.check_in("anon_7f3a", "A").await.unwrap();
  s.check_in("anon_7f3a", "B").await.unwrap();

  let merged = s
    .migrate_profile("anon_7f3a", "user_42")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(merged.identity, "user_42");
  assert_eq!(merged.businesses, ["A", "B"]);
  assert_eq!(merged.checkin_count, 2);
  assert_eq!(merged.tier, Some(Tier::Curious));

  // The anonymous identity no longer resolves.
  assert!(s.get_profile("anon_7f3a").await.unwrap().is_none());
  assert!(s.get_profile("user_42").await.unwrap().is_some());
}

#[tokio::test]
async fn migrate_merges_into_an_existing_profile() {
  let s = store().await;
  for code in ["A", "B", "C"] {
    s.register_business(code, code).await.unwrap();
  }

  s.check_in("anon_7f3a", "A").await.unwrap();
  s.check_in("anon_7f3a", "B").await.unwrap();
  s.check_in("user_42", "B").await.unwrap();
  s.check_in("user_42", "C").await.unwrap();

  let merged = s
    .migrate_profile("anon_7f3a", "user_42")
    .await
    .unwrap()
    .unwrap();
  // Union of the sets, sum of the counts, tier from the union size.
  assert_eq!(merged.businesses, ["A", "B", "C"]);
  assert_eq!(merged.checkin_count, 4);
  assert_eq!(merged.tier, Some(Tier::Curious));
  assert!(s.get_profile("anon_7f3a").await.unwrap().is_none());
}

#[tokio::test]
async fn migrate_twice_is_a_noop() {
  let s = store().await;
  cafe(&s).await;
  s.check_in("anon_7f3a", "CAFE").await.unwrap();

  let first = s
    .migrate_profile("anon_7f3a", "user_42")
    .await
    .unwrap()
    .unwrap();
  let second = s
    .migrate_profile("anon_7f3a", "user_42")
    .await
    .unwrap()
    .unwrap();

  assert_eq!(second.businesses, first.businesses);
  assert_eq!(second.checkin_count, first.checkin_count);
  assert_eq!(second.tier, first.tier);
}

#[tokio::test]
async fn migrate_with_no_profiles_is_a_harmless_skip() {
  let s = store().await;
  let result = s.migrate_profile("anon_ghost", "user_42").await.unwrap();
  assert!(result.is_none());
}

// ─── Businesses & transactions ───────────────────────────────────────────────

#[tokio::test]
async fn register_again_updates_the_label_but_keeps_the_balance() {
  let s = store().await;
  let cafe = cafe(&s).await;
  fill_till(&s, cafe, &[("KB-0001", 5)]).await;

  let b = s.register_business(cafe, "Corner Cafe & Roastery").await.unwrap();
  assert_eq!(b.label, "Corner Cafe & Roastery");
  assert_eq!(b.current_balance, Decimal::from(5));
  assert!(b.is_active);
}

#[tokio::test]
async fn set_active_on_unknown_business_errors() {
  let s = store().await;
  let err = s.set_business_active("NOWHERE", false).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::BusinessNotFound(_))));
}

#[tokio::test]
async fn list_transactions_filters_by_business() {
  let s = store().await;
  let cafe = cafe(&s).await;
  s.register_business("BAKERY", "Old Mill Bakery").await.unwrap();
  fill_till(&s, cafe, &[("KB-0001", 5)]).await;
  fill_till(&s, "BAKERY", &[("KB-0002", 5)]).await;
  s.create_redemption("BAKERY", Decimal::from(5)).await.unwrap();

  let all = s.list_transactions(None).await.unwrap();
  assert_eq!(all.len(), 3);

  let bakery = s.list_transactions(Some("BAKERY")).await.unwrap();
  assert_eq!(bakery.len(), 2);
  assert!(bakery.iter().all(|t| t.business_id == "BAKERY"));

  let fetched = s.get_transaction(all[0].transaction_id).await.unwrap();
  assert!(fetched.is_some());
}
