//! [`SqliteStore`] — the SQLite implementation of [`LedgerStore`].
//!
//! Every multi-entity effect runs inside one [`rusqlite::Transaction`], so
//! the whole effect becomes visible together or not at all. Note transfers
//! are conditional `UPDATE ... WHERE` writes: zero rows changed means the
//! note was not in the expected state and the operation fails with a
//! conflict instead of double-crediting.

use std::{collections::HashSet, path::Path};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, params};
use rust_decimal::Decimal;
use uuid::Uuid;

use bucks_core::{
  Error as CoreError,
  business::Business,
  note::{self, Note, NoteStatus, PaymentEligibility},
  profile::{self, Checkin, CheckinEvent, CheckinOutcome, LoyaltyProfile},
  store::{LedgerStore, RedemptionPolicy},
  tier::Tier,
  transaction::{Transaction, TransactionKind, TransactionStatus},
};

use crate::{
  Error, Result,
  encode::{
    RawBusiness, RawCheckinEvent, RawNote, RawProfile, RawTransaction,
    decode_amount, decode_dt, decode_note_status, denomination_cents,
    encode_amount, encode_dt, encode_string_list, encode_tier, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Kinderbucks ledger backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  policy: RedemptionPolicy,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, policy: RedemptionPolicy::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, policy: RedemptionPolicy::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Replace the redemption policy (defaults to requiring a covering
  /// balance).
  pub fn with_policy(mut self, policy: RedemptionPolicy) -> Self {
    self.policy = policy;
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

const NOTE_COLUMNS: &str = "serial, denomination, status, scan_count, \
   holder_kind, holder_id, created_at, issued_at, issued_to, \
   first_scanned_at, last_transfer_at, redeemed_at, redeemed_in";

fn note_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawNote> {
  Ok(RawNote {
    serial:           row.get(0)?,
    denomination:     row.get(1)?,
    status:           row.get(2)?,
    scan_count:       row.get(3)?,
    holder_kind:      row.get(4)?,
    holder_id:        row.get(5)?,
    created_at:       row.get(6)?,
    issued_at:        row.get(7)?,
    issued_to:        row.get(8)?,
    first_scanned_at: row.get(9)?,
    last_transfer_at: row.get(10)?,
    redeemed_at:      row.get(11)?,
    redeemed_in:      row.get(12)?,
  })
}

fn fetch_note(conn: &rusqlite::Connection, serial: &str) -> Result<Option<RawNote>> {
  Ok(
    conn
      .query_row(
        &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE serial = ?1"),
        params![serial],
        note_from_row,
      )
      .optional()?,
  )
}

const BUSINESS_COLUMNS: &str = "business_id, label, is_active, \
   current_balance, lifetime_accepted, lifetime_redeemed, created_at";

fn business_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawBusiness> {
  Ok(RawBusiness {
    business_id:       row.get(0)?,
    label:             row.get(1)?,
    is_active:         row.get(2)?,
    current_balance:   row.get(3)?,
    lifetime_accepted: row.get(4)?,
    lifetime_redeemed: row.get(5)?,
    created_at:        row.get(6)?,
  })
}

fn fetch_business(conn: &rusqlite::Connection, business_id: &str) -> Result<Option<RawBusiness>> {
  Ok(
    conn
      .query_row(
        &format!("SELECT {BUSINESS_COLUMNS} FROM businesses WHERE business_id = ?1"),
        params![business_id],
        business_from_row,
      )
      .optional()?,
  )
}

const TX_COLUMNS: &str = "transaction_id, kind, amount_cents, note_serial, \
   business_id, business_label, status, consumed_serials, created_at, \
   processed_at, processed_by";

fn tx_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTransaction> {
  Ok(RawTransaction {
    transaction_id:   row.get(0)?,
    kind:             row.get(1)?,
    amount_cents:     row.get(2)?,
    note_serial:      row.get(3)?,
    business_id:      row.get(4)?,
    business_label:   row.get(5)?,
    status:           row.get(6)?,
    consumed_serials: row.get(7)?,
    created_at:       row.get(8)?,
    processed_at:     row.get(9)?,
    processed_by:     row.get(10)?,
  })
}

fn fetch_transaction(conn: &rusqlite::Connection, id: &str) -> Result<Option<RawTransaction>> {
  Ok(
    conn
      .query_row(
        &format!("SELECT {TX_COLUMNS} FROM transactions WHERE transaction_id = ?1"),
        params![id],
        tx_from_row,
      )
      .optional()?,
  )
}

const PROFILE_COLUMNS: &str =
  "identity, businesses, checkin_count, tier, created_at, last_checkin_at";

fn profile_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawProfile> {
  Ok(RawProfile {
    identity:        row.get(0)?,
    businesses:      row.get(1)?,
    checkin_count:   row.get(2)?,
    tier:            row.get(3)?,
    created_at:      row.get(4)?,
    last_checkin_at: row.get(5)?,
  })
}

fn fetch_profile(conn: &rusqlite::Connection, identity: &str) -> Result<Option<RawProfile>> {
  Ok(
    conn
      .query_row(
        &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE identity = ?1"),
        params![identity],
        profile_from_row,
      )
      .optional()?,
  )
}

fn upsert_profile(conn: &rusqlite::Connection, p: &LoyaltyProfile) -> Result<()> {
  conn.execute(
    "INSERT INTO profiles (identity, businesses, checkin_count, tier, created_at, last_checkin_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
     ON CONFLICT(identity) DO UPDATE SET
       businesses      = excluded.businesses,
       checkin_count   = excluded.checkin_count,
       tier            = excluded.tier,
       created_at      = excluded.created_at,
       last_checkin_at = excluded.last_checkin_at",
    params![
      p.identity,
      encode_string_list(&p.businesses)?,
      p.checkin_count,
      encode_tier(p.tier),
      encode_dt(p.created_at),
      p.last_checkin_at.map(encode_dt),
    ],
  )?;
  Ok(())
}

// ─── Transactional bodies ────────────────────────────────────────────────────
//
// These run on the connection thread inside `conn.call`. Each opens one
// SQLite transaction; an early return rolls it back.

fn create_batch_in_tx(
  conn: &mut rusqlite::Connection,
  serials: &[String],
  denomination: u32,
) -> Result<Vec<RawNote>> {
  if denomination == 0 {
    return Err(CoreError::InvalidDenomination.into());
  }

  let tx = conn.transaction()?;
  let now = encode_dt(Utc::now());

  let mut seen = HashSet::new();
  let mut out = Vec::with_capacity(serials.len());
  for serial in serials {
    if !note::is_valid_serial(serial) {
      return Err(CoreError::InvalidSerial(serial.clone()).into());
    }
    if !seen.insert(serial.as_str()) {
      return Err(CoreError::DuplicateSerial(serial.clone()).into());
    }
    let exists: bool = tx
      .query_row("SELECT 1 FROM notes WHERE serial = ?1", params![serial], |_| Ok(true))
      .optional()?
      .unwrap_or(false);
    if exists {
      return Err(CoreError::DuplicateSerial(serial.clone()).into());
    }

    tx.execute(
      "INSERT INTO notes (serial, denomination, status, scan_count, holder_kind, created_at)
       VALUES (?1, ?2, 'draft', 0, 'none', ?3)",
      params![serial, denomination, now],
    )?;
    out.push(RawNote {
      serial:           serial.clone(),
      denomination:     i64::from(denomination),
      status:           "draft".into(),
      scan_count:       0,
      holder_kind:      "none".into(),
      holder_id:        None,
      created_at:       now.clone(),
      issued_at:        None,
      issued_to:        None,
      first_scanned_at: None,
      last_transfer_at: None,
      redeemed_at:      None,
      redeemed_in:      None,
    });
  }

  tx.commit()?;
  Ok(out)
}

fn transition_guard(raw: &RawNote, next: NoteStatus) -> Result<NoteStatus> {
  let current = decode_note_status(&raw.status)?;
  if !current.can_become(next) {
    return Err(
      CoreError::InvalidTransition { serial: raw.serial.clone(), from: current, to: next }.into(),
    );
  }
  Ok(current)
}

fn issue_in_tx(
  conn: &mut rusqlite::Connection,
  serial: &str,
  destination: Option<String>,
) -> Result<RawNote> {
  let tx = conn.transaction()?;
  let raw = fetch_note(&tx, serial)?
    .ok_or_else(|| CoreError::NoteNotFound(serial.to_owned()))?;
  transition_guard(&raw, NoteStatus::Issued)?;

  let now = encode_dt(Utc::now());
  tx.execute(
    "UPDATE notes SET status = 'issued', issued_at = ?2, issued_to = ?3 WHERE serial = ?1",
    params![serial, now, destination],
  )?;

  let updated = fetch_note(&tx, serial)?
    .ok_or_else(|| CoreError::NoteNotFound(serial.to_owned()))?;
  tx.commit()?;
  Ok(updated)
}

fn scan_in_tx(conn: &mut rusqlite::Connection, serial: &str) -> Result<RawNote> {
  let tx = conn.transaction()?;
  let raw = fetch_note(&tx, serial)?
    .ok_or_else(|| CoreError::NoteNotFound(serial.to_owned()))?;
  let current = decode_note_status(&raw.status)?;

  let now = encode_dt(Utc::now());
  if current.can_become(NoteStatus::Active) {
    // First scan of a draft or issued note puts it into circulation.
    tx.execute(
      "UPDATE notes SET status = 'active', scan_count = scan_count + 1, first_scanned_at = ?2
        WHERE serial = ?1",
      params![serial, now],
    )?;
  } else {
    // Later scans only bump the counter, whatever the status.
    tx.execute(
      "UPDATE notes SET scan_count = scan_count + 1 WHERE serial = ?1",
      params![serial],
    )?;
  }

  let updated = fetch_note(&tx, serial)?
    .ok_or_else(|| CoreError::NoteNotFound(serial.to_owned()))?;
  tx.commit()?;
  Ok(updated)
}

fn retire_in_tx(conn: &mut rusqlite::Connection, serial: &str) -> Result<RawNote> {
  let tx = conn.transaction()?;
  let raw = fetch_note(&tx, serial)?
    .ok_or_else(|| CoreError::NoteNotFound(serial.to_owned()))?;
  transition_guard(&raw, NoteStatus::Retired)?;

  tx.execute("UPDATE notes SET status = 'retired' WHERE serial = ?1", params![serial])?;

  let updated = fetch_note(&tx, serial)?
    .ok_or_else(|| CoreError::NoteNotFound(serial.to_owned()))?;
  tx.commit()?;
  Ok(updated)
}

fn payment_in_tx(
  conn: &mut rusqlite::Connection,
  serial: &str,
  business_id: &str,
) -> Result<RawTransaction> {
  let tx = conn.transaction()?;
  let raw = fetch_note(&tx, serial)?
    .ok_or_else(|| CoreError::NoteNotFound(serial.to_owned()))?;
  let business = fetch_business(&tx, business_id)?
    .ok_or_else(|| CoreError::BusinessNotFound(business_id.to_owned()))?;

  let now = encode_dt(Utc::now());

  // Conditional transfer: only an active note not already resting with a
  // business may move. Zero rows changed means a concurrent writer or a
  // stale client got here first.
  let changed = tx.execute(
    "UPDATE notes SET holder_kind = 'business', holder_id = ?2, last_transfer_at = ?3
      WHERE serial = ?1 AND status = 'active' AND holder_kind <> 'business'",
    params![serial, business_id, now],
  )?;
  if changed != 1 {
    return Err(CoreError::Conflict(serial.to_owned()).into());
  }

  let cents = denomination_cents(raw.denomination as u32);
  tx.execute(
    "UPDATE businesses SET current_balance   = current_balance + ?2,
                           lifetime_accepted = lifetime_accepted + ?2
      WHERE business_id = ?1",
    params![business_id, cents],
  )?;

  let record = RawTransaction {
    transaction_id:   encode_uuid(Uuid::new_v4()),
    kind:             TransactionKind::Payment.as_str().into(),
    amount_cents:     cents,
    note_serial:      Some(serial.to_owned()),
    business_id:      business_id.to_owned(),
    business_label:   business.label,
    status:           TransactionStatus::Completed.as_str().into(),
    consumed_serials: "[]".into(),
    created_at:       now,
    processed_at:     None,
    processed_by:     None,
  };
  tx.execute(
    "INSERT INTO transactions (transaction_id, kind, amount_cents, note_serial,
       business_id, business_label, status, consumed_serials, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    params![
      record.transaction_id,
      record.kind,
      record.amount_cents,
      record.note_serial,
      record.business_id,
      record.business_label,
      record.status,
      record.consumed_serials,
      record.created_at,
    ],
  )?;

  tx.commit()?;
  Ok(record)
}

fn create_redemption_in_tx(
  conn: &mut rusqlite::Connection,
  business_id: &str,
  amount_cents: i64,
) -> Result<RawTransaction> {
  let tx = conn.transaction()?;
  let business = fetch_business(&tx, business_id)?
    .ok_or_else(|| CoreError::BusinessNotFound(business_id.to_owned()))?;

  let record = RawTransaction {
    transaction_id:   encode_uuid(Uuid::new_v4()),
    kind:             TransactionKind::Redemption.as_str().into(),
    amount_cents,
    note_serial:      None,
    business_id:      business_id.to_owned(),
    business_label:   business.label,
    status:           TransactionStatus::Pending.as_str().into(),
    consumed_serials: "[]".into(),
    created_at:       encode_dt(Utc::now()),
    processed_at:     None,
    processed_by:     None,
  };
  tx.execute(
    "INSERT INTO transactions (transaction_id, kind, amount_cents,
       business_id, business_label, status, consumed_serials, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      record.transaction_id,
      record.kind,
      record.amount_cents,
      record.business_id,
      record.business_label,
      record.status,
      record.consumed_serials,
      record.created_at,
    ],
  )?;

  tx.commit()?;
  Ok(record)
}

fn process_redemption_in_tx(
  conn: &mut rusqlite::Connection,
  id: Uuid,
  approved: bool,
  actor: &str,
  policy: RedemptionPolicy,
) -> Result<RawTransaction> {
  let id_str = encode_uuid(id);
  let tx = conn.transaction()?;
  let raw = fetch_transaction(&tx, &id_str)?
    .ok_or(CoreError::TransactionNotFound(id))?;

  // The sole guard against double-processing: only a pending redemption
  // may be processed.
  if raw.status != TransactionStatus::Pending.as_str() {
    return Err(CoreError::AlreadyProcessed(id).into());
  }

  let now = encode_dt(Utc::now());

  if !approved {
    tx.execute(
      "UPDATE transactions SET status = 'rejected', processed_at = ?2, processed_by = ?3
        WHERE transaction_id = ?1",
      params![id_str, now, actor],
    )?;
    tx.commit()?;
    return Ok(RawTransaction {
      status:       TransactionStatus::Rejected.as_str().into(),
      processed_at: Some(now),
      processed_by: Some(actor.to_owned()),
      ..raw
    });
  }

  let business = fetch_business(&tx, &raw.business_id)?
    .ok_or_else(|| CoreError::BusinessNotFound(raw.business_id.clone()))?;

  if policy == RedemptionPolicy::RequireCoveringBalance
    && raw.amount_cents > business.current_balance
  {
    return Err(
      CoreError::InsufficientFunds {
        requested: decode_amount(raw.amount_cents),
        available: decode_amount(business.current_balance),
      }
      .into(),
    );
  }

  // Greedy walk over the business's active notes in ascending serial
  // order. Stops as soon as the accumulated face value covers the
  // request — the last note may overshoot ("round up to the next whole
  // note"). Runs under-target without complaint when the till cannot
  // cover the amount.
  let consumed: Vec<String> = {
    let mut stmt = tx.prepare(
      "SELECT serial, denomination FROM notes
        WHERE holder_kind = 'business' AND holder_id = ?1 AND status = 'active'
        ORDER BY serial ASC",
    )?;
    let rows = stmt.query_map(params![raw.business_id], |row| {
      Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut consumed = Vec::new();
    let mut accumulated = 0i64;
    for row in rows {
      if accumulated >= raw.amount_cents {
        break;
      }
      let (serial, denomination) = row?;
      accumulated += denomination * 100;
      consumed.push(serial);
    }
    consumed
  };

  for serial in &consumed {
    tx.execute(
      "UPDATE notes SET status = 'redeemed', redeemed_at = ?2, redeemed_in = ?3
        WHERE serial = ?1",
      params![serial, now, id_str],
    )?;
  }

  // The balance moves by the requested amount, not the consumed notes'
  // sum; overshoot stays with the business. Under AllowUncovered the
  // debit is clamped so the balance cannot cross zero, and
  // lifetime_redeemed moves by the same figure to keep
  // current = accepted - redeemed intact.
  let debit = raw.amount_cents.min(business.current_balance).max(0);
  tx.execute(
    "UPDATE businesses SET current_balance   = current_balance - ?2,
                           lifetime_redeemed = lifetime_redeemed + ?2
      WHERE business_id = ?1",
    params![raw.business_id, debit],
  )?;

  let consumed_json = encode_string_list(&consumed)?;
  tx.execute(
    "UPDATE transactions SET status = 'approved', processed_at = ?2,
       processed_by = ?3, consumed_serials = ?4
      WHERE transaction_id = ?1",
    params![id_str, now, actor, consumed_json],
  )?;

  tx.commit()?;
  Ok(RawTransaction {
    status:           TransactionStatus::Approved.as_str().into(),
    processed_at:     Some(now),
    processed_by:     Some(actor.to_owned()),
    consumed_serials: consumed_json,
    ..raw
  })
}

fn check_in_tx(
  conn: &mut rusqlite::Connection,
  identity: &str,
  code: &str,
) -> Result<Checkin> {
  let tx = conn.transaction()?;

  let business = fetch_business(&tx, code)?
    .ok_or_else(|| CoreError::BusinessNotFound(code.to_owned()))?;
  if !business.is_active {
    return Err(CoreError::BusinessInactive(code.to_owned()).into());
  }

  let now = Utc::now();
  let last_at: Option<String> = tx
    .query_row(
      "SELECT recorded_at FROM checkin_events
        WHERE identity = ?1 AND business_code = ?2
        ORDER BY recorded_at DESC LIMIT 1",
      params![identity, code],
      |row| row.get(0),
    )
    .optional()?;

  if let Some(at_str) = last_at {
    let at = decode_dt(&at_str)?;
    if now - at < profile::cooldown()
      && let Some(raw) = fetch_profile(&tx, identity)?
    {
      // Refused, nothing mutated; the caller still gets the profile.
      return Ok(Checkin::OnCooldown {
        profile:  raw.into_profile()?,
        retry_at: at + profile::cooldown(),
      });
    }
  }

  let (mut businesses, count, created_at, previous_tier) =
    match fetch_profile(&tx, identity)? {
      Some(raw) => {
        let p = raw.into_profile()?;
        (p.businesses, p.checkin_count, p.created_at, p.tier)
      }
      None => (Vec::new(), 0, now, None),
    };

  let new_business = match businesses.binary_search_by(|b| b.as_str().cmp(code)) {
    Ok(_) => false,
    Err(pos) => {
      businesses.insert(pos, code.to_owned());
      true
    }
  };

  let updated = LoyaltyProfile {
    identity:        identity.to_owned(),
    tier:            Tier::for_count(businesses.len() as u32),
    businesses,
    checkin_count:   count + 1,
    created_at,
    last_checkin_at: Some(now),
  };
  upsert_profile(&tx, &updated)?;

  tx.execute(
    "INSERT INTO checkin_events (event_id, identity, business_code, tier, recorded_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      encode_uuid(Uuid::new_v4()),
      identity,
      code,
      encode_tier(updated.tier),
      encode_dt(now),
    ],
  )?;

  tx.commit()?;
  Ok(Checkin::Recorded(CheckinOutcome {
    new_business,
    previous_tier,
    tier_changed: previous_tier != updated.tier,
    profile: updated,
  }))
}

fn migrate_in_tx(
  conn: &mut rusqlite::Connection,
  anonymous_id: &str,
  authenticated_id: &str,
) -> Result<Option<LoyaltyProfile>> {
  let tx = conn.transaction()?;

  let Some(anon_raw) = fetch_profile(&tx, anonymous_id)? else {
    // Already migrated, or the visitor never checked in — harmless skip.
    let existing = fetch_profile(&tx, authenticated_id)?;
    return existing.map(RawProfile::into_profile).transpose();
  };
  let anon = anon_raw.into_profile()?;

  let merged = match fetch_profile(&tx, authenticated_id)? {
    None => LoyaltyProfile {
      identity:        authenticated_id.to_owned(),
      tier:            Tier::for_count(anon.unique_businesses()),
      businesses:      anon.businesses,
      checkin_count:   anon.checkin_count,
      created_at:      anon.created_at,
      last_checkin_at: anon.last_checkin_at,
    },
    Some(auth_raw) => {
      let auth = auth_raw.into_profile()?;
      let mut businesses = auth.businesses;
      for code in anon.businesses {
        if let Err(pos) = businesses.binary_search(&code) {
          businesses.insert(pos, code);
        }
      }
      LoyaltyProfile {
        identity:        authenticated_id.to_owned(),
        tier:            Tier::for_count(businesses.len() as u32),
        businesses,
        checkin_count:   auth.checkin_count + anon.checkin_count,
        created_at:      auth.created_at.min(anon.created_at),
        last_checkin_at: match (auth.last_checkin_at, anon.last_checkin_at) {
          (Some(a), Some(b)) => Some(a.max(b)),
          (a, b) => a.or(b),
        },
      }
    }
  };

  upsert_profile(&tx, &merged)?;
  tx.execute("DELETE FROM profiles WHERE identity = ?1", params![anonymous_id])?;

  tx.commit()?;
  Ok(Some(merged))
}

// ─── LedgerStore impl ────────────────────────────────────────────────────────

impl LedgerStore for SqliteStore {
  type Error = Error;

  // ── Notes ──────────────────────────────────────────────────────────────

  async fn create_batch(&self, serials: Vec<String>, denomination: u32) -> Result<Vec<Note>> {
    let raws = self
      .conn
      .call(move |conn| Ok(create_batch_in_tx(conn, &serials, denomination)))
      .await??;
    raws.into_iter().map(RawNote::into_note).collect()
  }

  async fn issue_note(&self, serial: &str, destination: Option<String>) -> Result<Note> {
    let serial = serial.to_owned();
    self
      .conn
      .call(move |conn| Ok(issue_in_tx(conn, &serial, destination)))
      .await??
      .into_note()
  }

  async fn record_scan(&self, serial: &str) -> Result<Note> {
    let serial = serial.to_owned();
    self
      .conn
      .call(move |conn| Ok(scan_in_tx(conn, &serial)))
      .await??
      .into_note()
  }

  async fn get_note(&self, serial: &str) -> Result<Option<Note>> {
    let serial = serial.to_owned();
    let raw = self
      .conn
      .call(move |conn| Ok(fetch_note(conn, &serial)))
      .await??;
    raw.map(RawNote::into_note).transpose()
  }

  async fn list_notes(&self, status: Option<NoteStatus>) -> Result<Vec<Note>> {
    let status_str = status.map(|s| s.as_str().to_owned());
    let raws: Vec<RawNote> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(s) = status_str {
          let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE status = ?1 ORDER BY serial ASC"
          ))?;
          stmt
            .query_map(params![s], note_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes ORDER BY serial ASC"
          ))?;
          stmt
            .query_map([], note_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawNote::into_note).collect()
  }

  async fn validate_for_payment(&self, serial: &str) -> Result<PaymentEligibility> {
    let note = self.get_note(serial).await?;
    Ok(PaymentEligibility::evaluate(note))
  }

  async fn retire_note(&self, serial: &str) -> Result<Note> {
    let serial = serial.to_owned();
    self
      .conn
      .call(move |conn| Ok(retire_in_tx(conn, &serial)))
      .await??
      .into_note()
  }

  // ── Payments ───────────────────────────────────────────────────────────

  async fn record_payment(&self, serial: &str, business_id: &str) -> Result<Transaction> {
    let serial = serial.to_owned();
    let business_id = business_id.to_owned();
    self
      .conn
      .call(move |conn| Ok(payment_in_tx(conn, &serial, &business_id)))
      .await??
      .into_transaction()
  }

  // ── Redemptions ────────────────────────────────────────────────────────

  async fn create_redemption(&self, business_id: &str, amount: Decimal) -> Result<Transaction> {
    let amount_cents = encode_amount(amount)?;
    let business_id = business_id.to_owned();
    self
      .conn
      .call(move |conn| Ok(create_redemption_in_tx(conn, &business_id, amount_cents)))
      .await??
      .into_transaction()
  }

  async fn process_redemption(
    &self,
    transaction_id: Uuid,
    approved: bool,
    actor: &str,
  ) -> Result<Transaction> {
    let actor = actor.to_owned();
    let policy = self.policy;
    self
      .conn
      .call(move |conn| {
        Ok(process_redemption_in_tx(conn, transaction_id, approved, &actor, policy))
      })
      .await??
      .into_transaction()
  }

  // ── Check-ins & profiles ───────────────────────────────────────────────

  async fn check_in(&self, identity: &str, business_code: &str) -> Result<Checkin> {
    let identity = identity.to_owned();
    let business_code = business_code.to_owned();
    self
      .conn
      .call(move |conn| Ok(check_in_tx(conn, &identity, &business_code)))
      .await?
  }

  async fn get_profile(&self, identity: &str) -> Result<Option<LoyaltyProfile>> {
    let identity = identity.to_owned();
    let raw = self
      .conn
      .call(move |conn| Ok(fetch_profile(conn, &identity)))
      .await??;
    raw.map(RawProfile::into_profile).transpose()
  }

  async fn list_checkins(&self, identity: &str) -> Result<Vec<CheckinEvent>> {
    let identity = identity.to_owned();
    let raws: Vec<RawCheckinEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT event_id, identity, business_code, tier, recorded_at
            FROM checkin_events WHERE identity = ?1
            ORDER BY recorded_at DESC",
        )?;
        let rows = stmt
          .query_map(params![identity], |row| {
            Ok(RawCheckinEvent {
              event_id:      row.get(0)?,
              identity:      row.get(1)?,
              business_code: row.get(2)?,
              tier:          row.get(3)?,
              recorded_at:   row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawCheckinEvent::into_event).collect()
  }

  async fn migrate_profile(
    &self,
    anonymous_id: &str,
    authenticated_id: &str,
  ) -> Result<Option<LoyaltyProfile>> {
    let anonymous_id = anonymous_id.to_owned();
    let authenticated_id = authenticated_id.to_owned();
    self
      .conn
      .call(move |conn| Ok(migrate_in_tx(conn, &anonymous_id, &authenticated_id)))
      .await?
  }

  // ── Businesses ─────────────────────────────────────────────────────────

  async fn register_business(&self, business_id: &str, label: &str) -> Result<Business> {
    let business_id = business_id.to_owned();
    let label = label.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO businesses (business_id, label, is_active, created_at)
           VALUES (?1, ?2, 1, ?3)
           ON CONFLICT(business_id) DO UPDATE SET label = excluded.label",
          params![business_id, label, encode_dt(Utc::now())],
        )?;
        Ok(fetch_business(conn, &business_id))
      })
      .await??;
    raw
      .ok_or_else(|| Error::Column("business row missing after upsert".into()))?
      .into_business()
  }

  async fn get_business(&self, business_id: &str) -> Result<Option<Business>> {
    let business_id = business_id.to_owned();
    let raw = self
      .conn
      .call(move |conn| Ok(fetch_business(conn, &business_id)))
      .await??;
    raw.map(RawBusiness::into_business).transpose()
  }

  async fn set_business_active(&self, business_id: &str, active: bool) -> Result<Business> {
    let business_id = business_id.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE businesses SET is_active = ?2 WHERE business_id = ?1",
          params![business_id, active],
        )?;
        if changed == 0 {
          return Ok(Err(Error::from(CoreError::BusinessNotFound(business_id.clone()))));
        }
        Ok(fetch_business(conn, &business_id))
      })
      .await??;
    raw
      .ok_or_else(|| Error::Column("business row missing after update".into()))?
      .into_business()
  }

  // ── Transactions ───────────────────────────────────────────────────────

  async fn get_transaction(&self, transaction_id: Uuid) -> Result<Option<Transaction>> {
    let id_str = encode_uuid(transaction_id);
    let raw = self
      .conn
      .call(move |conn| Ok(fetch_transaction(conn, &id_str)))
      .await??;
    raw.map(RawTransaction::into_transaction).transpose()
  }

  async fn list_transactions(&self, business_id: Option<&str>) -> Result<Vec<Transaction>> {
    let business_id = business_id.map(str::to_owned);
    let raws: Vec<RawTransaction> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(b) = business_id {
          let mut stmt = conn.prepare(&format!(
            "SELECT {TX_COLUMNS} FROM transactions
              WHERE business_id = ?1 ORDER BY created_at DESC"
          ))?;
          stmt
            .query_map(params![b], tx_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {TX_COLUMNS} FROM transactions ORDER BY created_at DESC"
          ))?;
          stmt
            .query_map([], tx_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawTransaction::into_transaction).collect()
  }
}

// ─── Test support ────────────────────────────────────────────────────────────

#[cfg(test)]
impl SqliteStore {
  /// Shift every check-in event for `identity` back in time, so tests can
  /// cross the cooldown window without sleeping.
  pub(crate) async fn backdate_checkins(
    &self,
    identity: &str,
    by: chrono::Duration,
  ) -> Result<()> {
    let identity = identity.to_owned();
    self
      .conn
      .call(move |conn| {
        let rows: Vec<(String, String)> = {
          let mut stmt = conn
            .prepare("SELECT event_id, recorded_at FROM checkin_events WHERE identity = ?1")?;
          stmt
            .query_map(params![identity], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        for (event_id, at) in rows {
          let Ok(parsed) = decode_dt(&at) else { continue };
          conn.execute(
            "UPDATE checkin_events SET recorded_at = ?2 WHERE event_id = ?1",
            params![event_id, encode_dt(parsed - by)],
          )?;
        }
        Ok(())
      })
      .await?;
    Ok(())
  }
}
