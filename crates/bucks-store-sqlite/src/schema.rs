//! SQL schema for the Kinderbucks SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `user_version` pragma.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Money columns hold integer cents so balance updates can be expressed as
/// in-place SQL arithmetic inside the owning transaction.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Notes are never deleted; the status column carries the lifecycle.
CREATE TABLE IF NOT EXISTS notes (
    serial           TEXT PRIMARY KEY,   -- 'KB-' + 4 zero-padded digits
    denomination     INTEGER NOT NULL CHECK (denomination > 0),
    status           TEXT NOT NULL DEFAULT 'draft',
    scan_count       INTEGER NOT NULL DEFAULT 0,
    holder_kind      TEXT NOT NULL DEFAULT 'none',   -- 'none' | 'business'
    holder_id        TEXT,
    created_at       TEXT NOT NULL,
    issued_at        TEXT,
    issued_to        TEXT,
    first_scanned_at TEXT,
    last_transfer_at TEXT,
    redeemed_at      TEXT,
    redeemed_in      TEXT                -- transaction_id of the redemption
);

-- Directory metadata is externally owned; the ledger owns the three
-- balance columns. current_balance = lifetime_accepted - lifetime_redeemed
-- is maintained by paired increments inside one transaction.
CREATE TABLE IF NOT EXISTS businesses (
    business_id       TEXT PRIMARY KEY,
    label             TEXT NOT NULL,
    is_active         INTEGER NOT NULL DEFAULT 1,
    current_balance   INTEGER NOT NULL DEFAULT 0 CHECK (current_balance >= 0),
    lifetime_accepted INTEGER NOT NULL DEFAULT 0,
    lifetime_redeemed INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS transactions (
    transaction_id   TEXT PRIMARY KEY,
    kind             TEXT NOT NULL,      -- 'payment' | 'redemption'
    amount_cents     INTEGER NOT NULL,
    note_serial      TEXT REFERENCES notes(serial),
    business_id      TEXT NOT NULL REFERENCES businesses(business_id),
    business_label   TEXT NOT NULL,
    status           TEXT NOT NULL,
    consumed_serials TEXT NOT NULL DEFAULT '[]',   -- JSON array of serials
    created_at       TEXT NOT NULL,
    processed_at     TEXT,
    processed_by     TEXT
);

CREATE TABLE IF NOT EXISTS profiles (
    identity        TEXT PRIMARY KEY,
    businesses      TEXT NOT NULL DEFAULT '[]',    -- JSON array, sorted
    checkin_count   INTEGER NOT NULL DEFAULT 0,
    tier            TEXT,
    created_at      TEXT NOT NULL,
    last_checkin_at TEXT
);

-- Check-in events are strictly append-only.
CREATE TABLE IF NOT EXISTS checkin_events (
    event_id      TEXT PRIMARY KEY,
    identity      TEXT NOT NULL,
    business_code TEXT NOT NULL,
    tier          TEXT,
    recorded_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS notes_status_idx ON notes(status);
CREATE INDEX IF NOT EXISTS notes_holder_idx ON notes(holder_id, status);
CREATE INDEX IF NOT EXISTS tx_business_idx  ON transactions(business_id);
CREATE INDEX IF NOT EXISTS events_pair_idx  ON checkin_events(identity, business_code, recorded_at);

PRAGMA user_version = 1;
";
