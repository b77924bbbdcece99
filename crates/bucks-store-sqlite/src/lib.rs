//! SQLite backend for the Kinderbucks ledger.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Every multi-entity ledger
//! effect (payment, redemption approval, check-in mutation) runs inside a
//! single SQLite transaction — the atomic multi-write the core invariants
//! assume — and note transfers are conditional writes so concurrent accepts
//! of the same note cannot both succeed.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
