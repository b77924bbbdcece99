//! Core types and trait definitions for the Kinderbucks ledger.
//!
//! This crate holds the domain model — currency notes, business balances,
//! transaction records, loyalty profiles — plus the pure tier calculator and
//! the [`store::LedgerStore`] trait that storage backends implement. It is
//! deliberately free of HTTP and database dependencies; all other crates
//! depend on it.

pub mod business;
pub mod error;
pub mod note;
pub mod profile;
pub mod store;
pub mod tier;
pub mod transaction;

pub use error::{Error, Result};
