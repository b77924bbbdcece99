//! JSON REST API for the Kinderbucks ledger.
//!
//! Exposes an axum [`Router`] backed by any [`bucks_core::store::LedgerStore`].
//! Auth, TLS, page rendering, and QR image generation are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", bucks_api::ledger_router(store.clone()))
//! ```

pub mod businesses;
pub mod checkins;
pub mod error;
pub mod notes;
pub mod payments;
pub mod redemptions;
pub mod tiers;
pub mod transactions;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use bucks_core::store::LedgerStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn ledger_router<S>(store: Arc<S>) -> Router<()>
where
  S: LedgerStore + 'static,
{
  Router::new()
    // Notes
    .route("/notes", get(notes::list::<S>).post(notes::create_batch::<S>))
    .route("/notes/{serial}", get(notes::get_one::<S>))
    .route("/notes/{serial}/issue", post(notes::issue::<S>))
    .route("/notes/{serial}/scan", post(notes::scan::<S>))
    .route("/notes/{serial}/retire", post(notes::retire::<S>))
    .route("/notes/{serial}/eligibility", get(notes::eligibility::<S>))
    // Payments
    .route("/payments", post(payments::create::<S>))
    // Redemptions
    .route("/redemptions", post(redemptions::create::<S>))
    .route("/redemptions/{id}/process", post(redemptions::process::<S>))
    // Check-ins & profiles
    .route("/checkins", post(checkins::create::<S>))
    .route("/profiles/{identity}", get(checkins::get_profile::<S>))
    .route("/profiles/{identity}/checkins", get(checkins::history::<S>))
    .route("/profiles/{identity}/progress", get(checkins::progress::<S>))
    .route("/profiles/{identity}/migrate", post(checkins::migrate::<S>))
    // Businesses
    .route("/businesses", post(businesses::register::<S>))
    .route("/businesses/{id}", get(businesses::get_one::<S>))
    .route("/businesses/{id}/active", post(businesses::set_active::<S>))
    // Transactions
    .route("/transactions", get(transactions::list::<S>))
    .route("/transactions/{id}", get(transactions::get_one::<S>))
    // Loyalty configuration, read-only for rendering layers
    .route("/tiers", get(tiers::table))
    .with_state(store)
}
