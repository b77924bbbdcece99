//! Handlers for `/redemptions` endpoints — converting a till's note value
//! back into cash.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use bucks_core::{store::LedgerStore, transaction::Transaction};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /redemptions`.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub business_id: String,
  pub amount:      Decimal,
}

/// `POST /redemptions` — returns 201 + the pending [`Transaction`].
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LedgerStore,
{
  let transaction = store
    .create_redemption(&body.business_id, body.amount)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok((StatusCode::CREATED, Json(transaction)))
}

// ─── Process ──────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /redemptions/:id/process`.
#[derive(Debug, Deserialize)]
pub struct ProcessBody {
  pub approved: bool,
  /// Who is approving or rejecting; recorded on the transaction.
  pub actor:    String,
}

/// `POST /redemptions/:id/process` — approve or reject a pending request.
pub async fn process<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ProcessBody>,
) -> Result<Json<Transaction>, ApiError>
where
  S: LedgerStore,
{
  let transaction = store
    .process_redemption(id, body.approved, &body.actor)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(transaction))
}
