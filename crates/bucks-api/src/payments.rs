//! Handler for `POST /payments` — a business accepting a note.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use bucks_core::store::LedgerStore;
use serde::Deserialize;

use crate::error::ApiError;

/// JSON body accepted by `POST /payments`.
#[derive(Debug, Deserialize)]
pub struct PaymentBody {
  pub serial:      String,
  pub business_id: String,
}

/// `POST /payments` — returns 201 + the completed payment transaction.
///
/// Clients should call the eligibility endpoint first; this path only
/// performs the conditional transfer and fails on a lost race.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<PaymentBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LedgerStore,
{
  let transaction = store
    .record_payment(&body.serial, &body.business_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok((StatusCode::CREATED, Json(transaction)))
}
