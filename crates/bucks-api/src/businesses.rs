//! Handlers for `/businesses` endpoints.
//!
//! The directory proper (names, categories, map pins) lives elsewhere;
//! these endpoints cover the slice the ledger owns — registration as the
//! seam for the external directory, the balance aggregate, and the active
//! flag that gates check-ins.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use bucks_core::{business::Business, store::LedgerStore};
use serde::Deserialize;

use crate::error::ApiError;

/// JSON body accepted by `POST /businesses`.
#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub business_id: String,
  pub label:       String,
}

/// `POST /businesses` — create or relabel a business entry.
pub async fn register<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LedgerStore,
{
  let business = store
    .register_business(&body.business_id, &body.label)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok((StatusCode::CREATED, Json(business)))
}

/// `GET /businesses/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<Business>, ApiError>
where
  S: LedgerStore,
{
  let business = store
    .get_business(&id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("business {id} not found")))?;
  Ok(Json(business))
}

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
  pub active: bool,
}

/// `POST /businesses/:id/active` — flip the flag that gates check-ins.
pub async fn set_active<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
  Json(body): Json<ActiveBody>,
) -> Result<Json<Business>, ApiError>
where
  S: LedgerStore,
{
  let business = store
    .set_business_active(&id, body.active)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(business))
}
