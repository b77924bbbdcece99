//! Read-only handlers for `/transactions` endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use bucks_core::{store::LedgerStore, transaction::Transaction};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub business_id: Option<String>,
}

/// `GET /transactions[?business_id=...]` — newest first.
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Transaction>>, ApiError>
where
  S: LedgerStore,
{
  let transactions = store
    .list_transactions(params.business_id.as_deref())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(transactions))
}

/// `GET /transactions/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, ApiError>
where
  S: LedgerStore,
{
  let transaction = store
    .get_transaction(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("transaction {id} not found")))?;
  Ok(Json(transaction))
}
