//! Handlers for `/notes` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/notes` | optional `?status=` filter |
//! | `GET`  | `/notes/:serial` | Single note |
//! | `POST` | `/notes` | Body: [`CreateBatchBody`]; returns 201 + the batch |
//! | `POST` | `/notes/:serial/issue` | Body: [`IssueBody`] |
//! | `POST` | `/notes/:serial/scan` | Bumps the counter, activates on first scan |
//! | `POST` | `/notes/:serial/retire` | Administrative removal |
//! | `GET`  | `/notes/:serial/eligibility` | Advisory accept-payment check |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use bucks_core::{
  note::{Note, NoteStatus, PaymentEligibility},
  store::LedgerStore,
};
use serde::Deserialize;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<NoteStatus>,
}

/// `GET /notes[?status=active]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Note>>, ApiError>
where
  S: LedgerStore,
{
  let notes = store
    .list_notes(params.status)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(notes))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /notes/:serial`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(serial): Path<String>,
) -> Result<Json<Note>, ApiError>
where
  S: LedgerStore,
{
  let note = store
    .get_note(&serial)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("note {serial} not found")))?;
  Ok(Json(note))
}

// ─── Create batch ─────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /notes`.
#[derive(Debug, Deserialize)]
pub struct CreateBatchBody {
  pub serials:      Vec<String>,
  pub denomination: u32,
}

/// `POST /notes` — returns 201 + the created draft notes.
pub async fn create_batch<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBatchBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LedgerStore,
{
  let notes = store
    .create_batch(body.serials, body.denomination)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok((StatusCode::CREATED, Json(notes)))
}

// ─── Issue ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IssueBody {
  pub destination: Option<String>,
}

/// `POST /notes/:serial/issue`
pub async fn issue<S>(
  State(store): State<Arc<S>>,
  Path(serial): Path<String>,
  Json(body): Json<IssueBody>,
) -> Result<Json<Note>, ApiError>
where
  S: LedgerStore,
{
  let note = store
    .issue_note(&serial, body.destination)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(note))
}

// ─── Scan ─────────────────────────────────────────────────────────────────────

/// `POST /notes/:serial/scan`
pub async fn scan<S>(
  State(store): State<Arc<S>>,
  Path(serial): Path<String>,
) -> Result<Json<Note>, ApiError>
where
  S: LedgerStore,
{
  let note = store
    .record_scan(&serial)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(note))
}

// ─── Retire ───────────────────────────────────────────────────────────────────

/// `POST /notes/:serial/retire`
pub async fn retire<S>(
  State(store): State<Arc<S>>,
  Path(serial): Path<String>,
) -> Result<Json<Note>, ApiError>
where
  S: LedgerStore,
{
  let note = store
    .retire_note(&serial)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(note))
}

// ─── Eligibility ──────────────────────────────────────────────────────────────

/// `GET /notes/:serial/eligibility` — advisory; safe to poll from a till UI.
pub async fn eligibility<S>(
  State(store): State<Arc<S>>,
  Path(serial): Path<String>,
) -> Result<Json<PaymentEligibility>, ApiError>
where
  S: LedgerStore,
{
  let eligibility = store
    .validate_for_payment(&serial)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(eligibility))
}
