//! Handlers for check-ins, loyalty profiles, and identity migration.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use bucks_core::{
  profile::{Checkin, CheckinEvent, LoyaltyProfile},
  store::LedgerStore,
  tier::{Tier, TierProgress, progress_to_next},
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

// ─── Check in ─────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /checkins`.
#[derive(Debug, Deserialize)]
pub struct CheckinBody {
  pub identity:      String,
  pub business_code: String,
}

/// `POST /checkins` — count a visit, or report the cooldown refusal.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CheckinBody>,
) -> Result<Json<Checkin>, ApiError>
where
  S: LedgerStore,
{
  let result = store
    .check_in(&body.identity, &body.business_code)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(result))
}

// ─── Profile ──────────────────────────────────────────────────────────────────

/// `GET /profiles/:identity`
pub async fn get_profile<S>(
  State(store): State<Arc<S>>,
  Path(identity): Path<String>,
) -> Result<Json<LoyaltyProfile>, ApiError>
where
  S: LedgerStore,
{
  let profile = store
    .get_profile(&identity)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("no profile for {identity}")))?;
  Ok(Json(profile))
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /profiles/:identity/checkins` — the visit history, newest first.
pub async fn history<S>(
  State(store): State<Arc<S>>,
  Path(identity): Path<String>,
) -> Result<Json<Vec<CheckinEvent>>, ApiError>
where
  S: LedgerStore,
{
  let events = store
    .list_checkins(&identity)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(events))
}

// ─── Progress ─────────────────────────────────────────────────────────────────

/// Response for `GET /profiles/:identity/progress`.
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
  pub tier:          Option<Tier>,
  /// Bonus rate at the current tier, in whole percent.
  pub bonus_percent: u8,
  pub progress:      TierProgress,
}

/// `GET /profiles/:identity/progress` — how far to the next tier.
pub async fn progress<S>(
  State(store): State<Arc<S>>,
  Path(identity): Path<String>,
) -> Result<Json<ProgressResponse>, ApiError>
where
  S: LedgerStore,
{
  let profile = store
    .get_profile(&identity)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("no profile for {identity}")))?;

  let count = profile.unique_businesses();
  Ok(Json(ProgressResponse {
    tier:          profile.tier,
    bonus_percent: profile.tier.map_or(0, Tier::bonus_percent),
    progress:      progress_to_next(count),
  }))
}

// ─── Migration ────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /profiles/:identity/migrate`.
#[derive(Debug, Deserialize)]
pub struct MigrateBody {
  pub authenticated_id: String,
}

/// `POST /profiles/:anonymous_id/migrate` — called once at sign-in.
/// Invoking it again is a harmless no-op.
pub async fn migrate<S>(
  State(store): State<Arc<S>>,
  Path(anonymous_id): Path<String>,
  Json(body): Json<MigrateBody>,
) -> Result<Json<LoyaltyProfile>, ApiError>
where
  S: LedgerStore,
{
  let merged = store
    .migrate_profile(&anonymous_id, &body.authenticated_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| {
      ApiError::NotFound(format!(
        "no profile under {anonymous_id} or {}",
        body.authenticated_id
      ))
    })?;
  Ok(Json(merged))
}
