//! `GET /tiers` — the fixed tier table, exposed read-only so rendering
//! layers can show thresholds and bonus rates without hard-coding them.

use axum::Json;
use bucks_core::tier::Tier;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TierRow {
  pub tier:           Tier,
  pub min_businesses: u32,
  pub bonus_percent:  u8,
}

pub async fn table() -> Json<Vec<TierRow>> {
  Json(
    Tier::ALL
      .into_iter()
      .map(|tier| TierRow {
        tier,
        min_businesses: tier.min_businesses(),
        bonus_percent: tier.bonus_percent(),
      })
      .collect(),
  )
}
