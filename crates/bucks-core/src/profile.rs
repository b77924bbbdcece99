//! Loyalty profiles and check-in events.
//!
//! One profile exists per identity — an anonymous visitor id
//! (`anon_<random>`) or an authenticated user id. The identity provider owns
//! the strings; the ledger treats them as opaque keys. Check-in events are
//! append-only and are consulted only to enforce the cooldown window.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tier::Tier;

/// Minimum time between two counted check-ins at the same business by the
/// same identity, in milliseconds. Fixed; not runtime-configurable.
pub const COOLDOWN_MS: i64 = 3_600_000;

/// The cooldown window as a [`chrono::Duration`].
pub fn cooldown() -> Duration {
  Duration::milliseconds(COOLDOWN_MS)
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// The loyalty state for one identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyProfile {
  pub identity:        String,
  /// Distinct business codes visited, kept sorted. Repeat visits do not
  /// grow this set.
  pub businesses:      Vec<String>,
  /// Total check-ins, repeat visits included.
  pub checkin_count:   u32,
  /// Cached tier; always recomputed from the visited-set size on mutation,
  /// never hand-edited.
  pub tier:            Option<Tier>,
  pub created_at:      DateTime<Utc>,
  pub last_checkin_at: Option<DateTime<Utc>>,
}

impl LoyaltyProfile {
  pub fn unique_businesses(&self) -> u32 {
    self.businesses.len() as u32
  }
}

// ─── Check-in event ──────────────────────────────────────────────────────────

/// Append-only record of a counted visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinEvent {
  pub event_id:      Uuid,
  pub identity:      String,
  pub business_code: String,
  /// The profile's tier after this check-in was applied.
  pub tier:          Option<Tier>,
  pub recorded_at:   DateTime<Utc>,
}

// ─── Check-in result ─────────────────────────────────────────────────────────

/// What a counted check-in changed, for UI celebration logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinOutcome {
  pub profile:       LoyaltyProfile,
  /// Whether this business was new to the profile's visited set.
  pub new_business:  bool,
  pub previous_tier: Option<Tier>,
  pub tier_changed:  bool,
}

/// Result of a check-in attempt. A cooldown refusal still reports the
/// current profile state so the UI can render it; nothing is mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Checkin {
  Recorded(CheckinOutcome),
  OnCooldown {
    profile:  LoyaltyProfile,
    /// When the identity+business pair comes off cooldown.
    retry_at: DateTime<Utc>,
  },
}

impl Checkin {
  pub fn was_recorded(&self) -> bool {
    matches!(self, Self::Recorded(_))
  }

  /// The profile as it stands after the attempt, recorded or not.
  pub fn profile(&self) -> &LoyaltyProfile {
    match self {
      Self::Recorded(outcome) => &outcome.profile,
      Self::OnCooldown { profile, .. } => profile,
    }
  }
}
