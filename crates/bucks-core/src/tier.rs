//! The loyalty tier table — a pure function from distinct businesses visited
//! to a tier and bonus rate. No I/O; storage backends cache the result on
//! the profile but always recompute it here on mutation.

use serde::{Deserialize, Serialize};

/// Loyalty tiers in ascending order. `Ord` follows that order.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
  Curious,
  Hooked,
  LineAndSinker,
  Patron,
}

impl Tier {
  /// All tiers, lowest first.
  pub const ALL: [Tier; 4] = [Tier::Curious, Tier::Hooked, Tier::LineAndSinker, Tier::Patron];

  /// The tier earned by visiting `count` distinct businesses.
  /// Total over all counts; zero visits earns no tier.
  pub fn for_count(count: u32) -> Option<Tier> {
    match count {
      0 => None,
      1..=4 => Some(Tier::Curious),
      5..=9 => Some(Tier::Hooked),
      10..=14 => Some(Tier::LineAndSinker),
      _ => Some(Tier::Patron),
    }
  }

  /// Distinct businesses required to reach this tier.
  pub fn min_businesses(self) -> u32 {
    match self {
      Self::Curious => 1,
      Self::Hooked => 5,
      Self::LineAndSinker => 10,
      Self::Patron => 15,
    }
  }

  /// Bonus rate in whole percent.
  pub fn bonus_percent(self) -> u8 {
    match self {
      Self::Curious => 10,
      Self::Hooked => 15,
      Self::LineAndSinker => 20,
      Self::Patron => 25,
    }
  }

  /// The next tier up, if any.
  pub fn next(self) -> Option<Tier> {
    match self {
      Self::Curious => Some(Self::Hooked),
      Self::Hooked => Some(Self::LineAndSinker),
      Self::LineAndSinker => Some(Self::Patron),
      Self::Patron => None,
    }
  }

  /// The discriminant string stored in the `tier` column.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Curious => "curious",
      Self::Hooked => "hooked",
      Self::LineAndSinker => "line_and_sinker",
      Self::Patron => "patron",
    }
  }
}

// ─── Progress ────────────────────────────────────────────────────────────────

/// Progress from the current tier toward the next threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierProgress {
  /// 0–100, linear between the surrounding thresholds.
  pub percent:   u8,
  /// Distinct businesses still needed; zero at the top tier.
  pub remaining: u32,
  /// `None` once `Patron` is reached.
  pub next:      Option<Tier>,
}

/// Linear interpolation between the current and next tier thresholds.
pub fn progress_to_next(count: u32) -> TierProgress {
  let current = Tier::for_count(count);
  let next = match current {
    None => Some(Tier::Curious),
    Some(t) => t.next(),
  };

  let Some(next_tier) = next else {
    return TierProgress { percent: 100, remaining: 0, next: None };
  };

  let floor = current.map_or(0, Tier::min_businesses);
  let ceiling = next_tier.min_businesses();
  let percent = ((count - floor) * 100 / (ceiling - floor)) as u8;

  TierProgress {
    percent,
    remaining: ceiling - count,
    next: Some(next_tier),
  }
}
