// File: fresq-common/src/models/tier.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A grid-size milestone, activated once enough tickets are paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tier {
    pub tier_id: Uuid,
    pub tier_number: i32,
    pub min_tickets: i64,
    /// `None` means "and beyond".
    pub max_tickets: Option<i64>,
    pub grid_width: i32,
    pub grid_height: i32,
    pub prize_amount_cents: i64,
    pub is_active: bool,
}

impl Tier {
    pub fn covers(&self, paid_tickets: i64) -> bool {
        self.min_tickets <= paid_tickets
            && self.max_tickets.is_none_or(|max| paid_tickets <= max)
    }

    pub fn has_dimensions(&self, width: i32, height: i32) -> bool {
        self.grid_width == width && self.grid_height == height
    }
}

/// Highest active tier whose range contains `paid_tickets`, falling back to
/// tier 0 when no range matches.
pub fn select_tier(tiers: &[Tier], paid_tickets: i64) -> Option<&Tier> {
    tiers
        .iter()
        .filter(|t| t.is_active && t.covers(paid_tickets))
        .max_by_key(|t| t.tier_number)
        .or_else(|| tiers.iter().find(|t| t.tier_number == 0))
}

/// The tier whose grid matches the stored dimensions.
pub fn tier_for_dimensions(tiers: &[Tier], width: i32, height: i32) -> Option<&Tier> {
    tiers.iter().find(|t| t.has_dimensions(width, height))
}

pub fn next_tier(tiers: &[Tier], current: &Tier) -> Option<Tier> {
    tiers
        .iter()
        .find(|t| t.is_active && t.tier_number == current.tier_number + 1)
        .cloned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierProgress {
    pub current_tier: Tier,
    pub next_tier: Option<Tier>,
    pub tickets_sold: i64,
    pub tickets_needed: i64,
    /// Percentage towards the next tier's threshold, two decimals.
    pub progress: f64,
    pub max_tier_reached: bool,
}

impl TierProgress {
    pub fn compute(current_tier: Tier, next_tier: Option<Tier>, tickets_sold: i64) -> Self {
        match next_tier {
            None => Self {
                current_tier,
                next_tier: None,
                tickets_sold,
                tickets_needed: 0,
                progress: 100.0,
                max_tier_reached: true,
            },
            Some(next) => {
                let progress = if next.min_tickets <= 0 {
                    100.0
                } else {
                    let raw = (tickets_sold as f64 / next.min_tickets as f64) * 100.0;
                    (raw.min(100.0) * 100.0).round() / 100.0
                };
                Self {
                    tickets_needed: (next.min_tickets - tickets_sold).max(0),
                    current_tier,
                    next_tier: Some(next),
                    tickets_sold,
                    progress,
                    max_tier_reached: false,
                }
            }
        }
    }
}

/// How the grid grew: old content is re-centred by `offset_x/offset_y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridExpansion {
    pub old_width: i32,
    pub old_height: i32,
    pub new_width: i32,
    pub new_height: i32,
    pub offset_x: i32,
    pub offset_y: i32,
    pub cells_shifted: u64,
}

impl GridExpansion {
    /// Plan the move from `old` to `new`; `cells_shifted` is filled in once
    /// the bulk update has run.
    pub fn plan(old: &Tier, new: &Tier) -> Self {
        Self {
            old_width: old.grid_width,
            old_height: old.grid_height,
            new_width: new.grid_width,
            new_height: new.grid_height,
            offset_x: (new.grid_width - old.grid_width).div_euclid(2),
            offset_y: (new.grid_height - old.grid_height).div_euclid(2),
            cells_shifted: 0,
        }
    }

    pub fn grows(&self) -> bool {
        self.new_width >= self.old_width
            && self.new_height >= self.old_height
            && (self.new_width, self.new_height) != (self.old_width, self.old_height)
    }
}

/// Result of an upgrade evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TierUpgrade {
    /// Nothing to do: the grid already matches the reachable tier.
    Unchanged { current_tier: Tier },
    Upgraded {
        old_tier: Tier,
        new_tier: Tier,
        expansion: GridExpansion,
    },
}

impl TierUpgrade {
    pub fn is_upgraded(&self) -> bool {
        matches!(self, TierUpgrade::Upgraded { .. })
    }
}
