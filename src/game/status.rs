//! Attribute derivation from reputation statistics
//!
//! The room backend normally hands out precomputed attributes. This is the
//! same derivation, available to local tooling that only has the raw activity
//! numbers.

use serde::{Deserialize, Serialize};

use crate::game::attributes::PlayerAttributes;

const MIN_STAT: f64 = 1.0;
const MAX_STAT: f64 = 100.0;

/// Activity volume at which power saturates
const POWER_SATURATION: f64 = 20_000.0;
/// Active days at which weight and volume saturate
const COMMIT_DAYS_SATURATION: f64 = 365.0;
/// Pull requests plus issues at which the cooldown bottoms out
const COLLABORATION_SATURATION: f64 = 500.0;

const SLOWEST_COOLDOWN_MS: f64 = 5000.0;
const COOLDOWN_SPAN_MS: f64 = 4000.0;

/// Raw activity numbers for one player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationStats {
    pub contribution_count: u64,
    pub commit_streak: u64,
    pub commit_days: u64,
    pub total_pull_request_contributions: u64,
    pub total_issue_contributions: u64,
}

/// Map `value` onto `[1, 100]`, saturating at `saturation`
pub fn normalize(value: f64, saturation: f64) -> f64 {
    if value <= 0.0 {
        return MIN_STAT;
    }
    let scaled = value / saturation * (MAX_STAT - MIN_STAT) + MIN_STAT;
    scaled.round().clamp(MIN_STAT, MAX_STAT)
}

/// Derive attributes from activity. No stats at all gives all zeros.
pub fn derive_status(stats: Option<&ReputationStats>) -> PlayerAttributes {
    let Some(stats) = stats else {
        return PlayerAttributes::new(0.0, 0.0, 0.0, 0);
    };

    let activity = stats.contribution_count as f64 * stats.commit_streak as f64;
    let power = normalize(activity, POWER_SATURATION);
    let bulk = normalize(stats.commit_days as f64, COMMIT_DAYS_SATURATION);

    let collaboration = (stats.total_pull_request_contributions + stats.total_issue_contributions) as f64;
    let speed = normalize(collaboration, COLLABORATION_SATURATION);
    let cooldown_ms = (SLOWEST_COOLDOWN_MS - (speed - MIN_STAT) / (MAX_STAT - MIN_STAT) * COOLDOWN_SPAN_MS).round();

    PlayerAttributes::new(power as f32, bulk as f32, bulk as f32, cooldown_ms as u32)
}
