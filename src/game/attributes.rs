//! Attribute model
//!
//! Maps a player's reputation-derived stats onto the physical parameters
//! handed to the physics engine. Pure and side-effect free.

use serde::{Deserialize, Serialize};

use crate::game::constants::attributes::*;
use crate::game::constants::defaults;

/// Player stats on the 0..=100 scale plus the launch cooldown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerAttributes {
    pub power: f32,
    pub weight: f32,
    pub volume: f32,
    pub cooldown_ms: u32,
}

impl Default for PlayerAttributes {
    fn default() -> Self {
        Self {
            power: defaults::POWER,
            weight: defaults::WEIGHT,
            volume: defaults::VOLUME,
            cooldown_ms: defaults::COOLDOWN_MS,
        }
    }
}

impl PlayerAttributes {
    pub fn new(power: f32, weight: f32, volume: f32, cooldown_ms: u32) -> Self {
        Self {
            power,
            weight,
            volume,
            cooldown_ms,
        }
    }

    /// Same attributes with every stat clamped onto the 0..=100 scale
    pub fn clamped(&self) -> Self {
        Self {
            power: clamp_stat(self.power),
            weight: clamp_stat(self.weight),
            volume: clamp_stat(self.volume),
            cooldown_ms: self.cooldown_ms,
        }
    }
}

/// Physical parameters fed into the engine body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalParams {
    pub mass: f32,
    pub friction_factor: f32,
    pub drag: f32,
    pub bounce: f32,
    pub radius: f32,
}

/// Clamp a stat onto the 0..=100 scale. Non-finite input collapses to zero.
#[inline]
pub fn clamp_stat(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, MAX_STAT)
    } else {
        0.0
    }
}

/// Derive physical parameters from attributes
///
/// - heavier players are more massive, less bouncy and slide further
/// - larger players are bigger and grip the field more
pub fn derive(attributes: &PlayerAttributes) -> PhysicalParams {
    let a = attributes.clamped();
    let weight = a.weight / MAX_STAT;
    let volume = a.volume / MAX_STAT;

    let friction_factor = (1.0 - weight) * FRICTION_WEIGHT_SHARE + volume * FRICTION_VOLUME_SHARE;

    PhysicalParams {
        mass: BASE_MASS + weight * MASS_RANGE,
        friction_factor,
        drag: BASE_DRAG + friction_factor * DRAG_RANGE,
        bounce: BASE_BOUNCE - weight * BOUNCE_RANGE,
        radius: BASE_RADIUS + volume * RADIUS_RANGE,
    }
}
