//! Field boundary system
//!
//! The field is an axis-aligned rectangle. A player stays in the match while
//! any part of its circle overlaps the field; leaving it completely is the
//! only way to be eliminated.

use hashbrown::HashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::constants::field::{HEIGHT, SPAWN_MARGIN, WIDTH};
use crate::game::entity::PlayerEntity;
use crate::game::state::{GameStateStore, MatchStatus, PlayerId};
use crate::game::systems::physics::PhysicsEngine;
use crate::util::vec2::Vec2;

/// Playable rectangle in world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub origin: Vec2,
    pub width: f32,
    pub height: f32,
}

impl Default for Field {
    fn default() -> Self {
        Self::new(WIDTH, HEIGHT)
    }
}

impl Field {
    /// Field anchored at the world origin
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            origin: Vec2::ZERO,
            width,
            height,
        }
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.origin.x + self.width, self.origin.y + self.height)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.origin.x + self.width / 2.0, self.origin.y + self.height / 2.0)
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        let max = self.max();
        point.x >= self.origin.x && point.x <= max.x && point.y >= self.origin.y && point.y <= max.y
    }

    /// True if any part of the circle lies inside the rectangle
    /// Touching the edge counts as overlapping.
    pub fn overlaps_circle(&self, center: Vec2, radius: f32) -> bool {
        let max = self.max();
        let closest = Vec2::new(center.x.clamp(self.origin.x, max.x), center.y.clamp(self.origin.y, max.y));
        center.distance_sq_to(closest) <= radius * radius
    }

    /// Random spawn point kept [`SPAWN_MARGIN`] away from every edge
    pub fn random_spawn_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        let span_x = (self.width - 2.0 * SPAWN_MARGIN).max(0.0);
        let span_y = (self.height - 2.0 * SPAWN_MARGIN).max(0.0);
        Vec2::new(
            self.origin.x + SPAWN_MARGIN + rng.gen::<f32>() * span_x,
            self.origin.y + SPAWN_MARGIN + rng.gen::<f32>() * span_y,
        )
    }
}

/// Eliminate every alive player whose circle has left the field
///
/// Only runs while the match is playing. Returns the ids eliminated on this call.
pub fn check_player_boundaries(
    players: &mut HashMap<PlayerId, PlayerEntity>,
    engine: &mut dyn PhysicsEngine,
    store: &mut GameStateStore,
    field: &Field,
) -> Vec<PlayerId> {
    let mut eliminated = Vec::new();

    if store.status() != MatchStatus::Playing {
        return eliminated;
    }

    for player in players.values_mut() {
        if !player.is_alive() || player.is_within_field(engine, field) {
            continue;
        }
        if player.die(engine, store) {
            eliminated.push(player.id().to_string());
        }
    }

    eliminated
}
