//! Collision impact resolution
//!
//! The engine reports overlapping body pairs in a stable order. For each pair
//! the first body is the attacker and only its power and weight drive the
//! impact; the second body is the target. The reverse direction is never
//! computed, so a collision between two moving players is not symmetric.

use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::game::entity::PlayerEntity;
use crate::game::state::PlayerId;
use crate::game::systems::physics::{BodyHandle, PhysicsEngine};

/// One resolved impact
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent {
    pub attacker: PlayerId,
    pub target: PlayerId,
    pub impact: f32,
}

/// Resolve every overlapping pair from one engine step
///
/// `bodies` maps engine handles back to player ids. Pairs touching an unknown
/// handle are skipped.
pub fn resolve(
    pairs: &[(BodyHandle, BodyHandle)],
    bodies: &HashMap<BodyHandle, PlayerId>,
    players: &HashMap<PlayerId, PlayerEntity>,
    engine: &mut dyn PhysicsEngine,
) -> SmallVec<[CollisionEvent; 4]> {
    let mut events = SmallVec::new();

    for (first, second) in pairs {
        let (Some(attacker_id), Some(target_id)) = (bodies.get(first), bodies.get(second)) else {
            continue;
        };
        let (Some(attacker), Some(target)) = (players.get(attacker_id), players.get(target_id)) else {
            continue;
        };

        let impact = attacker.apply_collision_impact_to(target, engine);
        if impact > 0.0 {
            debug!(attacker = %attacker_id, target = %target_id, impact, "Collision impact");
        }

        events.push(CollisionEvent {
            attacker: attacker_id.clone(),
            target: target_id.clone(),
            impact,
        });
    }

    events
}
