//! Player entity
//!
//! Gameplay state for one player layered over an engine body. The entity
//! never owns its body: it holds a [`BodyHandle`] and routes every physical
//! change through the injected [`PhysicsEngine`]. Store mutations go through
//! the [`GameStateStore`] passed into each operation.
//!
//! Per-entity state machine:
//!
//! ```text
//! Idle -> Dragging -> Cooldown -> Idle    (while alive)
//! any alive state -> Eliminated           (terminal)
//! ```

use tracing::{debug, info};

use crate::game::attributes::{derive, PhysicalParams, PlayerAttributes};
use crate::game::constants::collision::{EQUAL_MASS_EFFECT, IMPACT_DAMPING, RECOIL_RATIO};
use crate::game::constants::launch::{MAX_DRAG_DISTANCE, POWER_REFERENCE};
use crate::game::constants::attributes::MAX_STAT;
use crate::game::state::{GameStateStore, PlayerId, PlayerSnapshot, PlayerUpdate};
use crate::game::systems::arena::Field;
use crate::game::systems::physics::{BodyHandle, PhysicsEngine};
use crate::net::protocol::ActionPayload;
use crate::net::sync::LaunchSink;
use crate::util::vec2::Vec2;

/// Observable state of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Idle,
    Dragging,
    Cooldown,
    Eliminated,
}

/// Impulse produced by a completed drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Launch {
    /// Direction in radians, pointing from the release point back through the origin
    pub angle: f32,
    pub strength: f32,
}

/// Compute the launch for a drag from `origin` to `end`
///
/// Strength grows with drag distance up to [`MAX_DRAG_DISTANCE`] and scales
/// linearly with power, equalling the distance at [`POWER_REFERENCE`].
pub fn compute_launch(origin: Vec2, end: Vec2, power: f32) -> Launch {
    let drag = origin - end;
    let distance = drag.length().min(MAX_DRAG_DISTANCE);
    Launch {
        angle: drag.angle(),
        strength: distance * (power / POWER_REFERENCE),
    }
}

/// Magnitude of velocity transferred from an attacker to a target
///
/// `KE * massEffect * (1 - targetWeight/100) * damping`, with `KE = speed² * power/100`.
pub fn impact_force(speed: f32, attacker: &PlayerAttributes, target: &PlayerAttributes) -> f32 {
    let kinetic_energy = speed * speed * (attacker.power / MAX_STAT);
    let total_weight = attacker.weight + target.weight;
    let mass_effect = if total_weight > 0.0 {
        attacker.weight / total_weight
    } else {
        EQUAL_MASS_EFFECT
    };
    (kinetic_energy * mass_effect * (1.0 - target.weight / MAX_STAT) * IMPACT_DAMPING).max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CooldownTimer {
    duration_ms: f32,
    remaining_ms: f32,
}

/// One player's physical and gameplay state
#[derive(Debug, Clone)]
pub struct PlayerEntity {
    id: PlayerId,
    icon: String,
    attributes: PlayerAttributes,
    params: PhysicalParams,
    body: BodyHandle,
    position: Vec2,
    velocity: Vec2,
    is_alive: bool,
    is_main_player: bool,
    drag_origin: Option<Vec2>,
    cooldown: Option<CooldownTimer>,
}

impl PlayerEntity {
    /// Create the entity and its engine body at `position`
    pub fn spawn(
        id: impl Into<PlayerId>,
        icon: impl Into<String>,
        attributes: PlayerAttributes,
        position: Vec2,
        is_main_player: bool,
        engine: &mut dyn PhysicsEngine,
    ) -> Self {
        let attributes = attributes.clamped();
        let params = derive(&attributes);
        let body = engine.spawn_body(position, &params);
        Self {
            id: id.into(),
            icon: icon.into(),
            attributes,
            params,
            body,
            position,
            velocity: Vec2::ZERO,
            is_alive: true,
            is_main_player,
            drag_origin: None,
            cooldown: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn attributes(&self) -> &PlayerAttributes {
        &self.attributes
    }

    pub fn params(&self) -> &PhysicalParams {
        &self.params
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Last position mirrored from the engine
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Last velocity mirrored from the engine
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn is_alive(&self) -> bool {
        self.is_alive
    }

    pub fn is_cooldown(&self) -> bool {
        self.cooldown.is_some()
    }

    pub fn is_main_player(&self) -> bool {
        self.is_main_player
    }

    pub fn drag_origin(&self) -> Option<Vec2> {
        self.drag_origin
    }

    pub fn state(&self) -> EntityState {
        if !self.is_alive {
            EntityState::Eliminated
        } else if self.cooldown.is_some() {
            EntityState::Cooldown
        } else if self.drag_origin.is_some() {
            EntityState::Dragging
        } else {
            EntityState::Idle
        }
    }

    /// Store record describing this entity
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id.clone(),
            icon: self.icon.clone(),
            attributes: self.attributes,
            position: self.position,
            velocity: self.velocity,
            is_alive: self.is_alive,
            is_active: self.is_alive && !self.is_cooldown(),
        }
    }

    // ------------------------------------------------------------------
    // Drag gesture
    // ------------------------------------------------------------------

    /// Pin the drag origin. Ignored while cooling down or eliminated.
    pub fn start_drag(&mut self, point: Vec2) -> bool {
        if self.is_cooldown() || !self.is_alive {
            return false;
        }
        self.drag_origin = Some(point);
        true
    }

    /// Release the drag at `point` and launch
    ///
    /// Returns false without side effects when there is no origin, the entity
    /// is cooling down, or it has been eliminated.
    pub fn complete_drag(
        &mut self,
        point: Vec2,
        engine: &mut dyn PhysicsEngine,
        store: &mut GameStateStore,
        sink: &dyn LaunchSink,
    ) -> bool {
        let origin = match self.drag_origin {
            Some(origin) if self.is_alive && !self.is_cooldown() => origin,
            _ => return false,
        };

        let launch = compute_launch(origin, point, self.attributes.power);

        if let Some(body) = engine.body_mut(self.body) {
            // Attributes may have changed between rounds
            body.apply_params(&self.params);
            body.set_velocity(Vec2::from_angle(launch.angle) * launch.strength);
            self.velocity = body.velocity();
        }

        sink.send_launch(ActionPayload::launch(self.id.clone(), launch.angle, launch.strength));
        debug!(
            player_id = %self.id,
            angle = launch.angle,
            strength = launch.strength,
            "Launch"
        );

        self.start_cooldown(store);
        self.drag_origin = None;
        true
    }

    pub fn cancel_drag(&mut self) {
        self.drag_origin = None;
    }

    // ------------------------------------------------------------------
    // Physics
    // ------------------------------------------------------------------

    /// Transfer momentum from this entity onto `target`
    ///
    /// The target gains `impact` along the unit vector from this entity to the
    /// target and this entity recoils by `RECOIL_RATIO * impact` the other way.
    /// Returns the impact force, or 0 when either side is missing a body or
    /// has been eliminated.
    pub fn apply_collision_impact_to(&self, target: &PlayerEntity, engine: &mut dyn PhysicsEngine) -> f32 {
        if !self.is_alive || !target.is_alive {
            return 0.0;
        }

        let (attacker_pos, attacker_vel) = match engine.body(self.body) {
            Some(body) => (body.position(), body.velocity()),
            None => return 0.0,
        };
        let (target_pos, target_vel) = match engine.body(target.body) {
            Some(body) => (body.position(), body.velocity()),
            None => return 0.0,
        };

        let impact = impact_force(attacker_vel.length(), &self.attributes, &target.attributes);
        let direction = (target_pos - attacker_pos).normalize();

        if let Some(body) = engine.body_mut(target.body) {
            body.set_velocity(target_vel + direction * impact);
        }
        if let Some(body) = engine.body_mut(self.body) {
            body.set_velocity(attacker_vel - direction * (impact * RECOIL_RATIO));
        }

        impact
    }

    /// Set velocity directly from a replicated launch
    ///
    /// Skips the cooldown check since the sender owns its own cooldown.
    pub fn set_velocity_with_angle(&mut self, angle: f32, power: f32, engine: &mut dyn PhysicsEngine) -> bool {
        if !self.is_alive || !angle.is_finite() || !power.is_finite() {
            return false;
        }
        match engine.body_mut(self.body) {
            Some(body) => {
                body.set_velocity(Vec2::from_angle(angle) * power);
                self.velocity = body.velocity();
                true
            }
            None => false,
        }
    }

    /// True while any part of the body's circle overlaps the field
    pub fn is_within_field(&self, engine: &dyn PhysicsEngine, field: &Field) -> bool {
        match engine.body(self.body) {
            Some(body) => field.overlaps_circle(body.position(), body.radius()),
            None => false,
        }
    }

    /// Mirror engine position and velocity onto the entity and into the store
    pub fn sync_from_engine(&mut self, engine: &dyn PhysicsEngine, store: &mut GameStateStore) {
        if let Some(body) = engine.body(self.body) {
            self.position = body.position();
            self.velocity = body.velocity();
        }
        store.update_player(&self.id, PlayerUpdate::motion(self.position, self.velocity));
    }

    /// Replace attributes between rounds and reconfigure the body
    pub fn update_attributes(
        &mut self,
        attributes: PlayerAttributes,
        engine: &mut dyn PhysicsEngine,
        store: &mut GameStateStore,
    ) {
        self.attributes = attributes.clamped();
        self.params = derive(&self.attributes);
        if let Some(body) = engine.body_mut(self.body) {
            body.apply_params(&self.params);
        }
        store.update_player(&self.id, PlayerUpdate::attributes(self.attributes));
    }

    // ------------------------------------------------------------------
    // Cooldown
    // ------------------------------------------------------------------

    /// Start (or restart) the cooldown timer
    pub fn start_cooldown(&mut self, store: &mut GameStateStore) {
        if !self.is_alive {
            return;
        }
        let duration_ms = self.attributes.cooldown_ms as f32;
        self.cooldown = Some(CooldownTimer {
            duration_ms,
            remaining_ms: duration_ms,
        });
        store.update_player(&self.id, PlayerUpdate::active(false));
    }

    /// Count the cooldown down by `dt_ms`. Returns true when it expired on this call.
    pub fn advance_cooldown(&mut self, dt_ms: f32, store: &mut GameStateStore) -> bool {
        let Some(timer) = self.cooldown.as_mut() else {
            return false;
        };
        if !self.is_alive {
            self.cooldown = None;
            return false;
        }

        timer.remaining_ms -= dt_ms;
        if timer.remaining_ms > 0.0 {
            return false;
        }

        self.cooldown = None;
        store.update_player(&self.id, PlayerUpdate::active(true));
        true
    }

    /// Remaining share of the cooldown, 1.0 right after launch down to 0.0
    pub fn cooldown_progress(&self) -> f32 {
        match self.cooldown {
            Some(timer) if timer.duration_ms > 0.0 => (timer.remaining_ms / timer.duration_ms).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    // ------------------------------------------------------------------
    // Elimination
    // ------------------------------------------------------------------

    /// Eliminate the player. Returns false if it was already eliminated.
    pub fn die(&mut self, engine: &mut dyn PhysicsEngine, store: &mut GameStateStore) -> bool {
        if !self.is_alive {
            return false;
        }

        self.is_alive = false;
        self.drag_origin = None;
        self.cooldown = None;
        self.velocity = Vec2::ZERO;
        if let Some(body) = engine.body_mut(self.body) {
            body.set_velocity(Vec2::ZERO);
        }

        store.update_player(&self.id, PlayerUpdate::eliminated());
        store.record_elimination(&self.id);
        info!(player_id = %self.id, "Player eliminated");
        true
    }

    /// Remove the engine body. Used when the player leaves or the match is torn down.
    pub fn destroy(self, engine: &mut dyn PhysicsEngine) {
        engine.remove_body(self.body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::MatchStatus;
    use crate::game::systems::physics::ArcadeWorld;
    use crate::net::sync::RecordingSink;

    const EPSILON: f32 = 1e-3;

    fn attrs(power: f32, weight: f32) -> PlayerAttributes {
        PlayerAttributes::new(power, weight, 50.0, 1000)
    }

    fn spawn(id: &str, attributes: PlayerAttributes, position: Vec2, world: &mut ArcadeWorld, store: &mut GameStateStore) -> PlayerEntity {
        let entity = PlayerEntity::spawn(id, "icon.png", attributes, position, false, world);
        store.add_player(entity.snapshot());
        entity
    }

    fn create_test_setup() -> (ArcadeWorld, GameStateStore, PlayerEntity, RecordingSink) {
        let mut world = ArcadeWorld::new();
        let mut store = GameStateStore::new();
        let entity = spawn("alice", attrs(50.0, 50.0), Vec2::new(300.0, 200.0), &mut world, &mut store);
        (world, store, entity, RecordingSink::default())
    }

    #[test]
    fn test_compute_launch_direction() {
        // Dragging left of the origin launches to the right
        let launch = compute_launch(Vec2::new(100.0, 100.0), Vec2::new(0.0, 100.0), 50.0);
        assert!(launch.angle.abs() < EPSILON);
        assert!((launch.strength - 100.0).abs() < EPSILON);
    }

    #[test]
    fn test_launch_strength_capped() {
        let origin = Vec2::ZERO;
        let at_cap = compute_launch(origin, Vec2::new(500.0, 0.0), 50.0);
        let beyond = compute_launch(origin, Vec2::new(900.0, 0.0), 50.0);
        assert!((at_cap.strength - 500.0).abs() < EPSILON);
        assert!((beyond.strength - 500.0).abs() < EPSILON);
    }

    #[test]
    fn test_launch_strength_monotonic() {
        let origin = Vec2::ZERO;
        let mut previous = -1.0;
        for d in (0..=600).step_by(50) {
            let strength = compute_launch(origin, Vec2::new(d as f32, 0.0), 50.0).strength;
            assert!(strength >= previous);
            previous = strength;
        }

        let weak = compute_launch(origin, Vec2::new(200.0, 0.0), 20.0).strength;
        let strong = compute_launch(origin, Vec2::new(200.0, 0.0), 80.0).strength;
        assert!(strong > weak);
    }

    #[test]
    fn test_complete_drag_without_start_is_noop() {
        let (mut world, mut store, mut entity, sink) = create_test_setup();

        assert!(!entity.complete_drag(Vec2::new(10.0, 10.0), &mut world, &mut store, &sink));

        assert_eq!(world.get(entity.body()).unwrap().velocity, Vec2::ZERO);
        assert!(sink.sent().is_empty());
        assert!(!entity.is_cooldown());
    }

    #[test]
    fn test_complete_drag_launches() {
        let (mut world, mut store, mut entity, sink) = create_test_setup();

        assert!(entity.start_drag(Vec2::new(300.0, 200.0)));
        assert_eq!(entity.state(), EntityState::Dragging);
        assert!(entity.complete_drag(Vec2::new(300.0, 300.0), &mut world, &mut store, &sink));

        // Dragged down by 100, launched up with strength 100
        let velocity = world.get(entity.body()).unwrap().velocity;
        assert!(velocity.approx_eq(Vec2::new(0.0, -100.0), EPSILON));
        assert_eq!(entity.state(), EntityState::Cooldown);
        assert!(entity.drag_origin().is_none());
        assert!(!store.player("alice").unwrap().is_active);

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id, "alice");
        assert_eq!(sent[0].angle.len(), 2);
        assert!((sent[0].angle[1]).abs() < EPSILON);
        assert!((sent[0].pull_power - 100.0).abs() < EPSILON);
    }

    #[test]
    fn test_zero_distance_launch() {
        let (mut world, mut store, mut entity, sink) = create_test_setup();

        entity.start_drag(Vec2::new(50.0, 50.0));
        assert!(entity.complete_drag(Vec2::new(50.0, 50.0), &mut world, &mut store, &sink));

        assert_eq!(world.get(entity.body()).unwrap().velocity, Vec2::ZERO);
        assert_eq!(sink.sent()[0].pull_power, 0.0);
        assert!(entity.is_cooldown());
    }

    #[test]
    fn test_drag_blocked_during_cooldown() {
        let (mut world, mut store, mut entity, sink) = create_test_setup();
        entity.start_drag(Vec2::ZERO);
        entity.complete_drag(Vec2::new(10.0, 0.0), &mut world, &mut store, &sink);

        assert!(!entity.start_drag(Vec2::ZERO));
        assert!(!entity.complete_drag(Vec2::new(10.0, 0.0), &mut world, &mut store, &sink));
        assert_eq!(sink.sent().len(), 1);
    }

    #[test]
    fn test_cancel_drag() {
        let (mut world, mut store, mut entity, sink) = create_test_setup();
        entity.start_drag(Vec2::ZERO);
        entity.cancel_drag();

        assert_eq!(entity.state(), EntityState::Idle);
        assert!(!entity.complete_drag(Vec2::new(10.0, 0.0), &mut world, &mut store, &sink));
    }

    #[test]
    fn test_cooldown_expiry() {
        let (mut world, mut store, mut entity, sink) = create_test_setup();
        entity.start_drag(Vec2::ZERO);
        entity.complete_drag(Vec2::new(10.0, 0.0), &mut world, &mut store, &sink);
        assert!((entity.cooldown_progress() - 1.0).abs() < EPSILON);

        assert!(!entity.advance_cooldown(400.0, &mut store));
        assert!((entity.cooldown_progress() - 0.6).abs() < EPSILON);
        assert!(entity.is_cooldown());

        assert!(entity.advance_cooldown(600.0, &mut store));
        assert_eq!(entity.state(), EntityState::Idle);
        assert_eq!(entity.cooldown_progress(), 0.0);
        assert!(store.player("alice").unwrap().is_active);
        assert!(entity.start_drag(Vec2::ZERO));
    }

    #[test]
    fn test_restart_cooldown_replaces_timer() {
        let (_world, mut store, mut entity, _sink) = create_test_setup();
        entity.start_cooldown(&mut store);
        entity.advance_cooldown(900.0, &mut store);

        entity.start_cooldown(&mut store);

        assert!(!entity.advance_cooldown(900.0, &mut store));
        assert!(entity.advance_cooldown(100.0, &mut store));
    }

    #[test]
    fn test_impact_scenario() {
        let mut world = ArcadeWorld::new();
        let mut store = GameStateStore::new();
        let attacker = spawn("attacker", attrs(100.0, 50.0), Vec2::new(100.0, 100.0), &mut world, &mut store);
        let target = spawn("target", attrs(50.0, 50.0), Vec2::new(150.0, 100.0), &mut world, &mut store);
        world.body_mut(attacker.body()).unwrap().set_velocity(Vec2::new(10.0, 0.0));

        let impact = attacker.apply_collision_impact_to(&target, &mut world);

        // 100 * 0.5 * 0.5 * 0.9
        assert!((impact - 22.5).abs() < EPSILON);
        let target_vel = world.get(target.body()).unwrap().velocity;
        assert!(target_vel.approx_eq(Vec2::new(22.5, 0.0), EPSILON));
        // Recoil of 6.75 against the travel direction
        let attacker_vel = world.get(attacker.body()).unwrap().velocity;
        assert!(attacker_vel.approx_eq(Vec2::new(10.0 - 6.75, 0.0), EPSILON));
    }

    #[test]
    fn test_impact_scales_with_speed_squared() {
        let a = attrs(80.0, 40.0);
        let t = attrs(50.0, 60.0);
        let slow = impact_force(5.0, &a, &t);
        let fast = impact_force(10.0, &a, &t);
        assert!(slow >= 0.0);
        assert!((fast - slow * 4.0).abs() < EPSILON);
    }

    #[test]
    fn test_impact_with_weightless_players() {
        let a = PlayerAttributes::new(100.0, 0.0, 50.0, 0);
        let t = PlayerAttributes::new(100.0, 0.0, 50.0, 0);
        // 100 * 0.5 * 1.0 * 0.9
        assert!((impact_force(10.0, &a, &t) - 45.0).abs() < EPSILON);
    }

    #[test]
    fn test_impact_without_body_is_zero() {
        let mut world = ArcadeWorld::new();
        let mut store = GameStateStore::new();
        let attacker = spawn("attacker", attrs(100.0, 50.0), Vec2::new(100.0, 100.0), &mut world, &mut store);
        let target = spawn("target", attrs(50.0, 50.0), Vec2::new(150.0, 100.0), &mut world, &mut store);
        world.body_mut(attacker.body()).unwrap().set_velocity(Vec2::new(10.0, 0.0));
        world.remove_body(target.body());

        assert_eq!(attacker.apply_collision_impact_to(&target, &mut world), 0.0);
        assert_eq!(world.get(attacker.body()).unwrap().velocity, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn test_die_is_idempotent_and_terminal() {
        let (mut world, mut store, mut entity, sink) = create_test_setup();
        world.body_mut(entity.body()).unwrap().set_velocity(Vec2::new(30.0, 0.0));
        entity.start_drag(Vec2::ZERO);

        assert!(entity.die(&mut world, &mut store));
        assert!(!entity.die(&mut world, &mut store));

        assert_eq!(entity.state(), EntityState::Eliminated);
        assert_eq!(world.get(entity.body()).unwrap().velocity, Vec2::ZERO);
        assert!(entity.drag_origin().is_none());
        assert_eq!(store.elimination_order(), &["alice".to_string()]);
        assert!(!store.player("alice").unwrap().is_alive);

        assert!(!entity.start_drag(Vec2::ZERO));
        assert!(!entity.complete_drag(Vec2::new(5.0, 5.0), &mut world, &mut store, &sink));
        assert!(!entity.set_velocity_with_angle(0.0, 100.0, &mut world));
        assert!(!entity.snapshot().is_alive);
        assert_eq!(store.status(), MatchStatus::Waiting);
    }

    #[test]
    fn test_dead_attacker_has_no_impact() {
        let mut world = ArcadeWorld::new();
        let mut store = GameStateStore::new();
        let mut attacker = spawn("attacker", attrs(100.0, 50.0), Vec2::new(100.0, 100.0), &mut world, &mut store);
        let target = spawn("target", attrs(50.0, 50.0), Vec2::new(150.0, 100.0), &mut world, &mut store);
        attacker.die(&mut world, &mut store);

        assert_eq!(attacker.apply_collision_impact_to(&target, &mut world), 0.0);
        assert_eq!(world.get(target.body()).unwrap().velocity, Vec2::ZERO);
    }

    #[test]
    fn test_set_velocity_with_angle_ignores_cooldown() {
        let (mut world, mut store, mut entity, _sink) = create_test_setup();
        entity.start_cooldown(&mut store);

        assert!(entity.set_velocity_with_angle(std::f32::consts::FRAC_PI_2, 40.0, &mut world));

        let velocity = world.get(entity.body()).unwrap().velocity;
        assert!(velocity.approx_eq(Vec2::new(0.0, 40.0), EPSILON));
    }

    #[test]
    fn test_is_within_field() {
        let (mut world, _store, entity, _sink) = create_test_setup();
        let field = Field::default();
        assert!(entity.is_within_field(&world, &field));

        // Radius 25: grazing the left edge still counts as inside
        let grazing = PlayerEntity::spawn("grazing", "", attrs(50.0, 50.0), Vec2::new(-20.0, 200.0), false, &mut world);
        assert!(grazing.is_within_field(&world, &field));

        let gone = PlayerEntity::spawn("gone", "", attrs(50.0, 50.0), Vec2::new(-30.0, 200.0), false, &mut world);
        assert!(!gone.is_within_field(&world, &field));

        world.remove_body(grazing.body());
        assert!(!grazing.is_within_field(&world, &field));
    }

    #[test]
    fn test_sync_from_engine_mirrors_store() {
        let (mut world, mut store, mut entity, _sink) = create_test_setup();
        world.body_mut(entity.body()).unwrap().set_velocity(Vec2::new(60.0, 0.0));
        world.step(0.5);

        entity.sync_from_engine(&world, &mut store);

        let body = *world.get(entity.body()).unwrap();
        assert_eq!(entity.position(), body.position);
        assert_eq!(store.player("alice").unwrap().position, body.position);
        assert_eq!(store.player("alice").unwrap().velocity, body.velocity);
    }

    #[test]
    fn test_update_attributes_reconfigures_body() {
        let (mut world, mut store, mut entity, _sink) = create_test_setup();
        let heavy = PlayerAttributes::new(90.0, 100.0, 100.0, 3000);

        entity.update_attributes(heavy, &mut world, &mut store);

        let body = world.get(entity.body()).unwrap();
        assert!((body.mass - 5.0).abs() < EPSILON);
        assert!((body.radius - 40.0).abs() < EPSILON);
        assert_eq!(store.player("alice").unwrap().attributes, heavy);
    }
}
