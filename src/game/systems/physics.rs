//! Physics engine seam
//!
//! Entity logic never touches an integrator directly. Every physical mutation
//! goes through [`PhysicsBody`], and bodies are owned by a [`PhysicsEngine`]
//! that hands out opaque [`BodyHandle`]s. [`ArcadeWorld`] is the headless
//! implementation used by the client binary, tests and benches.

use hashbrown::HashMap;
use rayon::prelude::*;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;

use crate::game::attributes::PhysicalParams;
use crate::game::constants::physics::STOP_SPEED;
use crate::util::vec2::Vec2;

/// Opaque key of a body owned by the engine
pub type BodyHandle = u32;

/// Overlapping pairs reported by one engine step, lower handle first
pub type CollisionPairs = SmallVec<[(BodyHandle, BodyHandle); 8]>;

/// Smallest mass a body accepts
const MIN_MASS: f32 = 0.001;

/// Mutation surface of a single engine body
pub trait PhysicsBody: Send {
    fn position(&self) -> Vec2;
    fn velocity(&self) -> Vec2;
    fn radius(&self) -> f32;
    fn set_velocity(&mut self, velocity: Vec2);
    fn set_mass(&mut self, mass: f32);
    fn set_drag(&mut self, drag: f32);
    fn set_bounce(&mut self, bounce: f32);
    fn set_radius(&mut self, radius: f32);

    /// Push all derived parameters onto the body at once
    fn apply_params(&mut self, params: &PhysicalParams) {
        self.set_mass(params.mass);
        self.set_drag(params.drag);
        self.set_bounce(params.bounce);
        self.set_radius(params.radius);
    }
}

/// Engine capability injected into the match
pub trait PhysicsEngine: Send {
    /// Create a circular body at `position` configured from `params`
    fn spawn_body(&mut self, position: Vec2, params: &PhysicalParams) -> BodyHandle;

    /// Remove a body. Returns false if the handle was unknown.
    fn remove_body(&mut self, handle: BodyHandle) -> bool;

    fn body(&self, handle: BodyHandle) -> Option<&dyn PhysicsBody>;

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut dyn PhysicsBody>;

    /// Advance the simulation and report every overlapping pair
    fn step(&mut self, dt: f32) -> CollisionPairs;

    fn body_count(&self) -> usize;
}

/// Circular body with arcade-style damping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcadeBody {
    pub position: Vec2,
    pub velocity: Vec2,
    pub mass: f32,
    /// Fraction of velocity kept after one second
    pub drag: f32,
    pub bounce: f32,
    pub radius: f32,
}

impl ArcadeBody {
    pub fn new(position: Vec2, params: &PhysicalParams) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            mass: params.mass.max(MIN_MASS),
            drag: params.drag,
            bounce: params.bounce,
            radius: params.radius,
        }
    }

    /// Damp velocity then integrate position
    /// Damping is exponential per second: velocity *= drag^dt
    fn integrate(&mut self, dt: f32) {
        if self.drag > 0.0 && self.drag < 1.0 {
            self.velocity *= self.drag.powf(dt);
        }

        if self.velocity.length_sq() < STOP_SPEED * STOP_SPEED {
            self.velocity = Vec2::ZERO;
        }

        self.position += self.velocity * dt;
    }
}

impl PhysicsBody for ArcadeBody {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn velocity(&self) -> Vec2 {
        self.velocity
    }

    fn radius(&self) -> f32 {
        self.radius
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        if velocity.is_finite() {
            self.velocity = velocity;
        }
    }

    fn set_mass(&mut self, mass: f32) {
        self.mass = mass.max(MIN_MASS);
    }

    fn set_drag(&mut self, drag: f32) {
        self.drag = drag;
    }

    fn set_bounce(&mut self, bounce: f32) {
        self.bounce = bounce;
    }

    fn set_radius(&mut self, radius: f32) {
        self.radius = radius.max(0.0);
    }
}

/// Headless arcade physics world
#[derive(Default)]
pub struct ArcadeWorld {
    bodies: HashMap<BodyHandle, ArcadeBody, FxBuildHasher>,
    next_handle: BodyHandle,
}

impl ArcadeWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&ArcadeBody> {
        self.bodies.get(&handle)
    }
}

impl PhysicsEngine for ArcadeWorld {
    fn spawn_body(&mut self, position: Vec2, params: &PhysicalParams) -> BodyHandle {
        let handle = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1);
        self.bodies.insert(handle, ArcadeBody::new(position, params));
        handle
    }

    fn remove_body(&mut self, handle: BodyHandle) -> bool {
        self.bodies.remove(&handle).is_some()
    }

    fn body(&self, handle: BodyHandle) -> Option<&dyn PhysicsBody> {
        self.bodies.get(&handle).map(|b| b as &dyn PhysicsBody)
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut dyn PhysicsBody> {
        self.bodies.get_mut(&handle).map(|b| b as &mut dyn PhysicsBody)
    }

    /// Integrate in parallel, then separate overlapping circles in handle order
    fn step(&mut self, dt: f32) -> CollisionPairs {
        self.bodies.par_values_mut().for_each(|body| body.integrate(dt));

        let mut ordered: Vec<(BodyHandle, ArcadeBody)> =
            self.bodies.iter().map(|(h, b)| (*h, *b)).collect();
        ordered.sort_unstable_by_key(|(h, _)| *h);

        let mut pairs = CollisionPairs::new();
        for i in 0..ordered.len() {
            let (head, tail) = ordered.split_at_mut(i + 1);
            let (first_handle, first) = &mut head[i];
            for (second_handle, second) in tail.iter_mut() {
                if separate(first, second) {
                    pairs.push((*first_handle, *second_handle));
                }
            }
        }

        for (handle, body) in ordered {
            self.bodies.insert(handle, body);
        }

        pairs
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

/// Push two overlapping circles apart and exchange velocity along the normal
/// Returns false if the circles do not overlap.
fn separate(a: &mut ArcadeBody, b: &mut ArcadeBody) -> bool {
    let min_dist = a.radius + b.radius;
    let delta = b.position - a.position;
    if delta.length_sq() >= min_dist * min_dist {
        return false;
    }

    let (normal, dist) = delta.normalize_with_length();
    let normal = if dist > 0.0 { normal } else { Vec2::RIGHT };
    let overlap = min_dist - dist;
    let total_mass = a.mass + b.mass;

    a.position -= normal * (overlap * b.mass / total_mass);
    b.position += normal * (overlap * a.mass / total_mass);

    // Closing speed along the normal, positive when approaching
    let closing = (a.velocity - b.velocity).dot(normal);
    if closing > 0.0 {
        let restitution = a.bounce.min(b.bounce);
        let impulse = (1.0 + restitution) * closing / (1.0 / a.mass + 1.0 / b.mass);
        a.velocity -= normal * (impulse / a.mass);
        b.velocity += normal * (impulse / b.mass);
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::attributes::{derive, PlayerAttributes};
    use crate::game::constants::physics::DT;

    fn balanced_params() -> PhysicalParams {
        derive(&PlayerAttributes::new(50.0, 50.0, 50.0, 1000))
    }

    fn create_test_world() -> (ArcadeWorld, BodyHandle) {
        let mut world = ArcadeWorld::new();
        let handle = world.spawn_body(Vec2::new(100.0, 100.0), &balanced_params());
        world
            .body_mut(handle)
            .unwrap()
            .set_velocity(Vec2::new(50.0, 0.0));
        (world, handle)
    }

    #[test]
    fn test_exponential_damping() {
        let (mut world, handle) = create_test_world();
        let drag = world.get(handle).unwrap().drag;

        world.step(DT);

        let expected = 50.0 * drag.powf(DT);
        let actual = world.get(handle).unwrap().velocity.length();
        assert!((actual - expected).abs() < 0.001);
    }

    #[test]
    fn test_damping_over_one_second() {
        let (mut world, handle) = create_test_world();
        let drag = world.get(handle).unwrap().drag;

        for _ in 0..60 {
            world.step(DT);
        }

        // Sixty ticks of drag^(1/60) compound to one full second of drag
        let actual = world.get(handle).unwrap().velocity.length();
        assert!((actual - 50.0 * drag).abs() < 0.01);
    }

    #[test]
    fn test_slow_bodies_come_to_rest() {
        let (mut world, handle) = create_test_world();
        world
            .body_mut(handle)
            .unwrap()
            .set_velocity(Vec2::new(STOP_SPEED / 2.0, 0.0));

        world.step(DT);

        assert_eq!(world.get(handle).unwrap().velocity, Vec2::ZERO);
    }

    #[test]
    fn test_position_integration() {
        let (mut world, handle) = create_test_world();
        let before = world.get(handle).unwrap().position;

        world.step(DT);

        let body = world.get(handle).unwrap();
        let expected = before + body.velocity * DT;
        assert!(body.position.approx_eq(expected, 0.0001));
        assert!(body.position.x > before.x);
    }

    #[test]
    fn test_non_finite_velocity_rejected() {
        let (mut world, handle) = create_test_world();
        world
            .body_mut(handle)
            .unwrap()
            .set_velocity(Vec2::new(f32::NAN, 0.0));

        assert_eq!(world.get(handle).unwrap().velocity, Vec2::new(50.0, 0.0));
    }

    #[test]
    fn test_remove_body() {
        let (mut world, handle) = create_test_world();
        assert_eq!(world.body_count(), 1);

        assert!(world.remove_body(handle));
        assert!(!world.remove_body(handle));
        assert!(world.body(handle).is_none());
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_handles_are_unique() {
        let mut world = ArcadeWorld::new();
        let a = world.spawn_body(Vec2::ZERO, &balanced_params());
        let b = world.spawn_body(Vec2::ZERO, &balanced_params());
        world.remove_body(a);
        let c = world.spawn_body(Vec2::ZERO, &balanced_params());

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_apply_params() {
        let (mut world, handle) = create_test_world();
        let heavy = derive(&PlayerAttributes::new(100.0, 100.0, 100.0, 0));

        world.body_mut(handle).unwrap().apply_params(&heavy);

        let body = world.get(handle).unwrap();
        assert_eq!(body.mass, heavy.mass);
        assert_eq!(body.drag, heavy.drag);
        assert_eq!(body.bounce, heavy.bounce);
        assert_eq!(body.radius, heavy.radius);
    }

    #[test]
    fn test_overlap_reported_lower_handle_first() {
        let mut world = ArcadeWorld::new();
        let params = balanced_params();
        let first = world.spawn_body(Vec2::new(100.0, 100.0), &params);
        let second = world.spawn_body(Vec2::new(130.0, 100.0), &params);

        let pairs = world.step(DT);

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0], (first, second));
    }

    #[test]
    fn test_overlap_is_separated() {
        let mut world = ArcadeWorld::new();
        let params = balanced_params();
        let a = world.spawn_body(Vec2::new(100.0, 100.0), &params);
        let b = world.spawn_body(Vec2::new(130.0, 100.0), &params);

        world.step(DT);

        let distance = world.get(a).unwrap().position.distance_to(world.get(b).unwrap().position);
        assert!(distance >= params.radius * 2.0 - 0.001);
        // Equal masses split the correction evenly
        assert!((world.get(a).unwrap().position.x - 90.0).abs() < 0.001);
        assert!((world.get(b).unwrap().position.x - 140.0).abs() < 0.001);
    }

    #[test]
    fn test_head_on_exchange_uses_restitution() {
        let mut world = ArcadeWorld::new();
        let params = balanced_params();
        let a = world.spawn_body(Vec2::new(100.0, 100.0), &params);
        let b = world.spawn_body(Vec2::new(149.0, 100.0), &params);
        world.body_mut(a).unwrap().set_velocity(Vec2::new(10.0, 0.0));

        let pairs = world.step(DT);
        assert_eq!(pairs.len(), 1);

        let va = world.get(a).unwrap().velocity.x;
        let vb = world.get(b).unwrap().velocity.x;
        // Momentum is conserved between equal masses
        let before = 10.0 * params.drag.powf(DT);
        assert!((va + vb - before).abs() < 0.001);
        // Target ends up faster than the attacker
        assert!(vb > va);
    }

    #[test]
    fn test_distant_bodies_do_not_collide() {
        let mut world = ArcadeWorld::new();
        let params = balanced_params();
        world.spawn_body(Vec2::new(0.0, 0.0), &params);
        world.spawn_body(Vec2::new(200.0, 0.0), &params);

        assert!(world.step(DT).is_empty());
    }

    #[test]
    fn test_step_determinism() {
        let (mut world1, h1) = create_test_world();
        let (mut world2, h2) = create_test_world();

        for _ in 0..100 {
            world1.step(DT);
            world2.step(DT);
        }

        assert_eq!(world1.get(h1), world2.get(h2));
    }
}
