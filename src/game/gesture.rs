//! Two-click drag gesture
//!
//! The first press pins a drag origin on the local player. The second press
//! releases the drag at the pointer and launches. A release refused by the
//! entity (cooldown, elimination) keeps the controller waiting for a second
//! press and re-pins the origin at the pointer, so the next press retries
//! from there.

use crate::game::entity::PlayerEntity;
use crate::game::state::GameStateStore;
use crate::game::systems::physics::PhysicsEngine;
use crate::net::sync::LaunchSink;
use crate::util::vec2::Vec2;

/// Gesture phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GesturePhase {
    /// Next press pins the origin
    #[default]
    FirstClick,
    /// Next press releases the drag
    SecondClick,
}

/// Result of feeding one pointer press to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// Origin pinned, waiting for the release press
    OriginPinned,
    /// Entity refused to start a drag
    Ignored,
    /// Launch performed
    Launched,
    /// Release refused, origin re-pinned for a retry where possible
    Blocked,
}

/// Per-entity gesture state machine
#[derive(Debug, Clone, Default)]
pub struct DragGestureController {
    phase: GesturePhase,
}

impl DragGestureController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    /// Feed one pointer press at `point`
    pub fn on_pointer_down(
        &mut self,
        point: Vec2,
        entity: &mut PlayerEntity,
        engine: &mut dyn PhysicsEngine,
        store: &mut GameStateStore,
        sink: &dyn LaunchSink,
    ) -> GestureOutcome {
        match self.phase {
            GesturePhase::FirstClick => {
                if entity.start_drag(point) {
                    self.phase = GesturePhase::SecondClick;
                    GestureOutcome::OriginPinned
                } else {
                    GestureOutcome::Ignored
                }
            }
            GesturePhase::SecondClick => {
                if entity.complete_drag(point, engine, store, sink) {
                    self.phase = GesturePhase::FirstClick;
                    GestureOutcome::Launched
                } else {
                    entity.start_drag(point);
                    GestureOutcome::Blocked
                }
            }
        }
    }

    /// Abandon the gesture and clear the entity's origin
    pub fn cancel(&mut self, entity: &mut PlayerEntity) {
        entity.cancel_drag();
        self.phase = GesturePhase::FirstClick;
    }
}
