//! Match loop
//!
//! [`SumoMatch`] owns everything one match mutates: the engine, the store,
//! the entities and the local gesture. All mutation happens on the task that
//! calls [`SumoMatch::tick`]; the network side only reaches it through the
//! inbound buffer.
//!
//! Tick order:
//! 1. drain and apply inbound room messages
//! 2. feed queued pointer presses to the gesture controller
//! 3. step the engine and resolve collision impacts
//! 4. mirror positions into the store
//! 5. advance cooldowns
//! 6. eliminate players outside the field
//! 7. check for a winner

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::game::attributes::PlayerAttributes;
use crate::game::entity::PlayerEntity;
use crate::game::gesture::{DragGestureController, GestureOutcome, GesturePhase};
use crate::game::match_result::{determine_result, MatchEndReason, MatchResult};
use crate::game::state::{GameStateStore, MatchStatus, PlayerId, PlayerSnapshot, StoreError};
use crate::game::systems::arena::{check_player_boundaries, Field};
use crate::game::systems::collision::{self, CollisionEvent};
use crate::game::systems::physics::{BodyHandle, PhysicsEngine};
use crate::metrics::SessionMetrics;
use crate::net::connection::RoomConnection;
use crate::net::inbound::InboundBuffer;
use crate::net::protocol::{ActionPayload, JoinPayload, RoomMessage};
use crate::net::sync::{self, LaunchSink, RoomReplica, SyncOutcome};
use crate::util::vec2::Vec2;

/// Local pointer input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    Press(Vec2),
    Cancel,
}

/// Something that happened during one tick
#[derive(Debug, Clone, PartialEq)]
pub enum MatchEvent {
    PlayerJoined(PlayerId),
    PlayerLeft(PlayerId),
    /// `remote` is false for the local player's own launch
    Launched { id: PlayerId, remote: bool },
    Collision(CollisionEvent),
    Eliminated(PlayerId),
    /// `None` when the last players left the field on the same tick
    MatchEnded { winner: Option<PlayerId> },
}

/// Read-only view published after every tick
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchSnapshot {
    pub tick: u64,
    pub status: MatchStatus,
    pub winner: Option<PlayerId>,
    /// Sorted by id
    pub players: Vec<PlayerSnapshot>,
    /// Remaining cooldown share of the local player
    pub local_cooldown: f32,
}

/// One match, generic over the physics engine
pub struct SumoMatch<E: PhysicsEngine> {
    local_id: PlayerId,
    engine: E,
    store: GameStateStore,
    players: HashMap<PlayerId, PlayerEntity>,
    bodies: HashMap<BodyHandle, PlayerId>,
    gesture: DragGestureController,
    pointer: Vec<PointerInput>,
    field: Field,
    tick_rate: u32,
    tick: u64,
    inbound: InboundBuffer,
    connection: Option<RoomConnection>,
    sink: Arc<dyn LaunchSink>,
    metrics: Arc<SessionMetrics>,
    started_at: Option<Instant>,
    /// One-shot guard for the win check
    decided: bool,
}

impl<E: PhysicsEngine> SumoMatch<E> {
    pub fn new(
        local_id: impl Into<PlayerId>,
        engine: E,
        field: Field,
        tick_rate: u32,
        inbound: InboundBuffer,
        sink: Arc<dyn LaunchSink>,
        metrics: Arc<SessionMetrics>,
    ) -> Self {
        Self {
            local_id: local_id.into(),
            engine,
            store: GameStateStore::new(),
            players: HashMap::new(),
            bodies: HashMap::new(),
            gesture: DragGestureController::new(),
            pointer: Vec::new(),
            field,
            tick_rate: tick_rate.max(1),
            tick: 0,
            inbound,
            connection: None,
            sink,
            metrics,
            started_at: None,
            decided: false,
        }
    }

    /// Attach the room channel. The match owns it from here on.
    pub fn with_connection(mut self, connection: RoomConnection) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn store(&self) -> &GameStateStore {
        &self.store
    }

    /// Mutable store access, for registering listeners
    pub fn store_mut(&mut self) -> &mut GameStateStore {
        &mut self.store
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn player(&self, id: &str) -> Option<&PlayerEntity> {
        self.players.get(id)
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn gesture_phase(&self) -> GesturePhase {
        self.gesture.phase()
    }

    pub fn is_finished(&self) -> bool {
        self.store.status() == MatchStatus::Finished
    }

    /// True once an attached room channel has closed
    pub fn connection_lost(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| !c.is_open())
    }

    // ------------------------------------------------------------------
    // Roster
    // ------------------------------------------------------------------

    /// Spawn a player. Returns false if the id is already present.
    pub fn add_player(
        &mut self,
        id: impl Into<PlayerId>,
        icon: impl Into<String>,
        attributes: PlayerAttributes,
        position: Vec2,
    ) -> bool {
        let id = id.into();
        if self.players.contains_key(&id) {
            return false;
        }

        let is_main = id == self.local_id;
        let entity = PlayerEntity::spawn(id.clone(), icon, attributes, position, is_main, &mut self.engine);
        self.store.add_player(entity.snapshot());
        self.bodies.insert(entity.body(), id.clone());
        info!(player_id = %id, is_main, x = position.x, y = position.y, "Player spawned");
        self.players.insert(id, entity);
        true
    }

    /// Remove a player and its body. Returns false if the id is unknown.
    pub fn remove_player(&mut self, id: &str) -> bool {
        let Some(entity) = self.players.remove(id) else {
            return false;
        };
        self.bodies.remove(&entity.body());
        entity.destroy(&mut self.engine);
        self.store.remove_player(id);
        info!(player_id = %id, "Player left");
        true
    }

    /// Eliminate a player directly. Returns false if unknown or already out.
    pub fn eliminate(&mut self, id: &str) -> bool {
        let Some(entity) = self.players.get_mut(id) else {
            return false;
        };
        let eliminated = entity.die(&mut self.engine, &mut self.store);
        if eliminated {
            SessionMetrics::add(&self.metrics.eliminations, 1);
        }
        eliminated
    }

    /// Move the match from waiting to playing
    pub fn start(&mut self) -> Result<bool, StoreError> {
        let started = self.store.set_status(MatchStatus::Playing)?;
        if started {
            self.started_at = Some(Instant::now());
            info!(players = self.players.len(), "Match started");
        }
        Ok(started)
    }

    // ------------------------------------------------------------------
    // Inputs
    // ------------------------------------------------------------------

    /// Queue a pointer input for the next tick
    pub fn queue_pointer(&mut self, input: PointerInput) {
        self.pointer.push(input);
    }

    /// Apply one room message immediately
    pub fn apply_message(&mut self, message: RoomMessage) -> SyncOutcome {
        sync::apply_message(self, message)
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Run one tick of `dt` seconds
    pub fn tick(&mut self, dt: f32) -> Vec<MatchEvent> {
        let mut events = Vec::new();

        // 1. Inbound
        for message in self.inbound.drain() {
            match sync::apply_message(self, message) {
                SyncOutcome::Joined(id) => events.push(MatchEvent::PlayerJoined(id)),
                SyncOutcome::Left(id) => events.push(MatchEvent::PlayerLeft(id)),
                SyncOutcome::Launched(id) => events.push(MatchEvent::Launched { id, remote: true }),
                SyncOutcome::StartRequested => {
                    if let Err(e) = self.start() {
                        debug!(error = %e, "Start ignored");
                    }
                }
                SyncOutcome::Ignored(reason) => debug!(?reason, "Room message ignored"),
            }
        }

        // 2. Pointer
        let inputs = std::mem::take(&mut self.pointer);
        if self.store.status() == MatchStatus::Playing {
            if let Some(entity) = self.players.get_mut(&self.local_id) {
                for input in inputs {
                    match input {
                        PointerInput::Press(point) => {
                            let outcome = self.gesture.on_pointer_down(
                                point,
                                entity,
                                &mut self.engine,
                                &mut self.store,
                                self.sink.as_ref(),
                            );
                            if outcome == GestureOutcome::Launched {
                                SessionMetrics::add(&self.metrics.launches, 1);
                                events.push(MatchEvent::Launched {
                                    id: self.local_id.clone(),
                                    remote: false,
                                });
                            }
                        }
                        PointerInput::Cancel => self.gesture.cancel(entity),
                    }
                }
            }
        }

        // 3. Physics and collisions
        let pairs = self.engine.step(dt);
        let impacts = collision::resolve(&pairs, &self.bodies, &self.players, &mut self.engine);
        SessionMetrics::add(&self.metrics.collisions, impacts.len() as u64);
        events.extend(impacts.into_iter().map(MatchEvent::Collision));

        // 4. Mirror
        for entity in self.players.values_mut() {
            entity.sync_from_engine(&self.engine, &mut self.store);
        }

        // 5. Cooldowns
        let dt_ms = dt * 1000.0;
        for entity in self.players.values_mut() {
            entity.advance_cooldown(dt_ms, &mut self.store);
        }

        // 6. Boundaries
        let eliminated = check_player_boundaries(&mut self.players, &mut self.engine, &mut self.store, &self.field);
        SessionMetrics::add(&self.metrics.eliminations, eliminated.len() as u64);
        events.extend(eliminated.into_iter().map(MatchEvent::Eliminated));

        // 7. Win check
        if let Some(ended) = self.check_winner() {
            events.push(ended);
        }

        self.tick += 1;
        events
    }

    /// Finish the match once at most one player is left
    fn check_winner(&mut self) -> Option<MatchEvent> {
        if self.decided || self.store.status() != MatchStatus::Playing {
            return None;
        }

        let alive = self.store.alive_ids();
        let winner = match alive.as_slice() {
            [winner] => Some(winner.clone()),
            [] if self.store.player_count() > 0 => None,
            _ => return None,
        };

        self.decided = true;
        if let Err(e) = self.store.set_status(MatchStatus::Finished) {
            warn!(error = %e, "Could not finish match");
            return None;
        }
        if let Some(id) = &winner {
            if let Err(e) = self.store.set_winner(id) {
                warn!(error = %e, "Could not record winner");
            }
            self.store.record_elimination(id);
            info!(winner = %id, "Match finished");
        } else {
            info!("Match finished without a winner");
        }
        Some(MatchEvent::MatchEnded { winner })
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        let mut players: Vec<PlayerSnapshot> = self.store.players().cloned().collect();
        players.sort_by(|a, b| a.id.cmp(&b.id));
        MatchSnapshot {
            tick: self.tick,
            status: self.store.status(),
            winner: self.store.winner().cloned(),
            players,
            local_cooldown: self
                .players
                .get(&self.local_id)
                .map_or(0.0, |p| p.cooldown_progress()),
        }
    }

    pub fn result(&self, reason: MatchEndReason) -> MatchResult {
        let duration = self.started_at.map_or(Duration::ZERO, |t| t.elapsed());
        determine_result(&self.store, &self.local_id, duration, reason)
    }

    /// Drive the match at the configured tick rate until it ends
    ///
    /// Ends when a winner is decided, the room channel closes, or `shutdown`
    /// resolves. Every tick's snapshot is published on `snapshots`.
    pub async fn run<F>(
        mut self,
        mut pointer: mpsc::UnboundedReceiver<PointerInput>,
        snapshots: watch::Sender<MatchSnapshot>,
        shutdown: F,
    ) -> MatchResult
    where
        F: Future<Output = ()>,
    {
        let dt = 1.0 / self.tick_rate as f32;
        let mut interval = tokio::time::interval(Duration::from_secs_f32(dt));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let reason = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Match cancelled");
                    break MatchEndReason::Cancelled;
                }
                _ = interval.tick() => {
                    while let Ok(input) = pointer.try_recv() {
                        self.queue_pointer(input);
                    }

                    let started = Instant::now();
                    let events = self.tick(dt);
                    self.metrics.record_tick_time(started.elapsed());
                    snapshots.send_replace(self.snapshot());

                    for event in &events {
                        match event {
                            MatchEvent::Eliminated(id) => info!(player_id = %id, "Eliminated"),
                            MatchEvent::Launched { id, remote } => debug!(player_id = %id, remote, "Launched"),
                            _ => {}
                        }
                    }

                    if self.is_finished() {
                        break MatchEndReason::LastPlayerStanding;
                    }
                    if self.connection_lost() {
                        warn!("Room channel lost, ending match");
                        break MatchEndReason::ConnectionLost;
                    }
                }
            }
        };

        self.result(reason)
    }
}

impl<E: PhysicsEngine> RoomReplica for SumoMatch<E> {
    fn local_player_id(&self) -> &str {
        &self.local_id
    }

    fn on_join(&mut self, join: JoinPayload) -> bool {
        let attributes = join.attributes();
        let position = join.spawn_point();
        self.add_player(join.id, join.icon_url, attributes, position)
    }

    fn on_leave(&mut self, id: &str) -> bool {
        self.remove_player(id)
    }

    fn on_action(&mut self, action: &ActionPayload) -> bool {
        match self.players.get_mut(&action.id) {
            Some(entity) => {
                entity.set_velocity_with_angle(action.heading(), action.pull_power, &mut self.engine);
                true
            }
            None => false,
        }
    }
}

impl<E: PhysicsEngine> std::fmt::Debug for SumoMatch<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SumoMatch")
            .field("local_id", &self.local_id)
            .field("tick", &self.tick)
            .field("players", &self.players.len())
            .field("store", &self.store)
            .finish()
    }
}
