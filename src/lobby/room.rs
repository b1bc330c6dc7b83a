use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::game::constants::net::LOBBY_POLL_MS;
use crate::game::match_loop::SumoMatch;
use crate::game::state::PlayerId;
use crate::game::systems::arena::Field;
use crate::game::systems::physics::PhysicsEngine;
use crate::lobby::member::RoomMember;
use crate::metrics::SessionMetrics;
use crate::net::connection::{RoomConnection, RoomSender};
use crate::net::inbound::InboundBuffer;
use crate::net::protocol::{ActionPayload, JoinPayload, RoomSnapshot};
use crate::net::sync::{self, LaunchSink, RoomReplica, SyncOutcome};

/// Waiting room state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    /// Waiting for the start signal
    Waiting,
    /// Start received, ready to build the match
    Starting,
    /// Room channel closed before the start
    Closed,
    /// Left locally
    Cancelled,
}

/// Roster of a room before its match starts
///
/// Owns the room channel until [`WaitingRoom::into_match`] hands it to the
/// match. Dropping the room instead closes the channel.
pub struct WaitingRoom {
    room_id: String,
    local: RoomMember,
    /// Remote members in join order
    members: Vec<RoomMember>,
    state: RoomState,
    inbound: InboundBuffer,
    connection: Option<RoomConnection>,
    metrics: Arc<SessionMetrics>,
}

impl WaitingRoom {
    pub fn new(room_id: impl Into<String>, local: RoomMember, inbound: InboundBuffer, metrics: Arc<SessionMetrics>) -> Self {
        Self {
            room_id: room_id.into(),
            local,
            members: Vec::new(),
            state: RoomState::Waiting,
            inbound,
            connection: None,
            metrics,
        }
    }

    pub fn with_connection(mut self, connection: RoomConnection) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn local(&self) -> &RoomMember {
        &self.local
    }

    pub fn members(&self) -> &[RoomMember] {
        &self.members
    }

    pub fn member(&self, id: &str) -> Option<&RoomMember> {
        if id == self.local.id {
            return Some(&self.local);
        }
        self.members.iter().find(|m| m.id == id)
    }

    /// Members including the local player
    pub fn member_count(&self) -> usize {
        self.members.len() + 1
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    /// Outbound handle of the room channel, if connected
    pub fn room_sender(&self) -> Option<RoomSender> {
        self.connection.as_ref().map(RoomConnection::sender)
    }

    /// Add everyone from a membership snapshot. Returns how many were new.
    pub fn seed(&mut self, snapshot: RoomSnapshot) -> usize {
        snapshot
            .users
            .into_iter()
            .map(RoomMember::from)
            .filter(|member| self.add_member(member.clone()))
            .count()
    }

    fn add_member(&mut self, member: RoomMember) -> bool {
        if self.member(&member.id).is_some() {
            return false;
        }
        info!(room_id = %self.room_id, player_id = %member.id, "Member joined");
        self.members.push(member);
        true
    }

    /// Apply pending room messages up to and including `start`
    ///
    /// Whatever follows the start stays queued for the match's first tick.
    pub fn poll(&mut self) -> Vec<SyncOutcome> {
        let mut outcomes = Vec::new();
        while self.state == RoomState::Waiting {
            let Some(message) = self.inbound.try_next() else {
                break;
            };
            let outcome = sync::apply_message(self, message);
            if outcome == SyncOutcome::StartRequested {
                info!(room_id = %self.room_id, members = self.member_count(), "Start received");
                self.state = RoomState::Starting;
            }
            outcomes.push(outcome);
        }

        if self.state == RoomState::Waiting && self.connection.as_ref().is_some_and(|c| !c.is_open()) {
            warn!(room_id = %self.room_id, "Room channel closed while waiting");
            self.state = RoomState::Closed;
        }
        outcomes
    }

    /// Poll until the match starts, the channel closes, or `shutdown` resolves
    pub async fn wait_for_start<F>(&mut self, shutdown: F) -> RoomState
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(Duration::from_millis(LOBBY_POLL_MS));
        tokio::pin!(shutdown);

        while self.state == RoomState::Waiting {
            tokio::select! {
                _ = &mut shutdown => {
                    self.state = RoomState::Cancelled;
                }
                _ = interval.tick() => {
                    for outcome in self.poll() {
                        debug!(?outcome, "Waiting room update");
                    }
                }
            }
        }
        self.state
    }

    /// Build the match from the roster and hand over the room channel
    ///
    /// Every member spawns at their announced point; the local member is the
    /// main player. The match is already playing if the start was received.
    pub fn into_match<E: PhysicsEngine>(
        self,
        engine: E,
        field: Field,
        tick_rate: u32,
        sink: Arc<dyn LaunchSink>,
    ) -> SumoMatch<E> {
        let started = self.state == RoomState::Starting;
        let mut game = SumoMatch::new(
            self.local.id.clone(),
            engine,
            field,
            tick_rate,
            self.inbound,
            sink,
            self.metrics,
        );

        let local = self.local;
        game.add_player(local.id, local.icon_url, local.attributes, local.point);
        for member in self.members {
            game.add_player(member.id, member.icon_url, member.attributes, member.point);
        }

        if let Some(connection) = self.connection {
            game = game.with_connection(connection);
        }
        if started {
            if let Err(e) = game.start() {
                warn!(error = %e, "Could not start match");
            }
        }
        game
    }

    /// Ids of every member, local first
    pub fn member_ids(&self) -> Vec<PlayerId> {
        std::iter::once(self.local.id.clone())
            .chain(self.members.iter().map(|m| m.id.clone()))
            .collect()
    }
}

impl RoomReplica for WaitingRoom {
    fn local_player_id(&self) -> &str {
        &self.local.id
    }

    fn on_join(&mut self, join: JoinPayload) -> bool {
        self.add_member(RoomMember::from(join))
    }

    fn on_leave(&mut self, id: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m.id != id);
        let removed = self.members.len() != before;
        if removed {
            info!(room_id = %self.room_id, player_id = %id, "Member left");
        }
        removed
    }

    /// No bodies exist before the match, so launches are dropped
    fn on_action(&mut self, _action: &ActionPayload) -> bool {
        false
    }
}

impl std::fmt::Debug for WaitingRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitingRoom")
            .field("room_id", &self.room_id)
            .field("local", &self.local.id)
            .field("members", &self.members.len())
            .field("state", &self.state)
            .finish()
    }
}
