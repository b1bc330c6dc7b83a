//! Room replication
//!
//! Applies decoded room messages to whatever mirrors the room locally (the
//! waiting room roster or a running match) and defines the outbound seam used
//! to replicate local launches.

use tracing::debug;

use crate::game::state::PlayerId;
use crate::net::protocol::{ActionPayload, JoinPayload, RoomMessage};

/// Outbound path for local launches
pub trait LaunchSink: Send + Sync {
    /// Hand off a launch for replication. Must not block.
    fn send_launch(&self, action: ActionPayload);
}

/// Sink for matches with no room channel. Launches stay local.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSink;

impl LaunchSink for OfflineSink {
    fn send_launch(&self, action: ActionPayload) {
        debug!(player_id = %action.id, "Offline launch not replicated");
    }
}

/// Local mirror of a room
pub trait RoomReplica {
    /// Id of the player running this client
    fn local_player_id(&self) -> &str;

    /// Add a remote player. Returns false if the id is already present.
    fn on_join(&mut self, join: JoinPayload) -> bool;

    /// Remove a player. Returns false if the id is unknown.
    fn on_leave(&mut self, id: &str) -> bool;

    /// Apply a remote launch. Returns false if the id is unknown.
    fn on_action(&mut self, action: &ActionPayload) -> bool;
}

/// Why a message had no effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Join for the local player, who is already present
    OwnJoin,
    /// Echo of a launch already applied locally
    OwnAction,
    DuplicateJoin,
    UnknownPlayer,
}

/// Effect of applying one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Joined(PlayerId),
    Left(PlayerId),
    Launched(PlayerId),
    StartRequested,
    Ignored(IgnoreReason),
}

/// Apply one message to a replica
pub fn apply_message<R: RoomReplica + ?Sized>(replica: &mut R, message: RoomMessage) -> SyncOutcome {
    match message {
        RoomMessage::Join(join) => {
            if join.id == replica.local_player_id() {
                return SyncOutcome::Ignored(IgnoreReason::OwnJoin);
            }
            let id = join.id.clone();
            if replica.on_join(join) {
                SyncOutcome::Joined(id)
            } else {
                SyncOutcome::Ignored(IgnoreReason::DuplicateJoin)
            }
        }
        RoomMessage::Leave(leave) => {
            if replica.on_leave(&leave.id) {
                SyncOutcome::Left(leave.id)
            } else {
                SyncOutcome::Ignored(IgnoreReason::UnknownPlayer)
            }
        }
        RoomMessage::Action(action) => {
            if action.id == replica.local_player_id() {
                return SyncOutcome::Ignored(IgnoreReason::OwnAction);
            }
            if replica.on_action(&action) {
                SyncOutcome::Launched(action.id)
            } else {
                SyncOutcome::Ignored(IgnoreReason::UnknownPlayer)
            }
        }
        RoomMessage::Start => SyncOutcome::StartRequested,
    }
}

/// Sink that records launches for assertions
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: parking_lot::Mutex<Vec<ActionPayload>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn sent(&self) -> Vec<ActionPayload> {
        self.sent.lock().clone()
    }
}

#[cfg(test)]
impl LaunchSink for RecordingSink {
    fn send_launch(&self, action: ActionPayload) {
        self.sent.lock().push(action);
    }
}
