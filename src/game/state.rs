//! Authoritative match state
//!
//! [`GameStateStore`] owns the record of every player, the match status, the
//! winner and the elimination order. It is constructed per match and passed
//! explicitly to whatever needs it. Every mutation synchronously notifies the
//! registered listeners with a typed [`StoreEvent`].

use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::game::attributes::PlayerAttributes;
use crate::util::vec2::Vec2;

/// Unique player identifier, as issued by the room backend
pub type PlayerId = String;

/// Match status. Only ever moves forward, except through a full reset.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Room is filling up
    #[default]
    Waiting,
    /// Match in progress
    Playing,
    /// A single player remains
    Finished,
}

/// Store record for one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub icon: String,
    pub attributes: PlayerAttributes,
    pub position: Vec2,
    pub velocity: Vec2,
    pub is_alive: bool,
    /// False while cooling down or after elimination
    pub is_active: bool,
}

impl PlayerSnapshot {
    pub fn new(id: impl Into<PlayerId>, icon: impl Into<String>, attributes: PlayerAttributes, position: Vec2) -> Self {
        Self {
            id: id.into(),
            icon: icon.into(),
            attributes,
            position,
            velocity: Vec2::ZERO,
            is_alive: true,
            is_active: true,
        }
    }
}

/// Partial update applied by [`GameStateStore::update_player`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerUpdate {
    pub icon: Option<String>,
    pub attributes: Option<PlayerAttributes>,
    pub position: Option<Vec2>,
    pub velocity: Option<Vec2>,
    pub is_alive: Option<bool>,
    pub is_active: Option<bool>,
}

impl PlayerUpdate {
    pub fn motion(position: Vec2, velocity: Vec2) -> Self {
        Self {
            position: Some(position),
            velocity: Some(velocity),
            ..Self::default()
        }
    }

    pub fn active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Self::default()
        }
    }

    pub fn eliminated() -> Self {
        Self {
            velocity: Some(Vec2::ZERO),
            is_alive: Some(false),
            is_active: Some(false),
            ..Self::default()
        }
    }

    pub fn attributes(attributes: PlayerAttributes) -> Self {
        Self {
            attributes: Some(attributes),
            ..Self::default()
        }
    }

    /// Apply onto a snapshot. Returns true if anything changed.
    fn apply_to(self, snapshot: &mut PlayerSnapshot) -> bool {
        let before = snapshot.clone();

        if let Some(icon) = self.icon {
            snapshot.icon = icon;
        }
        if let Some(attributes) = self.attributes {
            snapshot.attributes = attributes;
        }
        if let Some(position) = self.position {
            snapshot.position = position;
        }
        if let Some(velocity) = self.velocity {
            snapshot.velocity = velocity;
        }
        // Elimination is one-way
        if let Some(is_alive) = self.is_alive {
            snapshot.is_alive = snapshot.is_alive && is_alive;
        }
        if let Some(is_active) = self.is_active {
            snapshot.is_active = is_active && snapshot.is_alive;
        }

        *snapshot != before
    }
}

/// Change notification emitted after every store mutation
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    PlayerAdded(PlayerSnapshot),
    PlayerUpdated(PlayerSnapshot),
    PlayerRemoved(PlayerId),
    StatusChanged { from: MatchStatus, to: MatchStatus },
    WinnerDecided(PlayerId),
    /// `order` is the 1-based position in the elimination order
    PlayerEliminated { id: PlayerId, order: usize },
    Reset,
}

/// Store listener. Identity is the `Arc` allocation.
pub type Listener = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

/// Store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("status cannot move from {from:?} back to {to:?}")]
    InvalidTransition { from: MatchStatus, to: MatchStatus },
    #[error("winner already decided: {0}")]
    WinnerAlreadySet(PlayerId),
    #[error("winner can only be set once the match is finished")]
    NotFinished,
    #[error("unknown player: {0}")]
    UnknownPlayer(PlayerId),
}

/// Single authoritative record of one match
#[derive(Default)]
pub struct GameStateStore {
    players: HashMap<PlayerId, PlayerSnapshot>,
    status: MatchStatus,
    winner: Option<PlayerId>,
    elimination_order: Vec<PlayerId>,
    listeners: Vec<Listener>,
}

impl std::fmt::Debug for GameStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameStateStore")
            .field("players", &self.players.len())
            .field("status", &self.status)
            .field("winner", &self.winner)
            .field("elimination_order", &self.elimination_order)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl GameStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    /// Register a listener. Registering the same `Arc` twice is a no-op.
    pub fn subscribe(&mut self, listener: &Listener) -> bool {
        if self.listeners.iter().any(|l| Arc::ptr_eq(l, listener)) {
            return false;
        }
        self.listeners.push(Arc::clone(listener));
        true
    }

    /// Remove a listener. Removing an unknown listener is a no-op.
    pub fn unsubscribe(&mut self, listener: &Listener) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !Arc::ptr_eq(l, listener));
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Dispatch over a snapshot of the listener list. Listeners only get
    /// shared access, so they cannot re-enter a mutation.
    fn emit(&self, event: StoreEvent) {
        let listeners = self.listeners.clone();
        for listener in &listeners {
            listener(&event);
        }
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Add a player. Returns false if the id is already present.
    pub fn add_player(&mut self, snapshot: PlayerSnapshot) -> bool {
        if self.players.contains_key(&snapshot.id) {
            return false;
        }
        self.players.insert(snapshot.id.clone(), snapshot.clone());
        self.emit(StoreEvent::PlayerAdded(snapshot));
        true
    }

    /// Apply a partial update. Unknown ids and no-op updates emit nothing.
    pub fn update_player(&mut self, id: &str, update: PlayerUpdate) -> bool {
        let Some(snapshot) = self.players.get_mut(id) else {
            return false;
        };
        if !update.apply_to(snapshot) {
            return false;
        }
        let updated = snapshot.clone();
        self.emit(StoreEvent::PlayerUpdated(updated));
        true
    }

    pub fn remove_player(&mut self, id: &str) -> Option<PlayerSnapshot> {
        let removed = self.players.remove(id)?;
        self.emit(StoreEvent::PlayerRemoved(removed.id.clone()));
        Some(removed)
    }

    pub fn player(&self, id: &str) -> Option<&PlayerSnapshot> {
        self.players.get(id)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerSnapshot> {
        self.players.values()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.is_alive).count()
    }

    pub fn alive_ids(&self) -> Vec<PlayerId> {
        self.players
            .values()
            .filter(|p| p.is_alive)
            .map(|p| p.id.clone())
            .collect()
    }

    // ------------------------------------------------------------------
    // Match status
    // ------------------------------------------------------------------

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    /// Move the status forward. Same status is a no-op returning `Ok(false)`.
    pub fn set_status(&mut self, status: MatchStatus) -> Result<bool, StoreError> {
        if status == self.status {
            return Ok(false);
        }
        if status < self.status {
            return Err(StoreError::InvalidTransition {
                from: self.status,
                to: status,
            });
        }
        let from = self.status;
        self.status = status;
        self.emit(StoreEvent::StatusChanged { from, to: status });
        Ok(true)
    }

    pub fn winner(&self) -> Option<&PlayerId> {
        self.winner.as_ref()
    }

    /// Decide the winner. Only once, and only after the match finished.
    pub fn set_winner(&mut self, id: &str) -> Result<(), StoreError> {
        if let Some(existing) = &self.winner {
            return Err(StoreError::WinnerAlreadySet(existing.clone()));
        }
        if self.status != MatchStatus::Finished {
            return Err(StoreError::NotFinished);
        }
        if !self.players.contains_key(id) {
            return Err(StoreError::UnknownPlayer(id.to_string()));
        }
        self.winner = Some(id.to_string());
        self.emit(StoreEvent::WinnerDecided(id.to_string()));
        Ok(())
    }

    pub fn elimination_order(&self) -> &[PlayerId] {
        &self.elimination_order
    }

    /// Append to the elimination order. Unknown or already recorded ids are ignored.
    pub fn record_elimination(&mut self, id: &str) -> bool {
        if !self.players.contains_key(id) || self.elimination_order.iter().any(|e| e == id) {
            return false;
        }
        self.elimination_order.push(id.to_string());
        self.emit(StoreEvent::PlayerEliminated {
            id: id.to_string(),
            order: self.elimination_order.len(),
        });
        true
    }

    /// Final standings, best first
    ///
    /// The winner, then players still standing sorted by id, then eliminated
    /// players from last out to first out.
    pub fn rankings(&self) -> Vec<PlayerId> {
        let is_winner = |id: &PlayerId| self.winner.as_ref() == Some(id);
        let mut ranked: Vec<PlayerId> = self.winner.iter().cloned().collect();

        let mut standing: Vec<PlayerId> = self
            .players
            .keys()
            .filter(|id| !is_winner(*id) && !self.elimination_order.contains(*id))
            .cloned()
            .collect();
        standing.sort();
        ranked.extend(standing);

        ranked.extend(
            self.elimination_order
                .iter()
                .rev()
                .filter(|id| !is_winner(*id) && self.players.contains_key(id.as_str()))
                .cloned(),
        );
        ranked
    }

    /// Clear every player and return to `Waiting`. Listeners stay registered.
    pub fn reset_state(&mut self) {
        self.players.clear();
        self.winner = None;
        self.elimination_order.clear();
        self.status = MatchStatus::Waiting;
        self.emit(StoreEvent::Reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn snapshot(id: &str) -> PlayerSnapshot {
        PlayerSnapshot::new(id, format!("https://icons.test/{id}.png"), PlayerAttributes::default(), Vec2::new(100.0, 100.0))
    }

    fn recording_listener() -> (Listener, Arc<Mutex<Vec<StoreEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let listener: Listener = Arc::new(move |event: &StoreEvent| sink.lock().push(event.clone()));
        (listener, events)
    }

    fn create_test_store() -> (GameStateStore, Arc<Mutex<Vec<StoreEvent>>>) {
        let mut store = GameStateStore::new();
        let (listener, events) = recording_listener();
        store.subscribe(&listener);
        (store, events)
    }

    #[test]
    fn test_add_player_emits_event() {
        let (mut store, events) = create_test_store();

        assert!(store.add_player(snapshot("alice")));

        assert_eq!(store.player_count(), 1);
        assert_eq!(events.lock().as_slice(), &[StoreEvent::PlayerAdded(snapshot("alice"))]);
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let (mut store, events) = create_test_store();
        store.add_player(snapshot("alice"));

        assert!(!store.add_player(snapshot("alice")));
        assert_eq!(store.player_count(), 1);
        assert_eq!(events.lock().len(), 1);
    }

    #[test]
    fn test_update_unknown_player_is_noop() {
        let (mut store, events) = create_test_store();

        assert!(!store.update_player("ghost", PlayerUpdate::active(false)));
        assert!(events.lock().is_empty());
    }

    #[test]
    fn test_update_player_partial() {
        let (mut store, events) = create_test_store();
        store.add_player(snapshot("alice"));

        let moved = Vec2::new(120.0, 80.0);
        assert!(store.update_player("alice", PlayerUpdate::motion(moved, Vec2::new(3.0, 0.0))));

        let p = store.player("alice").unwrap();
        assert_eq!(p.position, moved);
        assert!(p.is_alive);
        assert!(matches!(events.lock().last(), Some(StoreEvent::PlayerUpdated(s)) if s.position == moved));
    }

    #[test]
    fn test_unchanged_update_emits_nothing() {
        let (mut store, events) = create_test_store();
        store.add_player(snapshot("alice"));

        assert!(!store.update_player("alice", PlayerUpdate::active(true)));
        assert_eq!(events.lock().len(), 1);
    }

    #[test]
    fn test_elimination_is_one_way() {
        let (mut store, _) = create_test_store();
        store.add_player(snapshot("alice"));
        store.update_player("alice", PlayerUpdate::eliminated());

        let revive = PlayerUpdate {
            is_alive: Some(true),
            is_active: Some(true),
            ..PlayerUpdate::default()
        };
        assert!(!store.update_player("alice", revive));

        let p = store.player("alice").unwrap();
        assert!(!p.is_alive);
        assert!(!p.is_active);
    }

    #[test]
    fn test_remove_player() {
        let (mut store, events) = create_test_store();
        store.add_player(snapshot("alice"));

        assert!(store.remove_player("alice").is_some());
        assert!(store.remove_player("alice").is_none());
        assert_eq!(events.lock().last(), Some(&StoreEvent::PlayerRemoved("alice".to_string())));
    }

    #[test]
    fn test_status_moves_forward_only() {
        let (mut store, events) = create_test_store();
        assert_eq!(store.status(), MatchStatus::Waiting);

        assert_eq!(store.set_status(MatchStatus::Playing), Ok(true));
        assert_eq!(store.set_status(MatchStatus::Playing), Ok(false));
        assert_eq!(
            store.set_status(MatchStatus::Waiting),
            Err(StoreError::InvalidTransition {
                from: MatchStatus::Playing,
                to: MatchStatus::Waiting
            })
        );
        assert_eq!(store.set_status(MatchStatus::Finished), Ok(true));
        assert!(store.set_status(MatchStatus::Playing).is_err());

        let changes = events
            .lock()
            .iter()
            .filter(|e| matches!(e, StoreEvent::StatusChanged { .. }))
            .count();
        assert_eq!(changes, 2);
    }

    #[test]
    fn test_winner_requires_finished() {
        let (mut store, _) = create_test_store();
        store.add_player(snapshot("alice"));
        store.set_status(MatchStatus::Playing).unwrap();

        assert_eq!(store.set_winner("alice"), Err(StoreError::NotFinished));
        assert!(store.winner().is_none());
    }

    #[test]
    fn test_winner_set_once() {
        let (mut store, _) = create_test_store();
        store.add_player(snapshot("alice"));
        store.add_player(snapshot("bob"));
        store.set_status(MatchStatus::Playing).unwrap();
        store.set_status(MatchStatus::Finished).unwrap();

        assert!(store.set_winner("alice").is_ok());
        assert_eq!(
            store.set_winner("bob"),
            Err(StoreError::WinnerAlreadySet("alice".to_string()))
        );
        assert_eq!(store.winner().map(String::as_str), Some("alice"));
    }

    #[test]
    fn test_winner_must_be_known() {
        let (mut store, _) = create_test_store();
        store.set_status(MatchStatus::Finished).unwrap();

        assert_eq!(
            store.set_winner("ghost"),
            Err(StoreError::UnknownPlayer("ghost".to_string()))
        );
    }

    #[test]
    fn test_elimination_order_append_only() {
        let (mut store, events) = create_test_store();
        for id in ["a", "b", "c"] {
            store.add_player(snapshot(id));
        }

        assert!(store.record_elimination("b"));
        assert!(store.record_elimination("a"));
        assert!(!store.record_elimination("b"));
        assert!(!store.record_elimination("ghost"));

        assert_eq!(store.elimination_order(), &["b".to_string(), "a".to_string()]);
        assert!(store.elimination_order().len() <= store.player_count());
        assert_eq!(
            events.lock().last(),
            Some(&StoreEvent::PlayerEliminated {
                id: "a".to_string(),
                order: 2
            })
        );
    }

    #[test]
    fn test_reset_state() {
        let (mut store, events) = create_test_store();
        store.add_player(snapshot("alice"));
        store.set_status(MatchStatus::Finished).unwrap();
        store.set_winner("alice").unwrap();
        store.record_elimination("alice");

        store.reset_state();

        assert_eq!(store.player_count(), 0);
        assert_eq!(store.status(), MatchStatus::Waiting);
        assert!(store.winner().is_none());
        assert!(store.elimination_order().is_empty());
        assert_eq!(store.listener_count(), 1);
        assert_eq!(events.lock().last(), Some(&StoreEvent::Reset));
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let mut store = GameStateStore::new();
        let (listener, events) = recording_listener();

        assert!(store.subscribe(&listener));
        assert!(!store.subscribe(&listener));
        store.add_player(snapshot("alice"));

        assert_eq!(events.lock().len(), 1);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let mut store = GameStateStore::new();
        let (listener, events) = recording_listener();
        store.subscribe(&listener);

        assert!(store.unsubscribe(&listener));
        assert!(!store.unsubscribe(&listener));
        store.add_player(snapshot("alice"));

        assert!(events.lock().is_empty());
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_distinct_listeners_both_notified() {
        let mut store = GameStateStore::new();
        let (first, first_events) = recording_listener();
        let (second, second_events) = recording_listener();
        store.subscribe(&first);
        store.subscribe(&second);

        store.add_player(snapshot("alice"));

        assert_eq!(first_events.lock().len(), 1);
        assert_eq!(second_events.lock().len(), 1);
    }

    #[test]
    fn test_dispatch_follows_subscription_order() {
        let mut store = GameStateStore::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first_log = Arc::clone(&log);
        let second_log = Arc::clone(&log);
        let first: Listener = Arc::new(move |_: &StoreEvent| first_log.lock().push("first"));
        let second: Listener = Arc::new(move |_: &StoreEvent| second_log.lock().push("second"));
        store.subscribe(&first);
        store.subscribe(&second);

        store.add_player(snapshot("alice"));
        assert_eq!(*log.lock(), vec!["first", "second"]);

        store.unsubscribe(&first);
        store.remove_player("alice");
        assert_eq!(*log.lock(), vec!["first", "second", "second"]);
    }

    #[test]
    fn test_rankings_winner_first() {
        let mut store = GameStateStore::new();
        for id in ["a", "b", "c", "d"] {
            store.add_player(snapshot(id));
        }
        store.record_elimination("c");
        store.record_elimination("a");

        // b and d still standing
        assert_eq!(store.rankings(), vec!["b", "d", "a", "c"]);

        store.record_elimination("b");
        store.set_status(MatchStatus::Playing).unwrap();
        store.set_status(MatchStatus::Finished).unwrap();
        store.set_winner("d").unwrap();
        store.record_elimination("d");

        assert_eq!(store.rankings(), vec!["d", "b", "a", "c"]);
    }
}
