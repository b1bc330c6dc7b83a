//! Match result and ranking
//!
//! Computes the final standings from the store once a match is over.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::game::state::{GameStateStore, PlayerId};

/// Reason why the match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchEndReason {
    /// Only one player remaining
    LastPlayerStanding,
    /// Room channel closed before a winner was decided
    ConnectionLost,
    /// Stopped locally
    Cancelled,
}

/// Player ranking in match results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRanking {
    pub player_id: PlayerId,
    /// 1-based
    pub rank: u32,
    pub survived: bool,
    pub is_local: bool,
}

/// Match result information
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub winner: Option<PlayerId>,
    pub rankings: Vec<PlayerRanking>,
    /// Rank of the local player, if still in the room
    pub placement: Option<u32>,
    pub duration_secs: f32,
    pub ended_at: DateTime<Utc>,
    pub reason: MatchEndReason,
}

impl MatchResult {
    pub fn is_local_winner(&self) -> bool {
        self.placement == Some(1) && self.winner.is_some()
    }
}

/// Determine the match result from the store
///
/// Rankings follow [`GameStateStore::rankings`]: the winner, then anyone still
/// standing, then the eliminated players from last out to first out.
pub fn determine_result(
    store: &GameStateStore,
    local_id: &str,
    duration: Duration,
    reason: MatchEndReason,
) -> MatchResult {
    let rankings: Vec<PlayerRanking> = store
        .rankings()
        .into_iter()
        .enumerate()
        .map(|(i, player_id)| PlayerRanking {
            rank: (i + 1) as u32,
            survived: store.player(&player_id).map_or(false, |p| p.is_alive),
            is_local: player_id == local_id,
            player_id,
        })
        .collect();

    let placement = rankings.iter().find(|r| r.is_local).map(|r| r.rank);

    MatchResult {
        winner: store.winner().cloned(),
        rankings,
        placement,
        duration_secs: duration.as_secs_f32(),
        ended_at: Utc::now(),
        reason,
    }
}
