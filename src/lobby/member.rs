use std::time::Instant;

use crate::game::attributes::PlayerAttributes;
use crate::game::state::PlayerId;
use crate::net::connection::ConnectParams;
use crate::net::protocol::{JoinPayload, RoomUser};
use crate::util::vec2::Vec2;

/// Room member before the match starts
#[derive(Debug, Clone, PartialEq)]
pub struct RoomMember {
    pub id: PlayerId,
    pub icon_url: String,
    pub attributes: PlayerAttributes,
    /// Spawn point for the match
    pub point: Vec2,
    pub joined_at: Instant,
}

impl RoomMember {
    pub fn new(id: impl Into<PlayerId>, icon_url: impl Into<String>, attributes: PlayerAttributes, point: Vec2) -> Self {
        Self {
            id: id.into(),
            icon_url: icon_url.into(),
            attributes,
            point,
            joined_at: Instant::now(),
        }
    }

    /// Parameters announcing this member on the room channel
    pub fn connect_params(&self, room_id: impl Into<String>) -> ConnectParams {
        ConnectParams {
            room_id: room_id.into(),
            user_id: self.id.clone(),
            icon_url: self.icon_url.clone(),
            attributes: self.attributes,
            point: self.point,
        }
    }
}

impl From<JoinPayload> for RoomMember {
    fn from(join: JoinPayload) -> Self {
        let attributes = join.attributes();
        let point = join.spawn_point();
        Self::new(join.id, join.icon_url, attributes, point)
    }
}

impl From<RoomUser> for RoomMember {
    fn from(user: RoomUser) -> Self {
        let attributes = user.attributes();
        let point = Vec2::from_point(user.point);
        Self::new(user.user_id, user.icon_url, attributes, point)
    }
}
