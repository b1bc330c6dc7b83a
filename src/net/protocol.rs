//! Room channel wire format
//!
//! Every frame is a JSON envelope `{"type": ..., "message": {...}}`. Decoding
//! happens in two stages: the raw envelope first, then the payload for the
//! recognised type, so a bad payload can be reported against its type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::game::attributes::PlayerAttributes;
use crate::game::constants::net::MAX_MESSAGE_SIZE;
use crate::game::state::PlayerId;
use crate::util::vec2::Vec2;

pub const TYPE_JOIN: &str = "join";
pub const TYPE_LEAVE: &str = "leave";
pub const TYPE_ACTION: &str = "action";
pub const TYPE_START: &str = "start";

/// A player entered the room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinPayload {
    pub id: PlayerId,
    #[serde(default)]
    pub icon_url: String,
    pub power: f32,
    pub weight: f32,
    pub volume: f32,
    /// Launch cooldown in milliseconds
    pub cd: f64,
    pub point: [f32; 2],
}

impl JoinPayload {
    pub fn attributes(&self) -> PlayerAttributes {
        PlayerAttributes::new(self.power, self.weight, self.volume, cooldown_ms(self.cd))
    }

    pub fn spawn_point(&self) -> Vec2 {
        Vec2::from_point(self.point)
    }
}

/// A player left the room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeavePayload {
    pub id: PlayerId,
}

/// A launch, replicated to every client in the room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPayload {
    pub id: PlayerId,
    /// First element is the launch angle in radians
    pub angle: Vec<f32>,
    pub pull_power: f32,
}

impl ActionPayload {
    pub fn launch(id: PlayerId, angle: f32, strength: f32) -> Self {
        Self {
            id,
            angle: vec![angle, 0.0],
            pull_power: strength,
        }
    }

    /// Launch angle. Present on every validated payload.
    pub fn heading(&self) -> f32 {
        self.angle.first().copied().unwrap_or(0.0)
    }
}

/// Decoded room channel message
#[derive(Debug, Clone, PartialEq)]
pub enum RoomMessage {
    Join(JoinPayload),
    Leave(LeavePayload),
    Action(ActionPayload),
    Start,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: Value,
}

/// Protocol errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame of {0} bytes exceeds the message size limit")]
    TooLarge(usize),
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),
    #[error("unknown message type '{0}'")]
    UnknownType(String),
    #[error("malformed '{kind}' payload: {source}")]
    MalformedPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid '{kind}' payload: {reason}")]
    InvalidPayload { kind: &'static str, reason: &'static str },
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),
}

impl RoomMessage {
    /// Wire name of the message type
    pub fn kind(&self) -> &'static str {
        match self {
            RoomMessage::Join(_) => TYPE_JOIN,
            RoomMessage::Leave(_) => TYPE_LEAVE,
            RoomMessage::Action(_) => TYPE_ACTION,
            RoomMessage::Start => TYPE_START,
        }
    }

    /// Encode into a JSON envelope
    pub fn encode(&self) -> Result<String, ProtocolError> {
        let message = match self {
            RoomMessage::Join(p) => serde_json::to_value(p),
            RoomMessage::Leave(p) => serde_json::to_value(p),
            RoomMessage::Action(p) => serde_json::to_value(p),
            RoomMessage::Start => Ok(Value::Object(serde_json::Map::new())),
        }
        .map_err(ProtocolError::Encode)?;

        let envelope = RawEnvelope {
            kind: self.kind().to_string(),
            message,
        };
        serde_json::to_string(&envelope).map_err(ProtocolError::Encode)
    }

    /// Decode and validate a JSON envelope
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        if text.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::TooLarge(text.len()));
        }

        let raw: RawEnvelope = serde_json::from_str(text).map_err(ProtocolError::InvalidEnvelope)?;

        let message = match raw.kind.as_str() {
            TYPE_JOIN => RoomMessage::Join(payload(TYPE_JOIN, raw.message)?),
            TYPE_LEAVE => RoomMessage::Leave(payload(TYPE_LEAVE, raw.message)?),
            TYPE_ACTION => RoomMessage::Action(payload(TYPE_ACTION, raw.message)?),
            // Start carries no payload; whatever is sent along is ignored
            TYPE_START => RoomMessage::Start,
            _ => return Err(ProtocolError::UnknownType(raw.kind)),
        };

        message.validate()?;
        Ok(message)
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        let invalid = |kind, reason| Err(ProtocolError::InvalidPayload { kind, reason });

        match self {
            RoomMessage::Join(p) => {
                if p.id.is_empty() {
                    return invalid(TYPE_JOIN, "empty id");
                }
                let numbers = [p.power, p.weight, p.volume, p.point[0], p.point[1]];
                if numbers.iter().any(|n| !n.is_finite()) || !p.cd.is_finite() {
                    return invalid(TYPE_JOIN, "non-finite number");
                }
            }
            RoomMessage::Leave(p) => {
                if p.id.is_empty() {
                    return invalid(TYPE_LEAVE, "empty id");
                }
            }
            RoomMessage::Action(p) => {
                if p.id.is_empty() {
                    return invalid(TYPE_ACTION, "empty id");
                }
                match p.angle.first() {
                    None => return invalid(TYPE_ACTION, "empty angle"),
                    Some(a) if !a.is_finite() => return invalid(TYPE_ACTION, "non-finite angle"),
                    _ => {}
                }
                if !p.pull_power.is_finite() {
                    return invalid(TYPE_ACTION, "non-finite pull_power");
                }
            }
            RoomMessage::Start => {}
        }
        Ok(())
    }
}

fn payload<T: for<'de> Deserialize<'de>>(kind: &'static str, message: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(message).map_err(|source| ProtocolError::MalformedPayload { kind, source })
}

/// Cooldown from the wire (milliseconds, any JSON number) to whole milliseconds
pub fn cooldown_ms(cd: f64) -> u32 {
    if cd.is_finite() {
        cd.round().clamp(0.0, u32::MAX as f64) as u32
    } else {
        0
    }
}

/// One member of the room membership snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUser {
    pub user_id: PlayerId,
    #[serde(default)]
    pub icon_url: String,
    pub cd: f64,
    pub power: f32,
    pub weight: f32,
    pub volume: f32,
    pub point: [f32; 2],
}

impl RoomUser {
    pub fn attributes(&self) -> PlayerAttributes {
        PlayerAttributes::new(self.power, self.weight, self.volume, cooldown_ms(self.cd))
    }
}

impl From<JoinPayload> for RoomUser {
    fn from(p: JoinPayload) -> Self {
        Self {
            user_id: p.id,
            icon_url: p.icon_url,
            cd: p.cd,
            power: p.power,
            weight: p.weight,
            volume: p.volume,
            point: p.point,
        }
    }
}

/// Room membership snapshot served by the room backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub users: Vec<RoomUser>,
}
