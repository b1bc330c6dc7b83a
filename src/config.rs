use thiserror::Error;

use crate::game::attributes::PlayerAttributes;
use crate::game::constants::{defaults, field, net, physics};
use crate::game::status::{derive_status, ReputationStats};
use crate::game::systems::arena::Field;
use crate::util::vec2::Vec2;

const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8787/ws";
const MAX_TICK_RATE: u32 = 240;

/// How local launches reach the rest of the room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaunchTransport {
    /// Over the room channel itself
    #[default]
    Socket,
    /// POSTed to the room backend
    Http,
}

impl std::str::FromStr for LaunchTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "socket" | "ws" => Ok(Self::Socket),
            "http" => Ok(Self::Http),
            other => Err(format!("unknown launch transport '{other}'")),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required variable {0}")]
    Missing(&'static str),

    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Headless client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub room_id: String,
    pub user_id: String,
    /// Room channel endpoint
    pub ws_url: String,
    /// Room backend base URL, if there is one
    pub api_url: Option<String>,
    pub icon_url: String,
    pub attributes: PlayerAttributes,
    /// Fixed spawn point. Random inside the field when unset.
    pub spawn: Option<Vec2>,
    pub field: Field,
    pub tick_rate: u32,
    pub launch_transport: LaunchTransport,
    pub inbound_capacity: usize,
}

impl ClientConfig {
    /// Defaults for everything but the identity
    pub fn new(room_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            user_id: user_id.into(),
            ws_url: DEFAULT_WS_URL.to_string(),
            api_url: None,
            icon_url: String::new(),
            attributes: PlayerAttributes::default(),
            spawn: None,
            field: Field::default(),
            tick_rate: physics::TICK_RATE,
            launch_transport: LaunchTransport::Socket,
            inbound_capacity: net::INBOUND_CAPACITY,
        }
    }

    /// Load config from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config through `lookup`. Bad optional values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let room_id = lookup("ROOM_ID")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("ROOM_ID"))?;
        let user_id = lookup("USER_ID")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("USER_ID"))?;

        let mut config = Self::new(room_id, user_id);

        if let Some(url) = lookup("ROOM_WS_URL") {
            config.ws_url = url;
        }
        config.api_url = lookup("ROOM_API_URL").filter(|v| !v.trim().is_empty());
        if let Some(icon) = lookup("ICON_URL") {
            config.icon_url = icon;
        }

        let power = parse_or(&lookup, "POWER", defaults::POWER);
        let weight = parse_or(&lookup, "WEIGHT", defaults::WEIGHT);
        let volume = parse_or(&lookup, "VOLUME", defaults::VOLUME);
        let cooldown_ms = parse_or(&lookup, "COOLDOWN_MS", defaults::COOLDOWN_MS);
        config.attributes = PlayerAttributes::new(power, weight, volume, cooldown_ms);

        // Raw activity numbers take precedence over explicit stats
        if let Some(stats) = reputation(&lookup) {
            config.attributes = derive_status(Some(&stats));
            tracing::info!(
                power = config.attributes.power,
                weight = config.attributes.weight,
                cd = config.attributes.cooldown_ms,
                "Attributes derived from reputation"
            );
        }

        match (parse_opt::<f32, _>(&lookup, "SPAWN_X"), parse_opt::<f32, _>(&lookup, "SPAWN_Y")) {
            (Some(x), Some(y)) => config.spawn = Some(Vec2::new(x, y)),
            (None, None) => {}
            _ => tracing::warn!("SPAWN_X and SPAWN_Y must be set together, using a random spawn point"),
        }

        let width = parse_or(&lookup, "FIELD_WIDTH", field::WIDTH);
        let height = parse_or(&lookup, "FIELD_HEIGHT", field::HEIGHT);
        if width > 0.0 && height > 0.0 {
            config.field = Field::new(width, height);
        } else {
            tracing::warn!("Field size must be positive, using default");
        }

        let tick_rate = parse_or(&lookup, "TICK_RATE", physics::TICK_RATE);
        if (1..=MAX_TICK_RATE).contains(&tick_rate) {
            config.tick_rate = tick_rate;
        } else {
            tracing::warn!("TICK_RATE must be 1-{}, using default", MAX_TICK_RATE);
        }

        config.launch_transport = parse_or(&lookup, "LAUNCH_TRANSPORT", LaunchTransport::Socket);

        let capacity = parse_or(&lookup, "INBOUND_CAPACITY", net::INBOUND_CAPACITY);
        if capacity > 0 {
            config.inbound_capacity = capacity;
        } else {
            tracing::warn!("INBOUND_CAPACITY must be > 0, using default");
        }

        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.room_id.trim().is_empty() {
            return Err(ConfigError::Missing("ROOM_ID"));
        }
        if self.user_id.trim().is_empty() {
            return Err(ConfigError::Missing("USER_ID"));
        }
        if url::Url::parse(&self.ws_url).is_err() {
            return Err(ConfigError::Invalid {
                key: "ROOM_WS_URL",
                reason: format!("'{}' is not a URL", self.ws_url),
            });
        }
        if self.tick_rate == 0 || self.tick_rate > MAX_TICK_RATE {
            return Err(ConfigError::Invalid {
                key: "TICK_RATE",
                reason: format!("must be 1-{MAX_TICK_RATE}"),
            });
        }
        if self.field.width <= 0.0 || self.field.height <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "FIELD_WIDTH",
                reason: "field must have a positive size".to_string(),
            });
        }
        if let Some(spawn) = self.spawn {
            if !self.field.contains_point(spawn) {
                return Err(ConfigError::Invalid {
                    key: "SPAWN_X",
                    reason: format!("spawn point ({}, {}) is outside the field", spawn.x, spawn.y),
                });
            }
        }
        if self.inbound_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "INBOUND_CAPACITY",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.launch_transport == LaunchTransport::Http && self.api_url.is_none() {
            return Err(ConfigError::Invalid {
                key: "LAUNCH_TRANSPORT",
                reason: "http transport needs ROOM_API_URL".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_opt<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} '{}', ignoring", key, raw);
            None
        }
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    parse_opt(lookup, key).unwrap_or(default)
}

/// Reputation stats, present when any `REPUTATION_*` variable is set
fn reputation<F>(lookup: &F) -> Option<ReputationStats>
where
    F: Fn(&str) -> Option<String>,
{
    const KEYS: [&str; 5] = [
        "REPUTATION_CONTRIBUTIONS",
        "REPUTATION_STREAK",
        "REPUTATION_COMMIT_DAYS",
        "REPUTATION_PRS",
        "REPUTATION_ISSUES",
    ];
    if KEYS.iter().all(|key| lookup(key).is_none()) {
        return None;
    }

    Some(ReputationStats {
        contribution_count: parse_or(lookup, KEYS[0], 0),
        commit_streak: parse_or(lookup, KEYS[1], 0),
        commit_days: parse_or(lookup, KEYS[2], 0),
        total_pull_request_contributions: parse_or(lookup, KEYS[3], 0),
        total_issue_contributions: parse_or(lookup, KEYS[4], 0),
    })
}
