/// Simulation timing constants
pub mod physics {
    /// Client tick rate in Hz
    pub const TICK_RATE: u32 = 60;
    /// Delta time per tick in seconds
    pub const DT: f32 = 1.0 / 60.0;
    /// Speeds below this snap to zero (damping never reaches zero on its own)
    pub const STOP_SPEED: f32 = 0.01;
}

/// Attribute-to-physics mapping. Attribute inputs live on a 0..=100 scale.
pub mod attributes {
    /// Upper bound of the attribute scale
    pub const MAX_STAT: f32 = 100.0;
    /// Mass of a weightless player
    pub const BASE_MASS: f32 = 1.0;
    /// Mass added at full weight
    pub const MASS_RANGE: f32 = 4.0;
    /// Share of friction contributed by lightness
    pub const FRICTION_WEIGHT_SHARE: f32 = 0.7;
    /// Share of friction contributed by volume
    pub const FRICTION_VOLUME_SHARE: f32 = 0.3;
    /// Drag coefficient floor
    pub const BASE_DRAG: f32 = 0.05;
    /// Drag coefficient added at full friction
    pub const DRAG_RANGE: f32 = 0.15;
    /// Bounce of a weightless player
    pub const BASE_BOUNCE: f32 = 0.3;
    /// Bounce removed at full weight
    pub const BOUNCE_RANGE: f32 = 0.2;
    /// Radius of a zero-volume player
    pub const BASE_RADIUS: f32 = 10.0;
    /// Radius added at full volume
    pub const RADIUS_RANGE: f32 = 30.0;
}

/// Drag-to-launch constants
pub mod launch {
    /// Drag distance beyond which strength stops growing
    pub const MAX_DRAG_DISTANCE: f32 = 500.0;
    /// Power at which strength equals drag distance
    pub const POWER_REFERENCE: f32 = 50.0;
}

/// Collision impact constants
pub mod collision {
    /// Global damping on transferred impact
    pub const IMPACT_DAMPING: f32 = 0.9;
    /// Share of the impact pushed back onto the attacker
    pub const RECOIL_RATIO: f32 = 0.3;
    /// Mass effect used when both weights are zero
    pub const EQUAL_MASS_EFFECT: f32 = 0.5;
}

/// Field geometry
pub mod field {
    /// Playable field width
    pub const WIDTH: f32 = 600.0;
    /// Playable field height
    pub const HEIGHT: f32 = 400.0;
    /// Distance from the edge kept clear when picking spawn points
    pub const SPAWN_MARGIN: f32 = 40.0;
}

/// Networking constants
pub mod net {
    /// Default inbound message queue capacity
    pub const INBOUND_CAPACITY: usize = 1024;
    /// Frames larger than this are dropped unread
    pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;
    /// Waiting room poll interval in milliseconds
    pub const LOBBY_POLL_MS: u64 = 50;
}

/// Default player attributes when none are configured
pub mod defaults {
    pub const POWER: f32 = 50.0;
    pub const WEIGHT: f32 = 50.0;
    pub const VOLUME: f32 = 50.0;
    pub const COOLDOWN_MS: u32 = 2000;
}
