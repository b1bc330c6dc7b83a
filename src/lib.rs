//! Sumo Battle Core
//!
//! Client-side core of a multiplayer sumo game: players launch themselves by
//! dragging, knock each other around, and drop out once they leave the field.
//! Every client simulates the whole room and replicates launches over a
//! shared room channel.
//!
//! # Features
//!
//! - `room_api` - HTTP calls to the room backend: roster snapshot, launches over HTTP, start trigger (enabled by default)

pub mod config;
pub mod game;
pub mod lobby;
pub mod metrics;
pub mod net;
pub mod util;
