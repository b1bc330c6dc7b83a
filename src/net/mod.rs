//! Room channel networking
//!
//! Wire format, the WebSocket connection, the bounded inbound queue and the
//! rules for applying replicated messages.

pub mod connection;
pub mod inbound;
pub mod protocol;
pub mod sync;

#[cfg(feature = "room_api")]
pub mod room_api;
