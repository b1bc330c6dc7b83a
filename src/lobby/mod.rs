//! Waiting room before a match
//!
//! Collects the room roster until the start signal, then builds the match.

pub mod member;
pub mod room;
