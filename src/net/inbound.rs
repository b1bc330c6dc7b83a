//! Inbound message buffer
//!
//! The connection reader task pushes decoded room messages into a bounded
//! crossbeam channel; the match task drains everything pending at the start
//! of each tick, so a tick never observes half of a message.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::game::constants::net::INBOUND_CAPACITY;
use crate::net::protocol::RoomMessage;

/// Bounded buffer between the reader task and the match task
pub struct InboundBuffer {
    sender: Sender<RoomMessage>,
    receiver: Receiver<RoomMessage>,
    capacity: usize,
}

impl InboundBuffer {
    /// Create a buffer holding at most `capacity` undrained messages
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            capacity: capacity.max(1),
        }
    }

    /// Clonable handle for the reader side
    pub fn sender(&self) -> InboundSender {
        InboundSender {
            sender: self.sender.clone(),
        }
    }

    /// Submit without blocking. Returns false if the buffer is full.
    #[inline]
    pub fn try_submit(&self, message: RoomMessage) -> bool {
        self.sender.try_send(message).is_ok()
    }

    /// Take every pending message in arrival order
    pub fn drain(&self) -> Vec<RoomMessage> {
        self.receiver.try_iter().collect()
    }

    /// Take the oldest pending message, leaving the rest queued
    #[inline]
    pub fn try_next(&self) -> Option<RoomMessage> {
        self.receiver.try_recv().ok()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InboundBuffer {
    fn default() -> Self {
        Self::new(INBOUND_CAPACITY)
    }
}

impl std::fmt::Debug for InboundBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundBuffer")
            .field("pending", &self.receiver.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Reader-side handle
#[derive(Clone)]
pub struct InboundSender {
    sender: Sender<RoomMessage>,
}

impl InboundSender {
    /// Submit without blocking
    #[inline]
    pub fn try_send(&self, message: RoomMessage) -> Result<(), InboundBufferError> {
        self.sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => InboundBufferError::Full,
            TrySendError::Disconnected(_) => InboundBufferError::Disconnected,
        })
    }
}

/// Inbound buffer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InboundBufferError {
    /// Match task is not keeping up
    #[error("inbound buffer full")]
    Full,
    /// Match task dropped the buffer
    #[error("inbound buffer disconnected")]
    Disconnected,
}
