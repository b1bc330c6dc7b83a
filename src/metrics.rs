//! Session metrics
//!
//! Counters shared between the connection tasks and the match task. Emitted
//! once as a log summary when the session ends.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

const TICK_HISTORY: usize = 1000;

/// Counters for one client session
#[derive(Debug)]
pub struct SessionMetrics {
    // Network
    pub messages_received: AtomicU64,
    pub messages_sent: AtomicU64,
    /// Frames rejected by the decoder or the full inbound buffer
    pub messages_dropped: AtomicU64,
    pub bytes_received: AtomicU64,
    pub bytes_sent: AtomicU64,

    // Gameplay
    pub launches: AtomicU64,
    pub collisions: AtomicU64,
    pub eliminations: AtomicU64,

    // Tick timing (microseconds)
    pub tick_count: AtomicU64,
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,

    start_time: Instant,
    tick_history: RwLock<VecDeque<u64>>,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub messages_sent: u64,
    pub messages_dropped: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub launches: u64,
    pub collisions: u64,
    pub eliminations: u64,
    pub tick_count: u64,
    pub tick_time_p95_us: u64,
    pub tick_time_max_us: u64,
    pub uptime_seconds: u64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            launches: AtomicU64::new(0),
            collisions: AtomicU64::new(0),
            eliminations: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY)),
        }
    }

    #[inline]
    pub fn record_received(&self, bytes: usize) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sent(&self, bytes: usize) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Record a tick time and update the rolling percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();
            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            self.tick_time_p95_us
                .store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_max_us
                .store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            launches: self.launches.load(Ordering::Relaxed),
            collisions: self.collisions.load(Ordering::Relaxed),
            eliminations: self.eliminations.load(Ordering::Relaxed),
            tick_count: self.tick_count.load(Ordering::Relaxed),
            tick_time_p95_us: self.tick_time_p95_us.load(Ordering::Relaxed),
            tick_time_max_us: self.tick_time_max_us.load(Ordering::Relaxed),
            uptime_seconds: self.uptime_seconds(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_default()
    }

    /// Emit every counter as one structured log line
    pub fn log_summary(&self) {
        let s = self.snapshot();
        info!(
            received = s.messages_received,
            sent = s.messages_sent,
            dropped = s.messages_dropped,
            launches = s.launches,
            collisions = s.collisions,
            eliminations = s.eliminations,
            ticks = s.tick_count,
            tick_p95_us = s.tick_time_p95_us,
            uptime_s = s.uptime_seconds,
            "Session summary"
        );
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}
