//! Counters for relay activity

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, updated by the relay as it dispatches events
#[derive(Debug, Default)]
pub struct RelayStats {
    events_received: AtomicU64,
    events_ignored: AtomicU64,
    joins: AtomicU64,
    updates_applied: AtomicU64,
    broadcasts: AtomicU64,
    replies: AtomicU64,
}

/// Point-in-time copy of [`RelayStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStatsSnapshot {
    /// Inbound events handed to the relay
    pub events_received: u64,
    /// Events dropped for lacking a tracker id
    pub events_ignored: u64,
    /// Accepted joins
    pub joins: u64,
    /// Accepted location updates
    pub updates_applied: u64,
    /// Snapshots broadcast to a channel
    pub broadcasts: u64,
    /// Unicast replies to joining connections
    pub replies: u64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ignored(&self) {
        self.events_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_join(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_update(&self) {
        self.updates_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_broadcast(&self) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reply(&self) {
        self.replies.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters
    pub fn snapshot(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_ignored: self.events_ignored.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            updates_applied: self.updates_applied.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            replies: self.replies.load(Ordering::Relaxed),
        }
    }
}
