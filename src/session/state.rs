//! Per-connection counters
//!
//! Tracks what a connection has done between accept and close.

use std::collections::BTreeSet;

use crate::registry::TrackerId;

/// Mutable per-connection state, owned by the connection task
#[derive(Debug, Default)]
pub struct SessionState {
    /// Frames read from the socket
    pub frames_received: u64,

    /// Frames dropped as undecodable or oversized
    pub frames_dropped: u64,

    /// Frames written to the socket
    pub frames_sent: u64,

    /// Trackers this session has joined
    pub joined: BTreeSet<TrackerId>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a joined tracker; returns false if already joined
    pub fn on_join(&mut self, tracker: TrackerId) -> bool {
        self.joined.insert(tracker)
    }
}
