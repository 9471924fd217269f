//! Tracker registry implementation
//!
//! Owns every [`TrackerState`]. Each record sits behind its own lock, so a
//! read-modify-write on one tracker is a single guarded transaction and
//! trackers never wait on each other. The outer map is only write-locked
//! for the brief insert of a tracker seen for the first time.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::device::DeviceInfo;

use super::entry::{TrackerState, TrackerUpdate};
use super::key::TrackerId;

type Entry = Arc<RwLock<TrackerState>>;

/// Exclusive hold on one tracker's record
///
/// Other updates and joins for the same tracker wait until it is dropped.
pub type TrackerGuard = OwnedRwLockWriteGuard<TrackerState>;

/// Central registry of tracker state
pub struct TrackerRegistry {
    /// Map of tracker id to its record
    trackers: RwLock<HashMap<TrackerId, Entry>>,
}

impl TrackerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            trackers: RwLock::new(HashMap::new()),
        }
    }

    /// Return the record for `id`, creating an empty one if needed
    pub async fn get_or_create(&self, id: &TrackerId) -> TrackerState {
        let entry = self.entry(id).await;
        let state = entry.read().await;
        state.clone()
    }

    /// Look up a record without creating it
    pub async fn get(&self, id: &TrackerId) -> Option<TrackerState> {
        let entry = self.trackers.read().await.get(id).cloned()?;
        let state = entry.read().await;
        Some(state.clone())
    }

    /// Merge an update into the record for `id`
    ///
    /// Creates the record if needed and returns it as it stands after the
    /// update, including the incremented `update_count`.
    pub async fn apply_update(&self, id: &TrackerId, update: TrackerUpdate) -> TrackerState {
        let state = self.apply_update_locked(id, update).await;
        state.clone()
    }

    /// Merge an update and keep the record locked
    ///
    /// Whatever the caller does before dropping the guard is ordered with
    /// the update relative to every other update of the same tracker.
    pub async fn apply_update_locked(&self, id: &TrackerId, update: TrackerUpdate) -> TrackerGuard {
        let entry = self.entry(id).await;
        let mut state = entry.write_owned().await;

        state.apply(update);

        tracing::trace!(
            tracker = %id,
            update_count = state.update_count,
            "Update applied"
        );

        state
    }

    /// Record a join: ensure the tracker exists and take the joiner's
    /// device info if it is non-empty
    pub async fn apply_join(&self, id: &TrackerId, device_info: Option<DeviceInfo>) -> TrackerState {
        let state = self.apply_join_locked(id, device_info).await;
        state.clone()
    }

    /// Record a join and keep the record locked
    pub async fn apply_join_locked(
        &self,
        id: &TrackerId,
        device_info: Option<DeviceInfo>,
    ) -> TrackerGuard {
        let entry = self.entry(id).await;
        let mut state = entry.write_owned().await;

        if let Some(info) = device_info {
            if state.replace_device_info(info) {
                tracing::debug!(
                    tracker = %id,
                    device = %state.device_name,
                    "Device info replaced on join"
                );
            }
        }

        state
    }

    /// Number of trackers seen since startup
    pub async fn tracker_count(&self) -> usize {
        self.trackers.read().await.len()
    }

    /// Handle to the record for `id`, inserting an empty one if missing
    ///
    /// The map lock is released before the caller locks the record.
    async fn entry(&self, id: &TrackerId) -> Entry {
        if let Some(entry) = self.trackers.read().await.get(id) {
            return Arc::clone(entry);
        }

        let mut trackers = self.trackers.write().await;
        let entry = trackers.entry(id.clone()).or_insert_with(|| {
            tracing::info!(tracker = %id, "Tracker created");
            Arc::new(RwLock::new(TrackerState::new()))
        });

        Arc::clone(entry)
    }
}

impl Default for TrackerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
