//! Event dispatch
//!
//! The relay owns no state of its own beyond counters: tracker state lives
//! in the [`TrackerRegistry`], channel membership in the [`Transport`].

use std::sync::Arc;

use crate::protocol::{InboundEvent, JoinTracker, LocationUpdate, UpdateLocation};
use crate::registry::{TrackerId, TrackerRegistry};
use crate::session::SessionContext;
use crate::stats::RelayStats;

use super::transport::Transport;

/// What the relay did with an inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Event had no usable tracker id and was dropped
    Ignored,
    /// Session joined a tracker's channel
    Joined {
        tracker: TrackerId,
        /// Whether the last known location was sent back
        replied: bool,
    },
    /// Location update was applied
    Updated {
        tracker: TrackerId,
        /// Sessions reached by the broadcast, `None` if coordinates were incomplete
        delivered: Option<usize>,
    },
}

/// Routes inbound events to the registry and fans out the results
pub struct Relay<T: Transport> {
    registry: Arc<TrackerRegistry>,
    transport: Arc<T>,
    stats: RelayStats,
}

impl<T: Transport> Relay<T> {
    /// Create a relay over a registry and transport
    pub fn new(registry: Arc<TrackerRegistry>, transport: Arc<T>) -> Self {
        Self {
            registry,
            transport,
            stats: RelayStats::new(),
        }
    }

    /// Get a reference to the tracker registry
    pub fn registry(&self) -> &Arc<TrackerRegistry> {
        &self.registry
    }

    /// Get a reference to the transport
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Get dispatch counters
    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    /// A connection was accepted
    pub fn on_connect(&self, ctx: &SessionContext) {
        tracing::info!(
            session_id = ctx.session_id,
            peer = %ctx.peer_addr,
            "Client connected"
        );
    }

    /// A connection went away
    ///
    /// Channel membership is cleaned up by the transport; tracker state is
    /// left untouched.
    pub fn on_disconnect(&self, ctx: &SessionContext) {
        tracing::info!(
            session_id = ctx.session_id,
            peer = %ctx.peer_addr,
            duration_ms = ctx.duration().as_millis() as u64,
            "Client disconnected"
        );
    }

    /// Handle one inbound event from `session_id`
    pub async fn dispatch(&self, session_id: u64, event: InboundEvent) -> DispatchOutcome {
        self.stats.record_received();

        match event {
            InboundEvent::JoinTracker(join) => self.join(session_id, join).await,
            InboundEvent::UpdateLocation(update) => self.update_location(session_id, update).await,
        }
    }

    /// Subscribe a session to a tracker and send it the last known location
    pub async fn join(&self, session_id: u64, join: JoinTracker) -> DispatchOutcome {
        let Some((tracker, device_info)) = join.into_parts() else {
            return self.ignore(session_id, "join_tracker");
        };

        self.transport.subscribe(session_id, &tracker).await;
        let state = self.registry.apply_join_locked(&tracker, device_info).await;
        self.stats.record_join();

        tracing::info!(
            session_id = session_id,
            tracker = %tracker,
            "Client joined tracker"
        );

        let replied = match LocationUpdate::join_reply(&tracker, &state) {
            Some(reply) => {
                let sent = self.transport.emit_to(session_id, &reply.into()).await;
                if sent {
                    self.stats.record_reply();
                }
                sent
            }
            None => false,
        };
        // No broadcast for this tracker can run until the reply is queued
        drop(state);

        DispatchOutcome::Joined { tracker, replied }
    }

    /// Apply a location update and broadcast the snapshot to the channel
    ///
    /// The tracker stays locked until the snapshot is queued, so subscribers
    /// see snapshots in the order the updates were applied.
    pub async fn update_location(&self, session_id: u64, update: UpdateLocation) -> DispatchOutcome {
        let Some((tracker, update)) = update.into_parts() else {
            return self.ignore(session_id, "update_location");
        };

        let state = self.registry.apply_update_locked(&tracker, update).await;
        self.stats.record_update();

        let Some(snapshot) = LocationUpdate::snapshot(&tracker, &state) else {
            tracing::debug!(
                session_id = session_id,
                tracker = %tracker,
                update_count = state.update_count,
                "Update stored without complete coordinates"
            );
            return DispatchOutcome::Updated {
                tracker,
                delivered: None,
            };
        };

        tracing::debug!(
            tracker = %tracker,
            lat = snapshot.lat,
            lng = snapshot.lng,
            accuracy = ?snapshot.accuracy,
            update_count = state.update_count,
            "Location update"
        );

        let delivered = self
            .transport
            .emit_to_channel(&tracker, &snapshot.into())
            .await;
        drop(state);
        self.stats.record_broadcast();

        DispatchOutcome::Updated {
            tracker,
            delivered: Some(delivered),
        }
    }

    fn ignore(&self, session_id: u64, event: &'static str) -> DispatchOutcome {
        self.stats.record_ignored();
        tracing::debug!(
            session_id = session_id,
            event = event,
            "Ignoring event without tracker id"
        );
        DispatchOutcome::Ignored
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::device::DeviceInfo;
    use crate::protocol::{self, OutboundEvent};
    use crate::relay::Rooms;

    /// Records every transport call; every session is reachable
    #[derive(Default)]
    struct RecordingTransport {
        subscriptions: Mutex<Vec<(u64, String)>>,
        unicasts: Mutex<Vec<(u64, OutboundEvent)>>,
        broadcasts: Mutex<Vec<(String, OutboundEvent)>>,
    }

    impl Transport for RecordingTransport {
        async fn subscribe(&self, session_id: u64, channel: &TrackerId) {
            self.subscriptions
                .lock()
                .unwrap()
                .push((session_id, channel.to_string()));
        }

        async fn emit_to(&self, session_id: u64, event: &OutboundEvent) -> bool {
            self.unicasts
                .lock()
                .unwrap()
                .push((session_id, event.clone()));
            true
        }

        async fn emit_to_channel(&self, channel: &TrackerId, event: &OutboundEvent) -> usize {
            self.broadcasts
                .lock()
                .unwrap()
                .push((channel.to_string(), event.clone()));
            1
        }
    }

    /// Holds back the broadcast of one latitude to widen the race window
    struct SlowTransport {
        slow_lat: f64,
        broadcast_lats: Mutex<Vec<f64>>,
    }

    impl Transport for SlowTransport {
        async fn subscribe(&self, _session_id: u64, _channel: &TrackerId) {}

        async fn emit_to(&self, _session_id: u64, _event: &OutboundEvent) -> bool {
            true
        }

        async fn emit_to_channel(&self, _channel: &TrackerId, event: &OutboundEvent) -> usize {
            let OutboundEvent::LocationUpdate(update) = event;
            if update.lat == self.slow_lat {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.broadcast_lats.lock().unwrap().push(update.lat);
            1
        }
    }

    fn recording_relay() -> Relay<RecordingTransport> {
        Relay::new(
            Arc::new(TrackerRegistry::new()),
            Arc::new(RecordingTransport::default()),
        )
    }

    fn tracker(s: &str) -> TrackerId {
        TrackerId::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_events_ignored() {
        let relay = recording_relay();

        let outcome = relay.join(1, JoinTracker::default()).await;
        assert_eq!(outcome, DispatchOutcome::Ignored);
        let outcome = relay.join(1, JoinTracker::new("")).await;
        assert_eq!(outcome, DispatchOutcome::Ignored);
        let outcome = relay
            .update_location(1, UpdateLocation::default().at(1.0, 2.0))
            .await;
        assert_eq!(outcome, DispatchOutcome::Ignored);

        assert_eq!(relay.registry().tracker_count().await, 0);
        assert!(relay.transport().subscriptions.lock().unwrap().is_empty());
        assert!(relay.transport().broadcasts.lock().unwrap().is_empty());
        assert_eq!(relay.stats().snapshot().events_ignored, 3);
    }

    #[tokio::test]
    async fn test_join_without_location_no_reply() {
        let relay = recording_relay();

        let outcome = relay.join(7, JoinTracker::new("abc")).await;
        assert_eq!(
            outcome,
            DispatchOutcome::Joined {
                tracker: tracker("abc"),
                replied: false
            }
        );

        assert_eq!(
            *relay.transport().subscriptions.lock().unwrap(),
            vec![(7, "abc".to_string())]
        );
        assert!(relay.transport().unicasts.lock().unwrap().is_empty());
        assert!(relay.registry().get(&tracker("abc")).await.is_some());
    }

    #[tokio::test]
    async fn test_join_with_location_replies_once() {
        let relay = recording_relay();
        relay
            .update_location(1, UpdateLocation::new("abc").at(1.0, 2.0).accuracy(5.0))
            .await;

        let outcome = relay.join(2, JoinTracker::new("abc")).await;
        assert!(matches!(outcome, DispatchOutcome::Joined { replied: true, .. }));

        let unicasts = relay.transport().unicasts.lock().unwrap();
        assert_eq!(unicasts.len(), 1);
        assert_eq!(unicasts[0].0, 2);
    }

    #[tokio::test]
    async fn test_join_replaces_device_info() {
        let relay = recording_relay();
        let info = DeviceInfo::new()
            .with("userAgent", "Mozilla/5.0 (Linux; Android 14; Pixel 8) Mobile")
            .with("platform", "Linux armv8l");

        relay
            .join(1, JoinTracker::new("abc").device_info(info.clone()))
            .await;
        relay
            .join(2, JoinTracker::new("abc").device_info(DeviceInfo::new()))
            .await;

        let state = relay.registry().get(&tracker("abc")).await.unwrap();
        assert_eq!(state.device_info, info);
        assert_eq!(state.device_name, "Google Pixel");
        assert_eq!(state.update_count, 0);
    }

    #[tokio::test]
    async fn test_incomplete_update_stored_not_broadcast() {
        let relay = recording_relay();

        let mut update = UpdateLocation::new("abc").alias("Van");
        update.lat = Some(1.0);
        let outcome = relay.update_location(1, update).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Updated {
                tracker: tracker("abc"),
                delivered: None
            }
        );
        assert!(relay.transport().broadcasts.lock().unwrap().is_empty());

        let state = relay.registry().get(&tracker("abc")).await.unwrap();
        assert_eq!(state.update_count, 1);
        assert_eq!(state.alias.as_deref(), Some("Van"));
    }

    #[tokio::test]
    async fn test_complete_update_broadcasts_snapshot() {
        let relay = recording_relay();
        relay
            .update_location(1, UpdateLocation::new("abc").alias("Van"))
            .await;
        relay
            .update_location(
                1,
                UpdateLocation::new("abc")
                    .at(52.5, 13.4)
                    .speed(12.0)
                    .timestamp(1700000000000u64),
            )
            .await;

        let broadcasts = relay.transport().broadcasts.lock().unwrap();
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(broadcasts[0].0, "abc");

        let value = serde_json::to_value(&broadcasts[0].1).unwrap();
        assert_eq!(value["data"]["lat"], json!(52.5));
        assert_eq!(value["data"]["speed"], json!(12.0));
        assert_eq!(value["data"]["alias"], json!("Van"));
        assert_eq!(value["data"]["platform"], json!("Unknown device"));
    }

    #[tokio::test]
    async fn test_update_count_matches_accepted_updates() {
        let relay = recording_relay();

        for i in 0..10 {
            let update = if i % 3 == 0 {
                UpdateLocation::new("t")
            } else {
                UpdateLocation::new("t").at(i as f64, i as f64)
            };
            relay.update_location(1, update).await;
        }
        // Ignored events do not count
        relay.update_location(1, UpdateLocation::default()).await;

        let state = relay.registry().get(&tracker("t")).await.unwrap();
        assert_eq!(state.update_count, 10);
        assert_eq!(relay.stats().snapshot().updates_applied, 10);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_channel_only() {
        let rooms = Arc::new(Rooms::new());
        let relay = Relay::new(Arc::new(TrackerRegistry::new()), Arc::clone(&rooms));

        let mut rx1 = rooms.register(1).await;
        let mut rx2 = rooms.register(2).await;
        let mut rx3 = rooms.register(3).await;
        let _rx4 = rooms.register(4).await;

        relay.join(1, JoinTracker::new("abc")).await;
        relay.join(2, JoinTracker::new("abc")).await;
        relay.join(3, JoinTracker::new("xyz")).await;

        // Sender is not a member
        let outcome = relay
            .update_location(4, UpdateLocation::new("abc").at(1.0, 2.0))
            .await;
        assert!(matches!(
            outcome,
            DispatchOutcome::Updated {
                delivered: Some(2),
                ..
            }
        ));
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
        assert!(rx3.try_recv().is_err());

        // Sender is a member and receives its own update
        relay
            .update_location(1, UpdateLocation::new("abc").at(1.5, 2.5))
            .await;
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_update_then_join_end_to_end() {
        let rooms = Arc::new(Rooms::new());
        let relay = Relay::new(Arc::new(TrackerRegistry::new()), Arc::clone(&rooms));
        let mut rx = rooms.register(9).await;

        relay
            .update_location(1, UpdateLocation::new("t1").at(1.0, 2.0).accuracy(5.0))
            .await;
        relay.join(9, JoinTracker::new("t1")).await;

        let frame = rx.try_recv().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&frame).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "location_update",
                "data": {
                    "tracker_id": "t1",
                    "lat": 1.0,
                    "lng": 2.0,
                    "accuracy": 5.0,
                    "device_info": {},
                    "platform": "Unknown device"
                }
            })
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_broadcast_order_follows_update_order() {
        let relay = Arc::new(Relay::new(
            Arc::new(TrackerRegistry::new()),
            Arc::new(SlowTransport {
                slow_lat: 1.0,
                broadcast_lats: Mutex::new(Vec::new()),
            }),
        ));

        let first = {
            let relay = Arc::clone(&relay);
            tokio::spawn(async move {
                relay
                    .update_location(1, UpdateLocation::new("t").at(1.0, 1.0))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = {
            let relay = Arc::clone(&relay);
            tokio::spawn(async move {
                relay
                    .update_location(1, UpdateLocation::new("t").at(2.0, 2.0))
                    .await
            })
        };
        first.await.unwrap();
        second.await.unwrap();

        let stored = relay.registry().get(&tracker("t")).await.unwrap();
        let lats = relay.transport().broadcast_lats.lock().unwrap().clone();
        assert_eq!(lats, vec![1.0, 2.0]);
        assert_eq!(stored.location.latitude, lats.last().copied());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_join_reply_not_older_than_broadcast() {
        let rooms = Arc::new(Rooms::new());
        let relay = Arc::new(Relay::new(Arc::new(TrackerRegistry::new()), Arc::clone(&rooms)));
        let mut rx = rooms.register(9).await;

        for round in 0..20 {
            let lat = round as f64;
            let updater = {
                let relay = Arc::clone(&relay);
                tokio::spawn(async move {
                    relay
                        .update_location(1, UpdateLocation::new("t").at(lat, lat))
                        .await
                })
            };
            relay.join(9, JoinTracker::new("t")).await;
            updater.await.unwrap();

            // Whatever arrived this round, the last frame carries the newest fix
            let mut last = None;
            while let Ok(frame) = rx.try_recv() {
                let event: OutboundEvent = protocol::decode(&frame[..frame.len() - 1]).unwrap();
                let OutboundEvent::LocationUpdate(update) = event;
                last = Some(update.lat);
            }
            assert_eq!(last, Some(lat));
        }
    }
}
