//! In-process channel membership and fan-out
//!
//! Every registered session owns a bounded queue of encoded frames. A
//! broadcast is encoded once and the resulting `Bytes` is shared by all
//! recipients; only the reference count is cloned.

use std::collections::{HashMap, HashSet};

use bytes::Bytes;
use tokio::sync::{mpsc, RwLock};

use crate::protocol::{self, OutboundEvent};
use crate::registry::TrackerId;

use super::transport::Transport;

/// Default per-session outbound queue length
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;

/// Session queues and channel membership
///
/// Lock order is `channels` then `sessions`. Only a broadcast holds both;
/// every other method takes one lock at a time.
pub struct Rooms {
    /// Outbound queue of each live session
    sessions: RwLock<HashMap<u64, mpsc::Sender<Bytes>>>,

    /// Members of each channel
    channels: RwLock<HashMap<TrackerId, HashSet<u64>>>,

    /// Queue length for newly registered sessions
    outbound_buffer: usize,
}

impl Rooms {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_OUTBOUND_BUFFER)
    }

    pub fn with_buffer(outbound_buffer: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            channels: RwLock::new(HashMap::new()),
            outbound_buffer: outbound_buffer.max(1),
        }
    }

    /// Register a session and return the receiving end of its queue
    ///
    /// Registering an id again replaces the previous queue.
    pub async fn register(&self, session_id: u64) -> mpsc::Receiver<Bytes> {
        let (tx, rx) = mpsc::channel(self.outbound_buffer);
        self.sessions.write().await.insert(session_id, tx);
        rx
    }

    /// Remove a session from every channel and drop its queue
    ///
    /// Returns the number of channels the session left.
    pub async fn unregister(&self, session_id: u64) -> usize {
        self.sessions.write().await.remove(&session_id);

        let mut channels = self.channels.write().await;
        let mut left = 0;
        channels.retain(|_, members| {
            if members.remove(&session_id) {
                left += 1;
            }
            !members.is_empty()
        });

        left
    }

    /// Session ids in a channel, sorted
    pub async fn members(&self, channel: &TrackerId) -> Vec<u64> {
        let channels = self.channels.read().await;
        let mut members: Vec<u64> = channels
            .get(channel)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default();
        members.sort_unstable();
        members
    }

    /// Number of channels with at least one member
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Number of registered sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn deliver(session_id: u64, tx: &mpsc::Sender<Bytes>, frame: Bytes) -> bool {
        match tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(session_id = session_id, "Outbound queue full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(session_id = session_id, "Outbound queue closed");
                false
            }
        }
    }

    fn encode(event: &OutboundEvent) -> Option<Bytes> {
        match protocol::encode(event) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::error!(event = event.name(), error = %e, "Failed to encode event");
                None
            }
        }
    }
}

impl Default for Rooms {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for Rooms {
    async fn subscribe(&self, session_id: u64, channel: &TrackerId) {
        let mut channels = self.channels.write().await;
        let members = channels.entry(channel.clone()).or_default();

        if members.insert(session_id) {
            tracing::debug!(
                session_id = session_id,
                tracker = %channel,
                members = members.len(),
                "Session joined channel"
            );
        }
    }

    async fn emit_to(&self, session_id: u64, event: &OutboundEvent) -> bool {
        let Some(frame) = Self::encode(event) else {
            return false;
        };

        let sessions = self.sessions.read().await;
        match sessions.get(&session_id) {
            Some(tx) => Self::deliver(session_id, tx, frame),
            None => false,
        }
    }

    async fn emit_to_channel(&self, channel: &TrackerId, event: &OutboundEvent) -> usize {
        let channels = self.channels.read().await;
        let Some(members) = channels.get(channel).filter(|m| !m.is_empty()) else {
            return 0;
        };

        let Some(frame) = Self::encode(event) else {
            return 0;
        };

        let sessions = self.sessions.read().await;
        members
            .iter()
            .filter_map(|&id| sessions.get(&id).map(|tx| (id, tx)))
            .filter(|(id, tx)| Self::deliver(*id, tx, frame.clone()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::LocationUpdate;
    use crate::registry::{Location, TrackerState};

    fn id(s: &str) -> TrackerId {
        TrackerId::new(s).unwrap()
    }

    fn event(tracker: &str) -> OutboundEvent {
        let mut state = TrackerState::new();
        state.location = Location::at(1.0, 2.0);
        LocationUpdate::snapshot(&id(tracker), &state).unwrap().into()
    }

    #[tokio::test]
    async fn test_channel_isolation() {
        let rooms = Rooms::new();
        let mut rx1 = rooms.register(1).await;
        let mut rx2 = rooms.register(2).await;
        let mut rx3 = rooms.register(3).await;

        rooms.subscribe(1, &id("abc")).await;
        rooms.subscribe(2, &id("abc")).await;
        rooms.subscribe(3, &id("xyz")).await;

        let delivered = rooms.emit_to_channel(&id("abc"), &event("abc")).await;
        assert_eq!(delivered, 2);

        let a = rx1.try_recv().unwrap();
        let b = rx2.try_recv().unwrap();
        assert_eq!(a, b);
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_emit_to_single_session() {
        let rooms = Rooms::new();
        let mut rx1 = rooms.register(1).await;
        let mut rx2 = rooms.register(2).await;
        rooms.subscribe(1, &id("abc")).await;
        rooms.subscribe(2, &id("abc")).await;

        assert!(rooms.emit_to(2, &event("abc")).await);
        assert!(!rooms.emit_to(99, &event("abc")).await);

        assert!(rx1.try_recv().is_err());
        let frame = rx2.try_recv().unwrap();
        let decoded: OutboundEvent = protocol::decode(&frame[..frame.len() - 1]).unwrap();
        assert_eq!(decoded.name(), "location_update");
    }

    #[tokio::test]
    async fn test_unregister_leaves_channels() {
        let rooms = Rooms::new();
        let _rx1 = rooms.register(1).await;
        let _rx2 = rooms.register(2).await;
        rooms.subscribe(1, &id("a")).await;
        rooms.subscribe(1, &id("b")).await;
        rooms.subscribe(2, &id("b")).await;

        assert_eq!(rooms.unregister(1).await, 2);
        assert_eq!(rooms.members(&id("b")).await, vec![2]);
        assert!(rooms.members(&id("a")).await.is_empty());
        assert_eq!(rooms.channel_count().await, 1);
        assert_eq!(rooms.session_count().await, 1);
        assert_eq!(rooms.emit_to_channel(&id("a"), &event("a")).await, 0);
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let rooms = Rooms::new();
        let mut rx = rooms.register(1).await;
        rooms.subscribe(1, &id("a")).await;
        rooms.subscribe(1, &id("a")).await;

        assert_eq!(rooms.emit_to_channel(&id("a"), &event("a")).await, 1);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_queue_drops() {
        let rooms = Rooms::with_buffer(1);
        let mut rx = rooms.register(1).await;
        rooms.subscribe(1, &id("a")).await;

        assert_eq!(rooms.emit_to_channel(&id("a"), &event("a")).await, 1);
        assert_eq!(rooms.emit_to_channel(&id("a"), &event("a")).await, 0);

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_broadcast_alongside_membership_churn() {
        let rooms = std::sync::Arc::new(Rooms::new());
        let mut rx = rooms.register(0).await;
        rooms.subscribe(0, &id("a")).await;

        let churn = {
            let rooms = std::sync::Arc::clone(&rooms);
            tokio::spawn(async move {
                for session in 1..200u64 {
                    let _rx = rooms.register(session).await;
                    rooms.subscribe(session, &id("a")).await;
                    rooms.unregister(session).await;
                }
            })
        };

        let broadcasts = async {
            for _ in 0..200 {
                let delivered = rooms.emit_to_channel(&id("a"), &event("a")).await;
                // Session 0 always, plus at most the one churning session
                assert!((1..=2).contains(&delivered), "delivered {}", delivered);
                while rx.try_recv().is_ok() {}
            }
        };

        tokio::time::timeout(std::time::Duration::from_secs(5), async move {
            broadcasts.await;
            churn.await.unwrap();
        })
        .await
        .unwrap();

        assert_eq!(rooms.members(&id("a")).await, vec![0]);
        assert_eq!(rooms.session_count().await, 1);
    }
}
