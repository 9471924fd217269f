//! Transport seam between the relay and connection handling

use std::future::Future;

use crate::protocol::OutboundEvent;
use crate::registry::TrackerId;

/// Effects the relay needs from the connection layer
///
/// Delivery is best-effort: a slow or departed connection simply misses
/// messages.
pub trait Transport: Send + Sync + 'static {
    /// Add a session to the channel named after `channel`
    fn subscribe(&self, session_id: u64, channel: &TrackerId) -> impl Future<Output = ()> + Send;

    /// Send an event to one session; returns whether it was queued
    fn emit_to(&self, session_id: u64, event: &OutboundEvent) -> impl Future<Output = bool> + Send;

    /// Send an event to every session in `channel`; returns how many were queued
    fn emit_to_channel(
        &self,
        channel: &TrackerId,
        event: &OutboundEvent,
    ) -> impl Future<Output = usize> + Send;
}
