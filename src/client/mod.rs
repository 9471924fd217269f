//! Relay client
//!
//! Connects to a relay server to publish location samples or follow
//! trackers.

pub mod publisher;

pub use publisher::TrackerClient;
