//! Real-time location relay
//!
//! Publishers push geolocation samples tagged with a tracker id; subscribers
//! join that tracker's channel and receive live updates.
//!
//! - [`registry`] keeps the latest known state of every tracker, with one
//!   lock per tracker.
//! - [`relay`] routes `join_tracker` / `update_location` events to the
//!   registry and fans `location_update` notifications out to channels.
//! - [`device`] derives a readable device name from publisher metadata.
//! - [`server`] and [`client`] speak newline-delimited JSON over TCP.
//!
//! # Example
//! ```no_run
//! use tracker_relay::{RelayServer, ServerConfig};
//!
//! # async fn run() -> tracker_relay::error::Result<()> {
//! let server = RelayServer::new(ServerConfig::from_env()?);
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }).await
//! # }
//! ```

pub mod client;
pub mod device;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod server;
pub mod session;
pub mod stats;

pub use client::TrackerClient;
pub use error::{Error, Result};
pub use registry::{TrackerId, TrackerRegistry, TrackerState};
pub use relay::{Relay, Rooms, Transport};
pub use server::{RelayServer, ServerConfig};
