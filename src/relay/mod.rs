//! Broadcast relay
//!
//! Routes inbound events to registry operations and sends the resulting
//! notifications through a [`Transport`]:
//!
//! ```text
//!   join_tracker ──► subscribe(session, tracker) ──► apply_join ──► emit_to(session)
//!   update_location ─────────────────────────────► apply_update ──► emit_to_channel(tracker)
//! ```
//!
//! Channel membership belongs to the transport. [`Rooms`] is the in-process
//! implementation used by the TCP server.

pub mod dispatch;
pub mod rooms;
pub mod transport;

pub use dispatch::{DispatchOutcome, Relay};
pub use rooms::Rooms;
pub use transport::Transport;
