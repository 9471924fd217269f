//! Wire protocol
//!
//! Connections exchange newline-delimited JSON frames. Every frame is an
//! envelope naming the event and carrying its payload:
//!
//! ```text
//! {"event":"join_tracker","data":{"tracker_id":"abc","deviceInfo":{...}}}
//! {"event":"update_location","data":{"tracker_id":"abc","lat":52.5,"lng":13.4}}
//! {"event":"location_update","data":{"tracker_id":"abc","lat":52.5,...}}
//! ```
//!
//! Payload decoding is lenient: a field of the wrong JSON type reads as
//! absent instead of failing the whole event.

pub mod codec;
pub mod event;
pub mod lenient;
pub mod message;

pub use codec::{decode, encode, FrameDecoder, FrameReader, DEFAULT_MAX_FRAME_LEN};
pub use event::{InboundEvent, JoinTracker, UpdateLocation};
pub use message::{LocationUpdate, OutboundEvent, SnapshotDetails};
