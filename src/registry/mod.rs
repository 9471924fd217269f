//! Tracker registry
//!
//! The registry owns the latest known state of every tracker. The relay
//! reads and writes it only through tracker-scoped operations.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<TrackerRegistry>
//!                  ┌──────────────────────────────┐
//!                  │ trackers: HashMap<TrackerId, │
//!                  │   Arc<RwLock<TrackerState>>  │
//!                  │ >                            │
//!                  └──────────────┬───────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         ▼                       ▼                       ▼
//!   apply_update("a")       apply_update("a")       apply_join("b")
//!   (serialized on a's lock)                        (never waits on "a")
//! ```
//!
//! Records are created on first reference and live for the rest of the
//! process.

pub mod entry;
pub mod key;
pub mod store;

pub use entry::{Location, TrackerState, TrackerUpdate};
pub use key::TrackerId;
pub use store::{TrackerGuard, TrackerRegistry};
