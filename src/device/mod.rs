//! Device metadata and human-readable device naming
//!
//! Publishers attach an opaque `deviceInfo` object to their events. The relay
//! stores it verbatim and derives a short label (e.g. "iPhone",
//! "Windows Computer") from its `userAgent` and `platform` fields.

pub mod info;
pub mod rules;

pub use info::DeviceInfo;
pub use rules::{derive_device_name, DeviceRule, Matcher, DEVICE_RULES, FALLBACK_NAME, UNKNOWN_DEVICE};
