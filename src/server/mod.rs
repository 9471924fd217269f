//! TCP transport for the relay
//!
//! Accepts connections, frames newline-delimited JSON events and hands them
//! to the [`Relay`](crate::relay::Relay).

pub mod config;
mod connection;
pub mod listener;

pub use config::ServerConfig;
pub use listener::RelayServer;
