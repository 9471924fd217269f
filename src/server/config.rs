//! Server configuration

use std::net::SocketAddr;

use crate::error::{Error, Result};
use crate::protocol::DEFAULT_MAX_FRAME_LEN;
use crate::relay::rooms::DEFAULT_OUTBOUND_BUFFER;

/// Default listening port
pub const DEFAULT_PORT: u16 = 5000;

/// Environment variable overriding the listening port
pub const PORT_ENV: &str = "PORT";

/// Environment variable overriding the full bind address
pub const BIND_ADDR_ENV: &str = "RELAY_BIND_ADDR";

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Longest accepted inbound frame in bytes
    pub max_frame_len: usize,

    /// Outbound frames queued per connection before messages are dropped
    pub outbound_buffer: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_connections: 0, // Unlimited
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            tcp_nodelay: true, // Location updates are small and latency-sensitive
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Build a config from the process environment
    ///
    /// `RELAY_BIND_ADDR` sets the full address; otherwise `PORT` sets the
    /// port on all interfaces.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup(BIND_ADDR_ENV) {
            config.bind_addr = addr
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{}={:?} is not a socket address", BIND_ADDR_ENV, addr)))?;
        } else if let Some(port) = lookup(PORT_ENV) {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{}={:?} is not a port number", PORT_ENV, port)))?;
            config.bind_addr.set_port(port);
        }

        Ok(config)
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set maximum inbound frame length
    pub fn max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len.max(1);
        self
    }

    /// Set per-connection outbound queue length
    pub fn outbound_buffer(mut self, frames: usize) -> Self {
        self.outbound_buffer = frames.max(1);
        self
    }

    /// Disable TCP_NODELAY
    pub fn disable_nodelay(mut self) -> Self {
        self.tcp_nodelay = false;
        self
    }
}
