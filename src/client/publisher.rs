//! Tracker client
//!
//! High-level API for talking to a relay server: publish location samples
//! for a tracker, or join trackers and receive their updates.

use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::device::DeviceInfo;
use crate::error::{Error, ProtocolError, Result};
use crate::protocol::{
    self, FrameReader, InboundEvent, JoinTracker, LocationUpdate, OutboundEvent, UpdateLocation,
    DEFAULT_MAX_FRAME_LEN,
};

/// Relay client connection
///
/// # Example
/// ```no_run
/// use tracker_relay::client::TrackerClient;
/// use tracker_relay::protocol::UpdateLocation;
///
/// # async fn example() -> tracker_relay::error::Result<()> {
/// let mut client = TrackerClient::connect("127.0.0.1:5000".parse().unwrap()).await?;
///
/// client.join("my-phone", None).await?;
/// client
///     .update_location(UpdateLocation::new("my-phone").at(52.52, 13.405).accuracy(8.0))
///     .await?;
///
/// while let Some(update) = client.next_update().await? {
///     println!("{} is at {}, {}", update.tracker_id, update.lat, update.lng);
/// }
/// # Ok(())
/// # }
/// ```
pub struct TrackerClient {
    reader: FrameReader<OwnedReadHalf>,
    writer: Option<OwnedWriteHalf>,
}

impl TrackerClient {
    /// Connect to a relay server
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;

        let (read_half, write_half) = stream.into_split();
        tracing::debug!(addr = %addr, "Connected to relay");

        Ok(Self {
            reader: FrameReader::new(read_half, DEFAULT_MAX_FRAME_LEN),
            writer: Some(write_half),
        })
    }

    /// Join a tracker's channel, optionally announcing this device
    pub async fn join(
        &mut self,
        tracker_id: impl Into<String>,
        device_info: Option<DeviceInfo>,
    ) -> Result<()> {
        let join = JoinTracker {
            tracker_id: Some(tracker_id.into()),
            device_info,
        };
        self.send(&InboundEvent::JoinTracker(join)).await
    }

    /// Publish a location sample
    pub async fn update_location(&mut self, update: UpdateLocation) -> Result<()> {
        self.send(&InboundEvent::UpdateLocation(update)).await
    }

    /// Send any inbound event
    pub async fn send(&mut self, event: &InboundEvent) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or(Error::Protocol(ProtocolError::NotConnected))?;

        let frame = protocol::encode(event)?;
        writer.write_all(&frame).await?;
        Ok(())
    }

    /// Next event from the relay
    ///
    /// Returns `Ok(None)` once the server closes the connection.
    pub async fn next_event(&mut self) -> Result<Option<OutboundEvent>> {
        match self.reader.read_frame().await? {
            Some(frame) => Ok(Some(protocol::decode(&frame)?)),
            None => Ok(None),
        }
    }

    /// Next `location_update` payload
    pub async fn next_update(&mut self) -> Result<Option<LocationUpdate>> {
        Ok(self
            .next_event()
            .await?
            .map(|OutboundEvent::LocationUpdate(update)| update))
    }

    /// Stop sending; the server sees end of stream and drops the session
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await?;
        }
        Ok(())
    }

    /// Check if the write side is still open
    pub fn is_connected(&self) -> bool {
        self.writer.is_some()
    }
}
