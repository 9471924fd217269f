//! Per-connection task
//!
//! Reads frames from the socket and dispatches them to the relay while
//! draining the session's outbound queue back to the socket.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::protocol::{self, FrameReader, InboundEvent};
use crate::relay::{DispatchOutcome, Relay, Rooms};
use crate::server::config::ServerConfig;
use crate::session::{SessionContext, SessionState};

pub(crate) struct Connection {
    ctx: SessionContext,
    state: SessionState,
    socket: TcpStream,
    config: ServerConfig,
    relay: Arc<Relay<Rooms>>,
}

impl Connection {
    pub(crate) fn new(
        session_id: u64,
        socket: TcpStream,
        peer_addr: SocketAddr,
        config: ServerConfig,
        relay: Arc<Relay<Rooms>>,
    ) -> Self {
        Self {
            ctx: SessionContext::new(session_id, peer_addr),
            state: SessionState::new(),
            socket,
            config,
            relay,
        }
    }

    /// Serve the connection until the peer goes away
    pub(crate) async fn run(mut self) -> Result<()> {
        let session_id = self.ctx.session_id;
        let rooms = Arc::clone(self.relay.transport());

        let outbound = rooms.register(session_id).await;
        self.relay.on_connect(&self.ctx);

        let result = self.serve(outbound).await;

        let left = rooms.unregister(session_id).await;
        self.relay.on_disconnect(&self.ctx);

        tracing::debug!(
            session_id = session_id,
            channels_left = left,
            joined = self.state.joined.len(),
            frames_received = self.state.frames_received,
            frames_dropped = self.state.frames_dropped,
            frames_sent = self.state.frames_sent,
            "Session finished"
        );

        result
    }

    async fn serve(&mut self, mut outbound: mpsc::Receiver<Bytes>) -> Result<()> {
        let (read_half, mut write_half) = self.socket.split();
        let mut reader = FrameReader::new(read_half, self.config.max_frame_len);

        loop {
            tokio::select! {
                frame = reader.read_frame() => match frame {
                    Ok(Some(frame)) => {
                        self.state.frames_received += 1;
                        Self::handle_frame(&self.ctx, &mut self.state, &self.relay, &frame).await;
                    }
                    Ok(None) => return Ok(()),
                    Err(Error::Protocol(e)) => {
                        self.state.frames_dropped += 1;
                        tracing::debug!(session_id = self.ctx.session_id, error = %e, "Dropping frame");
                    }
                    Err(e) => return Err(e),
                },
                Some(frame) = outbound.recv() => {
                    write_half.write_all(&frame).await?;
                    self.state.frames_sent += 1;
                }
            }
        }
    }

    async fn handle_frame(
        ctx: &SessionContext,
        state: &mut SessionState,
        relay: &Relay<Rooms>,
        frame: &[u8],
    ) {
        let event: InboundEvent = match protocol::decode(frame) {
            Ok(event) => event,
            Err(e) => {
                state.frames_dropped += 1;
                tracing::debug!(session_id = ctx.session_id, error = %e, "Dropping undecodable frame");
                return;
            }
        };

        if let DispatchOutcome::Joined { tracker, .. } = relay.dispatch(ctx.session_id, event).await {
            state.on_join(tracker);
        }
    }
}
