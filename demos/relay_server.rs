//! Location relay server
//!
//! Run with: cargo run --example relay_server
//!
//! Configuration comes from the environment:
//!   PORT=5000                        # listen on 0.0.0.0:PORT
//!   RELAY_BIND_ADDR=127.0.0.1:5000   # or an explicit address
//!   RUST_LOG=tracker_relay=debug     # log filter
//!
//! Talk to it with netcat:
//!   nc localhost 5000
//!   {"event":"join_tracker","data":{"tracker_id":"demo"}}
//!   {"event":"update_location","data":{"tracker_id":"demo","lat":52.52,"lng":13.405}}

use std::time::Duration;

use tracing_subscriber::EnvFilter;
use tracker_relay::{RelayServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tracker_relay=info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let server = RelayServer::new(config);

    // Periodic summary of relay activity
    let relay = server.relay().clone();
    let stats_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let stats = relay.stats().snapshot();
            let trackers = relay.registry().tracker_count().await;
            let channels = relay.transport().channel_count().await;
            let sessions = relay.transport().session_count().await;
            tracing::info!(
                trackers = trackers,
                channels = channels,
                sessions = sessions,
                updates = stats.updates_applied,
                broadcasts = stats.broadcasts,
                ignored = stats.events_ignored,
                "Relay stats"
            );
        }
    });

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    stats_task.abort();
    Ok(())
}
