//! Simulated tracker publisher
//!
//! Run with: cargo run --example publisher [ADDR] [TRACKER_ID]
//!
//! Joins the tracker's channel, then walks a small circle publishing a
//! sample every second and printing what the relay broadcasts back.

use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing_subscriber::EnvFilter;
use tracker_relay::device::DeviceInfo;
use tracker_relay::protocol::UpdateLocation;
use tracker_relay::TrackerClient;

const CENTER: (f64, f64) = (52.5200, 13.4050);
const RADIUS_DEG: f64 = 0.001;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let addr: SocketAddr = args
        .next()
        .unwrap_or_else(|| "127.0.0.1:5000".to_string())
        .parse()?;
    let tracker_id = args.next().unwrap_or_else(|| "demo".to_string());

    let device = DeviceInfo::new()
        .with("userAgent", "tracker-relay-demo (X11; Linux x86_64)")
        .with("platform", "Linux x86_64");

    let mut client = TrackerClient::connect(addr).await?;
    client.join(tracker_id.clone(), Some(device.clone())).await?;
    println!("Publishing as {} to {}", tracker_id, addr);

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut step: u32 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let angle = f64::from(step) * std::f64::consts::PI / 18.0;
                let millis = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as u64;

                let update = UpdateLocation::new(tracker_id.clone())
                    .at(CENTER.0 + RADIUS_DEG * angle.sin(), CENTER.1 + RADIUS_DEG * angle.cos())
                    .accuracy(5.0)
                    .speed(1.4)
                    .heading((angle.to_degrees() + 90.0) % 360.0)
                    .timestamp(millis)
                    .device_info(device.clone())
                    .alias("Demo walker");
                client.update_location(update).await?;
                step = step.wrapping_add(1);
            }
            update = client.next_update() => match update? {
                Some(update) => println!(
                    "[{}] {:.5}, {:.5} ({})",
                    update.tracker_id, update.lat, update.lng, update.platform
                ),
                None => {
                    println!("Relay closed the connection");
                    return Ok(());
                }
            },
            _ = tokio::signal::ctrl_c() => {
                client.disconnect().await?;
                return Ok(());
            }
        }
    }
}
