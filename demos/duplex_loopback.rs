//! Duplex loopback example.
//!
//! Captures from the default input device, feeds the captured batches
//! straight back into the playback side, and plays them on the default
//! output device. You should hear your microphone with roughly the jitter
//! buffer's worth of latency.
//!
//! Run with: cargo run --example duplex_loopback

use std::time::Duration;

use audio_io::{AudioIo, ChannelPeer, CpalTransport, HardwareEvent};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Looping microphone back to the speakers for 10 seconds...");
    println!("Use headphones to avoid feedback.");

    // Outbound: captured audio, wire-encoded
    let (capture_tx, mut capture_rx) = mpsc::channel::<Vec<u8>>(32);
    // Inbound: batches destined for playback
    let (playback_tx, playback_rx) = mpsc::channel::<Vec<u8>>(32);

    let session = AudioIo::builder()
        .transport(CpalTransport::default_devices())
        .peer(ChannelPeer::new(capture_tx))
        .inbound(playback_rx)
        .on_event(|event| println!("Event: {event:?}"))
        .start()
        .await?;

    // The "peer" here is a trivial loopback: every captured batch goes
    // straight back as playback audio.
    let loopback = tokio::spawn(async move {
        while let Some(batch) = capture_rx.recv().await {
            if playback_tx.send(batch).await.is_err() {
                break;
            }
        }
    });

    // Simulate a route change halfway through; the session resets itself
    tokio::time::sleep(Duration::from_secs(5)).await;
    session.handle_hardware_event(HardwareEvent::RouteChanged);
    tokio::time::sleep(Duration::from_secs(5)).await;

    let stats = session.stats();
    session.shutdown().await;
    loopback.abort();

    println!("Done. Stats: {stats:?}");
    Ok(())
}
