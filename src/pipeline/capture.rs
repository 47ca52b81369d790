//! Capture/delivery adapter - the push side of the pipeline.
//!
//! Two independent flows live here:
//! - Captured hardware input is wire-encoded and handed to the outbound
//!   forwarder, which sends it to the peer. Fire-and-forget: no
//!   backpressure signal reaches the hardware thread.
//! - Batches delivered by the peer are decoded by the delivery worker and
//!   written into the ring buffer for later playback. Decoding happens
//!   outside the buffer lock; only the final `write_block` runs under it.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::event::{EventCallback, StreamEvent};
use crate::pipeline::SharedBuffer;
use crate::session::SessionState;
use crate::transport::PeerSink;
use crate::wire;

/// Forwards captured hardware input toward the asynchronous peer.
///
/// The hardware input callback invokes [`capture()`](Self::capture) with
/// each batch of newly captured frames. The batch is converted to the
/// wire representation and queued for the outbound forwarder with a
/// non-blocking send; if the forwarder has fallen behind, the batch is
/// dropped and counted. No retry, no blocking wait.
#[derive(Clone)]
pub struct CaptureAdapter {
    outbound: mpsc::Sender<Vec<u8>>,
    state: Arc<SessionState>,
}

impl CaptureAdapter {
    pub(crate) fn new(outbound: mpsc::Sender<Vec<u8>>, state: Arc<SessionState>) -> Self {
        Self { outbound, state }
    }

    /// Encodes and forwards one batch of captured frames.
    ///
    /// The encode allocates the outgoing message; the capture callback
    /// tolerates this (it is the render pull that carries the hard
    /// deadline), matching how the hardware sink side has always worked.
    pub fn capture(&self, frames: &[f32]) {
        let batch = wire::encode_frames(frames);
        match self.outbound.try_send(batch) {
            Ok(()) => {
                self.state.capture_batches.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.state.capture_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Command sent to the delivery worker.
pub(crate) enum DeliveryCommand {
    /// Stop the worker without draining.
    Stop,
}

/// Receives inbound wire batches and writes them into the ring buffer.
struct DeliveryWorker {
    inbound: mpsc::Receiver<Vec<u8>>,
    cmd_rx: mpsc::Receiver<DeliveryCommand>,
    buffer: SharedBuffer,
    state: Arc<SessionState>,
    event_callback: Option<EventCallback>,
}

impl DeliveryWorker {
    fn emit_event(&self, event: StreamEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(event);
        }
    }

    /// Enqueues one decoded batch, all-or-nothing.
    fn enqueue(&self, samples: &[f64]) {
        // Decode already happened; only the buffer mutation is locked.
        let accepted = self.buffer.lock().write_block(samples);
        if accepted {
            self.state.batches_delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            // Peer ran too far ahead of the hardware clock; drop the
            // whole batch, keep streaming.
            self.state.batches_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(samples = samples.len(), "playback buffer full, batch dropped");
            self.emit_event(StreamEvent::BatchDropped {
                samples: samples.len(),
            });
        }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                batch = self.inbound.recv() => {
                    let Some(batch) = batch else { break };
                    match wire::decode(&batch) {
                        Ok(samples) => self.enqueue(&samples),
                        Err(e) => {
                            self.state.malformed_batches.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(error = %e, "discarding malformed inbound batch");
                            self.emit_event(StreamEvent::MalformedBatch { len: batch.len() });
                        }
                    }
                }
                Some(cmd) = self.cmd_rx.recv() => {
                    match cmd {
                        DeliveryCommand::Stop => break,
                    }
                }
                else => break,
            }
        }
        tracing::debug!("delivery worker stopped");
    }
}

/// Spawns the delivery worker as a background task.
pub(crate) fn spawn_delivery_worker(
    inbound: mpsc::Receiver<Vec<u8>>,
    cmd_rx: mpsc::Receiver<DeliveryCommand>,
    buffer: SharedBuffer,
    state: Arc<SessionState>,
    event_callback: Option<EventCallback>,
) -> JoinHandle<()> {
    let worker = DeliveryWorker {
        inbound,
        cmd_rx,
        buffer,
        state,
        event_callback,
    };
    tokio::spawn(worker.run())
}

/// Spawns the outbound forwarder that drains captured batches to the peer.
///
/// Runs until the capture side drops its sender or the peer fails. A peer
/// failure stops only the forwarder; capture continues and its batches are
/// counted as dropped.
pub(crate) fn spawn_outbound_forwarder(
    mut outbound_rx: mpsc::Receiver<Vec<u8>>,
    peer: Arc<dyn PeerSink>,
    event_callback: Option<EventCallback>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(batch) = outbound_rx.recv().await {
            if let Err(e) = peer.send(batch).await {
                tracing::warn!(peer = peer.name(), error = %e, "peer send failed, stopping forwarder");
                if let Some(ref callback) = event_callback {
                    callback(StreamEvent::PeerClosed {
                        name: peer.name().to_string(),
                    });
                }
                break;
            }
        }
        tracing::debug!("outbound forwarder stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RingBuffer;
    use crate::transport::ChannelPeer;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn shared_buffer(capacity: usize) -> SharedBuffer {
        Arc::new(Mutex::new(RingBuffer::new(capacity)))
    }

    #[tokio::test]
    async fn test_capture_forwards_encoded_batch() {
        let (tx, mut rx) = mpsc::channel(4);
        let state = Arc::new(SessionState::new());
        let adapter = CaptureAdapter::new(tx, Arc::clone(&state));

        adapter.capture(&[0.5f32, -0.5]);

        let batch = rx.recv().await.unwrap();
        assert_eq!(wire::decode(&batch).unwrap(), vec![0.5f64, -0.5]);
        assert_eq!(state.capture_batches.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_capture_drops_when_channel_full() {
        let (tx, _rx) = mpsc::channel(1);
        let state = Arc::new(SessionState::new());
        let adapter = CaptureAdapter::new(tx, Arc::clone(&state));

        adapter.capture(&[1.0f32]);
        adapter.capture(&[2.0f32]); // channel full, dropped

        assert_eq!(state.capture_batches.load(Ordering::Relaxed), 1);
        assert_eq!(state.capture_dropped.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_delivery_worker_writes_batches() {
        let buffer = shared_buffer(16);
        let state = Arc::new(SessionState::new());
        let (inbound_tx, inbound_rx) = mpsc::channel(4);
        let (_cmd_tx, cmd_rx) = mpsc::channel(1);

        let handle = spawn_delivery_worker(
            inbound_rx,
            cmd_rx,
            Arc::clone(&buffer),
            Arc::clone(&state),
            None,
        );

        inbound_tx
            .send(wire::encode(&[1.0, 2.0, 3.0]))
            .await
            .unwrap();
        drop(inbound_tx);
        handle.await.unwrap();

        assert_eq!(buffer.lock().read_block(3), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(state.batches_delivered.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_delivery_worker_drops_batch_when_full() {
        let buffer = shared_buffer(4);
        let state = Arc::new(SessionState::new());
        let (inbound_tx, inbound_rx) = mpsc::channel(4);
        let (_cmd_tx, cmd_rx) = mpsc::channel(1);

        let dropped = Arc::new(AtomicUsize::new(0));
        let dropped_clone = Arc::clone(&dropped);
        let callback = crate::event_callback(move |event| {
            if matches!(event, StreamEvent::BatchDropped { .. }) {
                dropped_clone.fetch_add(1, Ordering::SeqCst);
            }
        });

        let handle = spawn_delivery_worker(
            inbound_rx,
            cmd_rx,
            Arc::clone(&buffer),
            Arc::clone(&state),
            Some(callback),
        );

        inbound_tx.send(wire::encode(&[1.0, 2.0, 3.0])).await.unwrap();
        // 3 + 2 > capacity 4: the second batch must be dropped in full
        inbound_tx.send(wire::encode(&[4.0, 5.0])).await.unwrap();
        drop(inbound_tx);
        handle.await.unwrap();

        assert_eq!(state.batches_delivered.load(Ordering::Relaxed), 1);
        assert_eq!(state.batches_dropped.load(Ordering::Relaxed), 1);
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
        // First batch intact, second absent entirely
        assert_eq!(buffer.lock().read_block(3), Some(vec![1.0, 2.0, 3.0]));
        assert!(buffer.lock().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_worker_discards_malformed_batch() {
        let buffer = shared_buffer(16);
        let state = Arc::new(SessionState::new());
        let (inbound_tx, inbound_rx) = mpsc::channel(4);
        let (_cmd_tx, cmd_rx) = mpsc::channel(1);

        let handle = spawn_delivery_worker(
            inbound_rx,
            cmd_rx,
            Arc::clone(&buffer),
            Arc::clone(&state),
            None,
        );

        inbound_tx.send(vec![0xAB; 13]).await.unwrap(); // not a multiple of 8
        inbound_tx.send(wire::encode(&[7.0])).await.unwrap();
        drop(inbound_tx);
        handle.await.unwrap();

        assert_eq!(state.malformed_batches.load(Ordering::Relaxed), 1);
        assert_eq!(buffer.lock().read(), Some(7.0));
    }

    #[tokio::test]
    async fn test_delivery_worker_stops_on_command() {
        let buffer = shared_buffer(16);
        let state = Arc::new(SessionState::new());
        let (_inbound_tx, inbound_rx) = mpsc::channel::<Vec<u8>>(4);
        let (cmd_tx, cmd_rx) = mpsc::channel(1);

        let handle = spawn_delivery_worker(inbound_rx, cmd_rx, buffer, state, None);

        cmd_tx.send(DeliveryCommand::Stop).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_outbound_forwarder_delivers_to_peer() {
        let (peer_tx, mut peer_rx) = mpsc::channel(4);
        let peer: Arc<dyn PeerSink> = Arc::new(ChannelPeer::new(peer_tx));
        let (tx, rx) = mpsc::channel(4);

        let handle = spawn_outbound_forwarder(rx, peer, None);

        tx.send(wire::encode(&[1.0])).await.unwrap();
        let received = peer_rx.recv().await.unwrap();
        assert_eq!(wire::decode(&received).unwrap(), vec![1.0]);

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_outbound_forwarder_stops_when_peer_closes() {
        let (peer_tx, peer_rx) = mpsc::channel(1);
        drop(peer_rx);
        let peer: Arc<dyn PeerSink> = Arc::new(ChannelPeer::new(peer_tx));
        let (tx, rx) = mpsc::channel(4);

        let closed = Arc::new(AtomicUsize::new(0));
        let closed_clone = Arc::clone(&closed);
        let callback = crate::event_callback(move |event| {
            if matches!(event, StreamEvent::PeerClosed { .. }) {
                closed_clone.fetch_add(1, Ordering::SeqCst);
            }
        });

        let handle = spawn_outbound_forwarder(rx, peer, Some(callback));

        tx.send(wire::encode(&[1.0])).await.unwrap();
        handle.await.unwrap();
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
