//! End-to-end tests over the public API, driven by the mock transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use audio_io::{
    wire, AudioIo, ChannelPeer, HardwareEvent, MockTransport, PipelineState, RingBuffer,
    StreamEvent,
};
use tokio::sync::mpsc;

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within timeout");
}

#[tokio::test]
async fn test_duplex_stream_end_to_end() {
    let transport = MockTransport::new();
    let handle = transport.handle();
    let (capture_tx, mut capture_rx) = mpsc::channel(32);
    let (playback_tx, playback_rx) = mpsc::channel(32);

    let session = AudioIo::builder()
        .transport(transport)
        .peer(ChannelPeer::new(capture_tx))
        .inbound(playback_rx)
        .start()
        .await
        .unwrap();
    assert_eq!(session.state(), PipelineState::Running);

    // Inbound: the peer delivers a batch and the worker queues it
    playback_tx
        .send(wire::encode(&[0.1, 0.2, 0.3, 0.4]))
        .await
        .unwrap();
    let probe = session.clone();
    wait_for(move || probe.stats().batches_delivered == 1).await;

    // The render tick pulls it in order and pads the shortfall with silence
    let mut out = [9.0f64; 6];
    assert!(handle.drive_render(&mut out));
    assert_eq!(out, [0.1, 0.2, 0.3, 0.4, 0.0, 0.0]);
    let stats = session.stats();
    assert_eq!(stats.samples_rendered, 6);
    assert_eq!(stats.underrun_samples, 2);

    // Outbound: captured frames arrive wire-encoded at the peer
    assert!(handle.drive_capture(&[0.5f32, -0.5]));
    let batch = capture_rx.recv().await.unwrap();
    assert_eq!(wire::decode(&batch).unwrap(), vec![0.5f64, -0.5]);

    session.shutdown().await;
}

#[tokio::test]
async fn test_inbound_overflow_drops_whole_batches() {
    let transport = MockTransport::new();
    let (playback_tx, playback_rx) = mpsc::channel(32);

    let session = AudioIo::builder()
        .transport(transport)
        .inbound(playback_rx)
        .start()
        .await
        .unwrap();

    // Default sizing: round(3ms * 48kHz * 4.0) = 576 samples
    playback_tx
        .send(wire::encode(&vec![0.25; 576]))
        .await
        .unwrap();
    let probe = session.clone();
    wait_for(move || probe.stats().batches_delivered == 1).await;

    // One more sample than fits: rejected in full, nothing partial
    playback_tx.send(wire::encode(&[1.0])).await.unwrap();
    let probe = session.clone();
    wait_for(move || probe.stats().batches_dropped == 1).await;
    assert_eq!(session.stats().batches_delivered, 1);

    session.shutdown().await;
}

#[tokio::test]
async fn test_malformed_batch_is_discarded_and_reported() {
    let transport = MockTransport::new();
    let handle = transport.handle();
    let (playback_tx, playback_rx) = mpsc::channel(32);

    let malformed = Arc::new(AtomicUsize::new(0));
    let malformed_probe = Arc::clone(&malformed);
    let session = AudioIo::builder()
        .transport(transport)
        .inbound(playback_rx)
        .on_event(move |event| {
            if matches!(event, StreamEvent::MalformedBatch { len: 13 }) {
                malformed_probe.fetch_add(1, Ordering::SeqCst);
            }
        })
        .start()
        .await
        .unwrap();

    // 13 bytes is not a whole number of samples
    playback_tx.send(vec![0xAB; 13]).await.unwrap();
    playback_tx.send(wire::encode(&[7.0])).await.unwrap();
    let probe = session.clone();
    wait_for(move || probe.stats().batches_delivered == 1).await;

    assert_eq!(session.stats().malformed_batches, 1);
    assert_eq!(malformed.load(Ordering::SeqCst), 1);

    // The stream survives: the valid batch still plays
    let mut out = [0.0f64; 1];
    assert!(handle.drive_render(&mut out));
    assert_eq!(out, [7.0]);

    session.shutdown().await;
}

#[tokio::test]
async fn test_hardware_reconfiguration_resets_once() {
    let transport = MockTransport::new();
    let handle = transport.handle();
    let (playback_tx, playback_rx) = mpsc::channel(32);

    let resets = Arc::new(AtomicUsize::new(0));
    let resets_probe = Arc::clone(&resets);
    let session = AudioIo::builder()
        .transport(transport)
        .inbound(playback_rx)
        .on_event(move |event| {
            if matches!(event, StreamEvent::PipelineReset) {
                resets_probe.fetch_add(1, Ordering::SeqCst);
            }
        })
        .start()
        .await
        .unwrap();

    playback_tx.send(wire::encode(&[0.5, 0.5])).await.unwrap();
    let probe = session.clone();
    wait_for(move || probe.stats().batches_delivered == 1).await;

    // A burst of notifications collapses into one teardown/reattach cycle
    session.handle_hardware_event(HardwareEvent::RouteChanged);
    session.handle_hardware_event(HardwareEvent::ConfigChanged);

    let reattached = handle.clone();
    wait_for(move || reattached.attach_count() == 2).await;
    let probe = session.clone();
    wait_for(move || probe.state() == PipelineState::Running).await;

    assert_eq!(handle.detach_count(), 1);
    assert_eq!(handle.start_count(), 2);
    assert_eq!(resets.load(Ordering::SeqCst), 1);

    // The buffer was re-created: the pre-reset audio is gone
    let mut out = [9.0f64; 2];
    assert!(handle.drive_render(&mut out));
    assert_eq!(out, [0.0, 0.0]);

    session.shutdown().await;
}

#[tokio::test]
async fn test_capture_without_peer_is_counted_as_dropped() {
    let transport = MockTransport::new();
    let handle = transport.handle();

    let session = AudioIo::builder().transport(transport).start().await.unwrap();

    // No forwarder is draining the outbound channel; once it fills,
    // capture keeps going and counts the drops.
    for _ in 0..64 {
        handle.drive_capture(&[0.0f32; 4]);
    }
    let stats = session.stats();
    assert_eq!(stats.capture_batches + stats.capture_dropped, 64);
    assert!(stats.capture_dropped > 0);

    session.shutdown().await;
}

// Exercises the buffer the way the real pipeline does: one writer thread
// pushing blocks at irregular intervals, one reader draining smaller
// chunks, both through the shared mutex.
#[test]
fn test_ring_buffer_concurrent_producer_consumer() {
    use parking_lot::Mutex;
    use rand::Rng;

    const CAPACITY: usize = 4096;
    const BLOCK: usize = 1000;
    const CHUNK: usize = 128;
    const BLOCKS: usize = 100;

    let buffer = Arc::new(Mutex::new(RingBuffer::<f64>::new(CAPACITY)));

    let producer = {
        let buffer = Arc::clone(&buffer);
        std::thread::spawn(move || {
            let mut rng = rand::thread_rng();
            for i in 0..BLOCKS {
                let start = i * BLOCK;
                let block: Vec<f64> = (start..start + BLOCK).map(|v| v as f64).collect();
                while !buffer.lock().write_block(&block) {
                    std::thread::yield_now();
                }
                std::thread::sleep(Duration::from_micros(rng.gen_range(0..100)));
            }
        })
    };

    let mut received = Vec::with_capacity(BLOCKS * BLOCK);
    while received.len() < BLOCKS * BLOCK {
        // The tail of the stream is shorter than one full pull
        let want = (BLOCKS * BLOCK - received.len()).min(CHUNK);
        let chunk = {
            let mut guard = buffer.lock();
            assert!(guard.len() <= CAPACITY);
            guard.read_block(want)
        };
        match chunk {
            Some(chunk) => received.extend(chunk),
            None => std::thread::yield_now(),
        }
    }
    producer.join().unwrap();

    // Strict FIFO across every wrap point
    for (i, sample) in received.iter().enumerate() {
        assert_eq!(*sample, i as f64);
    }
    assert!(buffer.lock().is_empty());
}
