//! Builder for constructing and starting an [`AudioSession`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::PipelineConfig;
use crate::error::AudioIoError;
use crate::event::{event_callback, EventCallback, StreamEvent};
use crate::pipeline::{
    spawn_delivery_worker, spawn_outbound_forwarder, RingBuffer, SharedBuffer,
};
use crate::session::{AudioSession, SessionState};
use crate::transport::{HardwareTransport, PeerSink};

/// Depth of the channel between the capture callback and the outbound
/// forwarder. Each slot is one callback's worth of audio, so this covers
/// a short peer stall without unbounded queueing.
const OUTBOUND_CHANNEL_CAPACITY: usize = 32;

/// Entry point for the crate.
///
/// See the [crate-level docs](crate) for a complete example.
pub struct AudioIo;

impl AudioIo {
    /// Creates a builder with default configuration.
    #[must_use]
    pub fn builder() -> AudioIoBuilder {
        AudioIoBuilder::new()
    }
}

/// Assembles the buffer, workers, and transport into a running session.
pub struct AudioIoBuilder {
    config: PipelineConfig,
    transport: Option<Box<dyn HardwareTransport>>,
    peer: Option<Arc<dyn PeerSink>>,
    inbound: Option<mpsc::Receiver<Vec<u8>>>,
    event_callback: Option<EventCallback>,
}

impl Default for AudioIoBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioIoBuilder {
    /// Creates a builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            transport: None,
            peer: None,
            inbound: None,
            event_callback: None,
        }
    }

    /// Sets the hardware transport. Required.
    #[must_use]
    pub fn transport(mut self, transport: impl HardwareTransport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Sets the peer that receives captured, wire-encoded audio.
    ///
    /// Without a peer, captured batches are dropped and counted.
    #[must_use]
    pub fn peer(mut self, peer: impl PeerSink + 'static) -> Self {
        self.peer = Some(Arc::new(peer));
        self
    }

    /// Sets the inbound channel carrying playback batches from the peer.
    ///
    /// Without it, the output renders silence.
    #[must_use]
    pub fn inbound(mut self, inbound: mpsc::Receiver<Vec<u8>>) -> Self {
        self.inbound = Some(inbound);
        self
    }

    /// Replaces the whole pipeline configuration.
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the nominal frame duration used to size the jitter buffer.
    #[must_use]
    pub fn frame_duration(mut self, frame_duration: Duration) -> Self {
        self.config.frame_duration = frame_duration;
        self
    }

    /// Registers a callback for stream events (drops, resets, peer loss).
    ///
    /// The callback may fire from worker tasks; it must not block.
    #[must_use]
    pub fn on_event(mut self, callback: impl Fn(StreamEvent) + Send + Sync + 'static) -> Self {
        self.event_callback = Some(event_callback(callback));
        self
    }

    /// Builds the session, spawns its workers, and starts streaming.
    ///
    /// # Errors
    ///
    /// Fails if no transport was configured, if the configuration is
    /// invalid, or if attaching/starting the hardware fails. On failure
    /// the spawned workers are shut down again before returning.
    pub async fn start(self) -> Result<AudioSession, AudioIoError> {
        let transport = self.transport.ok_or(AudioIoError::NoTransportConfigured)?;
        validate_config(&self.config)?;

        // Starts empty; sized from the negotiated rate on session start
        let buffer: SharedBuffer = Arc::new(Mutex::new(RingBuffer::new(0)));
        let stats = Arc::new(SessionState::new());
        let mut worker_handles: Vec<JoinHandle<()>> = Vec::new();

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        if let Some(peer) = self.peer {
            worker_handles.push(spawn_outbound_forwarder(
                outbound_rx,
                peer,
                self.event_callback.clone(),
            ));
        }

        let delivery_cmd_tx = match self.inbound {
            Some(inbound) => {
                let (cmd_tx, cmd_rx) = mpsc::channel(1);
                worker_handles.push(spawn_delivery_worker(
                    inbound,
                    cmd_rx,
                    Arc::clone(&buffer),
                    Arc::clone(&stats),
                    self.event_callback.clone(),
                ));
                Some(cmd_tx)
            }
            None => None,
        };

        let session = AudioSession::new(
            self.config,
            transport,
            buffer,
            stats,
            outbound_tx,
            delivery_cmd_tx,
            worker_handles,
            self.event_callback,
        );

        if let Err(e) = session.start() {
            session.shutdown().await;
            return Err(e);
        }
        Ok(session)
    }
}

fn validate_config(config: &PipelineConfig) -> Result<(), AudioIoError> {
    if config.frame_duration.is_zero() {
        return Err(AudioIoError::SessionConfig {
            reason: "frame duration must be non-zero".to_string(),
        });
    }
    if config.sample_rate <= 0.0 {
        return Err(AudioIoError::SessionConfig {
            reason: format!("sample rate must be positive, got {}", config.sample_rate),
        });
    }
    if config.jitter_multiplier <= 0.0 {
        return Err(AudioIoError::SessionConfig {
            reason: format!(
                "jitter multiplier must be positive, got {}",
                config.jitter_multiplier
            ),
        });
    }
    Ok(())
}
