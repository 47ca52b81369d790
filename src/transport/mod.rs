//! Transport boundaries: the hardware engine and the asynchronous peer.
//!
//! The core treats both sides as opaque. A [`HardwareTransport`] is the
//! platform audio engine that drives the real-time callbacks; a
//! [`PeerSink`] is the unreliable message channel that carries captured
//! audio to the remote consumer. The built-in implementations are
//! [`CpalTransport`] (a thin CPAL shim), [`MockTransport`] (tests/CI) and
//! [`ChannelPeer`] (tokio mpsc).

mod cpal_device;
mod mock;

pub use cpal_device::CpalTransport;
pub use mock::{MockHandle, MockTransport};

use async_trait::async_trait;

use crate::error::{AudioIoError, PeerError};
use crate::format::StreamFormat;
use crate::pipeline::{CaptureAdapter, RenderAdapter};

/// Conventional name of the channel carrying captured audio to the peer.
pub const CAPTURE_CHANNEL: &str = "audio_io.capture";

/// Conventional name of the channel delivering playback audio from the peer.
pub const PLAYBACK_CHANNEL: &str = "audio_io.playback";

/// The platform audio engine driving the real-time callbacks.
///
/// Implementations own the device streams and invoke the two adapters
/// from their callback threads:
///
/// - the output callback calls [`RenderAdapter::render`] with exactly the
///   slots it needs for this tick
/// - the input callback calls [`CaptureAdapter::capture`] with each batch
///   of captured frames
///
/// # Real-time contract
///
/// Callbacks run inside the audio subsystem's deadline. Implementations
/// must not insert blocking syscalls or unbounded work between the
/// subsystem and the adapters; both adapter entry points are themselves
/// non-blocking.
///
/// The transport may be reconfigured or interrupted by the platform at
/// any time. Such events are reported out-of-band as
/// [`HardwareEvent`](crate::HardwareEvent)s; the session reacts by
/// detaching and reattaching through this trait.
pub trait HardwareTransport: Send {
    /// Attaches the pipeline adapters and prepares the device streams.
    ///
    /// Returns the negotiated sample rate, which may differ from
    /// `format`'s requested rate. Does not start the streams.
    fn attach(
        &mut self,
        render: RenderAdapter,
        capture: CaptureAdapter,
        format: &StreamFormat,
    ) -> Result<f64, AudioIoError>;

    /// Tears down the device streams and drops the adapters.
    fn detach(&mut self);

    /// Starts (or restarts) the attached streams.
    fn start(&mut self) -> Result<(), AudioIoError>;

    /// Halts the streams, keeping them attached.
    fn stop(&mut self);
}

/// A destination for captured, wire-encoded audio batches.
///
/// The outbound stream is fire-and-forget: the pipeline never waits for
/// acknowledgement and no backpressure reaches the hardware thread. A
/// failing peer stops its forwarder but not the stream.
#[async_trait]
pub trait PeerSink: Send + Sync {
    /// Human-readable name for logging and events.
    fn name(&self) -> &str;

    /// Sends one wire-encoded batch to the peer.
    async fn send(&self, batch: Vec<u8>) -> Result<(), PeerError>;
}

/// A peer sink backed by a tokio mpsc channel.
///
/// This is the primary way to move captured audio into the rest of an
/// application (network senders, recorders, processors).
///
/// # Example
///
/// ```
/// use audio_io::ChannelPeer;
/// use tokio::sync::mpsc;
///
/// let (tx, mut rx) = mpsc::channel::<Vec<u8>>(32);
/// let peer = ChannelPeer::new(tx);
///
/// // Hand `peer` to the builder, then consume batches:
/// // while let Some(batch) = rx.recv().await { ... }
/// ```
pub struct ChannelPeer {
    name: String,
    sender: tokio::sync::mpsc::Sender<Vec<u8>>,
}

impl ChannelPeer {
    /// Creates a channel peer named after [`CAPTURE_CHANNEL`].
    pub fn new(sender: tokio::sync::mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            name: CAPTURE_CHANNEL.to_string(),
            sender,
        }
    }

    /// Creates a channel peer with a custom name.
    pub fn with_name(name: impl Into<String>, sender: tokio::sync::mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            sender,
        }
    }
}

#[async_trait]
impl PeerSink for ChannelPeer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, batch: Vec<u8>) -> Result<(), PeerError> {
        self.sender.send(batch).await.map_err(|_| PeerError::Closed)
    }
}
