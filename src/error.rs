//! Error types for audio-io.
//!
//! Errors are split into two categories:
//! - **Fatal errors** ([`AudioIoError`]): Prevent the session from starting
//! - **Recoverable conditions**: Runtime issues (dropped batches, underruns)
//!   surfaced via [`EventCallback`](crate::EventCallback) and session stats

/// Fatal errors that prevent an audio session from starting.
///
/// These are returned from [`AudioIoBuilder::start()`] and
/// [`AudioSession::start()`]. A failed start leaves the pipeline stopped;
/// there is no automatic retry. Runtime issues (buffer overflow, malformed
/// batches) are handled via the event callback instead.
///
/// [`AudioIoBuilder::start()`]: crate::AudioIoBuilder::start
/// [`AudioSession::start()`]: crate::AudioSession::start
#[derive(Debug, thiserror::Error)]
pub enum AudioIoError {
    /// No hardware transport was configured before starting.
    #[error("no hardware transport configured - call transport() before start()")]
    NoTransportConfigured,

    /// The hardware session rejected the requested configuration
    /// (conflicting sample rate, category, or buffer duration).
    #[error("session configuration failed: {reason}")]
    SessionConfig {
        /// Why the configuration was rejected.
        reason: String,
    },

    /// The pipeline nodes could not be attached to the hardware engine.
    #[error("pipeline attach failed: {reason}")]
    PipelineAttach {
        /// Why attachment failed.
        reason: String,
    },

    /// The hardware engine failed to start.
    #[error("engine start failed: {reason}")]
    EngineStart {
        /// Why the engine did not start.
        reason: String,
    },

    /// No default audio device is configured on this system.
    #[error("no default audio device configured")]
    NoDefaultDevice,

    /// The requested audio device was not found.
    #[error("device not found: {name}")]
    DeviceNotFound {
        /// Name of the device that wasn't found.
        name: String,
    },

    /// The device's sample format is not supported.
    #[error("unsupported sample format: {format}")]
    UnsupportedFormat {
        /// The format that wasn't supported.
        format: String,
    },

    /// An error from the underlying audio library (CPAL).
    #[error("audio backend error: {0}")]
    Backend(String),
}

/// Errors produced when decoding inbound wire data.
///
/// A malformed batch is discarded by the delivery worker; it never stops
/// the stream.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// The byte length is not a multiple of the sample width.
    #[error("wire batch of {len} bytes is not a multiple of the {width}-byte sample width")]
    Misaligned {
        /// Byte length of the rejected batch.
        len: usize,
        /// Expected sample width in bytes.
        width: usize,
    },
}

/// Errors that can occur within a [`PeerSink`](crate::PeerSink) implementation.
///
/// Peer errors are recoverable from the pipeline's point of view - the
/// outbound stream is fire-and-forget, so a failing peer only stops its
/// own forwarder.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// The receiving channel was closed.
    #[error("peer channel closed")]
    Closed,

    /// Custom error for user-implemented peers.
    #[error("{0}")]
    Custom(String),
}

impl PeerError {
    /// Creates a custom peer error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}
