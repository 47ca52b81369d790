//! Hardware notifications and runtime stream events.
//!
//! [`HardwareEvent`] is the inbound notification surface: the platform
//! shim translates its route-change/interruption notifications into these
//! variants and dispatches them to the session's state machine.
//!
//! [`StreamEvent`] is the outbound observability surface: non-fatal
//! notifications about stream behavior. The stream continues running after
//! events are emitted - they're for logging/metrics, not error handling.

use std::sync::Arc;

/// A hardware reconfiguration notification.
///
/// These arrive out-of-band on a non-real-time context, decoupled from the
/// audio render tick. [`RouteChanged`] and [`ConfigChanged`] trigger a
/// pipeline reset while running; [`Interrupted`] is informational.
///
/// [`RouteChanged`]: HardwareEvent::RouteChanged
/// [`ConfigChanged`]: HardwareEvent::ConfigChanged
/// [`Interrupted`]: HardwareEvent::Interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareEvent {
    /// The audio route changed (device plugged/unplugged, output switched).
    RouteChanged,

    /// The audio session was interrupted (phone call, another app took
    /// the device). `resumed` is true when the interruption ended.
    Interrupted {
        /// Whether this notification marks the end of the interruption.
        resumed: bool,
    },

    /// The engine's configuration changed (sample rate, channel layout).
    ConfigChanged,
}

/// Runtime events emitted during streaming.
///
/// These are informational, not errors. Events are only emitted from
/// non-real-time contexts (the delivery worker and outbound forwarder);
/// the render callback records underruns on an atomic counter instead,
/// visible through [`SessionStats`](crate::SessionStats).
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// An inbound batch was dropped because the ring buffer was full.
    ///
    /// The peer has fallen too far behind the hardware clock or burst too
    /// much data at once. The whole batch is discarded - no partial
    /// enqueue.
    BatchDropped {
        /// Number of samples in the discarded batch.
        samples: usize,
    },

    /// An inbound batch was discarded because its byte length is not a
    /// multiple of the sample width.
    MalformedBatch {
        /// Byte length of the rejected batch.
        len: usize,
    },

    /// The pipeline was torn down and reattached after a hardware
    /// reconfiguration. Buffered audio was discarded.
    PipelineReset,

    /// The peer sink failed; the outbound forwarder has stopped.
    PeerClosed {
        /// Name of the peer sink.
        name: String,
    },
}

/// Callback type for receiving runtime events.
///
/// Register an event callback via [`AudioIoBuilder::on_event()`] to
/// receive notifications about dropped batches, malformed wire data, and
/// pipeline resets.
///
/// [`AudioIoBuilder::on_event()`]: crate::AudioIoBuilder::on_event
pub type EventCallback = Arc<dyn Fn(StreamEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use audio_io::{event_callback, StreamEvent};
///
/// let callback = event_callback(|event| {
///     println!("Got event: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(StreamEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}
