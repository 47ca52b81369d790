//! # audio-io
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Duplex real-time audio bridging with an elastic jitter buffer.
//!
//! `audio-io` streams live audio between a hardware I/O thread and an
//! asynchronous message-passing peer. Captured input is wire-encoded and
//! forwarded to the peer; sample batches delivered by the peer are queued
//! in a fixed-capacity ring buffer and pulled by the hardware output
//! callback, with silence substituted whenever the peer falls behind.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use audio_io::{AudioIo, ChannelPeer, CpalTransport, HardwareEvent};
//! use tokio::sync::mpsc;
//!
//! // Outbound: captured audio, wire-encoded, one message per callback
//! let (capture_tx, mut capture_rx) = mpsc::channel::<Vec<u8>>(32);
//! // Inbound: sample batches destined for playback
//! let (playback_tx, playback_rx) = mpsc::channel::<Vec<u8>>(32);
//!
//! let session = AudioIo::builder()
//!     .transport(CpalTransport::default_devices())
//!     .peer(ChannelPeer::new(capture_tx))
//!     .inbound(playback_rx)
//!     .on_event(|e| tracing::warn!(?e, "stream event"))
//!     .start()
//!     .await?;
//!
//! // Feed playback audio at the peer's own cadence:
//! // playback_tx.send(audio_io::wire::encode(&samples)).await?;
//!
//! // React to device changes from the platform notification layer:
//! session.handle_hardware_event(HardwareEvent::RouteChanged);
//!
//! session.shutdown().await;
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict thread boundary:
//!
//! - **Hardware thread**: Real-time render/capture callbacks that never
//!   block and never allocate on the pull path
//! - **Ring buffer**: Fixed-capacity elastic store, sized from the frame
//!   duration and a jitter multiplier, behind one shared mutex
//! - **Tokio runtime**: Async workers decode inbound batches and forward
//!   captured audio to the peer
//!
//! All long-running work (decoding, channel sends) happens outside the
//! buffer's critical section, so the render callback only ever contends
//! with a short, bounded buffer mutation.

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod builder;
mod config;
mod error;
mod event;
mod format;
mod pipeline;
mod session;
pub mod transport;
pub mod wire;

pub use builder::{AudioIo, AudioIoBuilder};
pub use config::PipelineConfig;
pub use error::{AudioIoError, PeerError, WireError};
pub use event::{event_callback, EventCallback, HardwareEvent, StreamEvent};
pub use format::{AudioFormatDescription, SampleType, StreamFormat};
pub use pipeline::{CaptureAdapter, RenderAdapter, RingBuffer};
pub use session::{AudioSession, PipelineState, SessionStats};
pub use transport::{
    ChannelPeer, CpalTransport, HardwareTransport, MockHandle, MockTransport, PeerSink,
};
