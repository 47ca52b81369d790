//! The jitter-absorbing pipeline: ring buffer plus the two adapters that
//! bridge it to the hardware callbacks and the asynchronous peer.
//!
//! Both callback contexts - the real-time hardware thread and the tokio
//! delivery worker - reach the buffer through one shared mutex. The
//! workers never hold the lock for long-running work (decoding, channel
//! sends); only the final buffer mutation happens under it, so the
//! render callback's wait is short and bounded.

mod capture;
mod render;
mod ring_buffer;

pub use capture::CaptureAdapter;
pub(crate) use capture::{spawn_delivery_worker, spawn_outbound_forwarder, DeliveryCommand};
pub use render::RenderAdapter;
pub use ring_buffer::RingBuffer;

use parking_lot::Mutex;
use std::sync::Arc;

/// The single mutual-exclusion domain around the ring buffer.
pub(crate) type SharedBuffer = Arc<Mutex<RingBuffer<f64>>>;
