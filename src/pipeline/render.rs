//! Real-time render adapter - the pull side of the pipeline.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::pipeline::SharedBuffer;
use crate::session::SessionState;

/// Fills hardware output buffers from the ring buffer.
///
/// The hardware output callback invokes [`render()`](Self::render) with
/// the slots it needs for this tick. The call runs inside a real-time
/// deadline: it takes the buffer lock once, fills every slot (substituting
/// silence for underrun), and returns. It never blocks beyond that short
/// critical section, never allocates, and never retries.
///
/// Underruns are recorded on an atomic counter rather than through the
/// event callback - emitting events is not real-time safe.
#[derive(Clone)]
pub struct RenderAdapter {
    buffer: SharedBuffer,
    state: Arc<SessionState>,
}

impl RenderAdapter {
    pub(crate) fn new(buffer: SharedBuffer, state: Arc<SessionState>) -> Self {
        Self { buffer, state }
    }

    /// Produces exactly `out.len()` samples into the output buffer.
    ///
    /// Every slot the ring buffer cannot serve is filled with 0.0.
    pub fn render(&self, out: &mut [f64]) {
        let mut underruns: u64 = 0;
        {
            let mut buffer = self.buffer.lock();
            for slot in out.iter_mut() {
                match buffer.read() {
                    Some(sample) => *slot = sample,
                    None => {
                        *slot = 0.0;
                        underruns += 1;
                    }
                }
            }
        }

        self.state
            .samples_rendered
            .fetch_add(out.len() as u64, Ordering::Relaxed);
        if underruns > 0 {
            self.state
                .underrun_samples
                .fetch_add(underruns, Ordering::Relaxed);
        }
    }
}
