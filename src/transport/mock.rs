//! Mock hardware transport for testing without audio hardware.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::AudioIoError;
use crate::format::StreamFormat;
use crate::pipeline::{CaptureAdapter, RenderAdapter};
use crate::transport::HardwareTransport;

#[derive(Default)]
struct MockShared {
    attaches: AtomicUsize,
    detaches: AtomicUsize,
    starts: AtomicUsize,
    stops: AtomicUsize,
    adapters: Mutex<Option<(RenderAdapter, CaptureAdapter)>>,
}

/// A hardware transport that records lifecycle calls and lets tests drive
/// the callbacks by hand.
///
/// This allows exercising the full pipeline without audio hardware,
/// making it suitable for CI environments.
///
/// # Example
///
/// ```ignore
/// let transport = MockTransport::new();
/// let handle = transport.handle();
///
/// let session = AudioIo::builder().transport(transport).start().await?;
///
/// // Simulate one output tick of 4 frames:
/// let mut out = [0.0f64; 4];
/// handle.drive_render(&mut out);
/// ```
pub struct MockTransport {
    shared: Arc<MockShared>,
    sample_rate: f64,
    fail_start: bool,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Creates a mock transport negotiating 48kHz.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(MockShared::default()),
            sample_rate: 48_000.0,
            fail_start: false,
        }
    }

    /// Sets the sample rate reported from `attach`.
    #[must_use]
    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Makes every `start` call fail, for exercising the fatal-start path.
    #[must_use]
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Returns a handle for inspecting calls and driving callbacks.
    #[must_use]
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl HardwareTransport for MockTransport {
    fn attach(
        &mut self,
        render: RenderAdapter,
        capture: CaptureAdapter,
        _format: &StreamFormat,
    ) -> Result<f64, AudioIoError> {
        *self.shared.adapters.lock() = Some((render, capture));
        self.shared.attaches.fetch_add(1, Ordering::SeqCst);
        Ok(self.sample_rate)
    }

    fn detach(&mut self) {
        *self.shared.adapters.lock() = None;
        self.shared.detaches.fetch_add(1, Ordering::SeqCst);
    }

    fn start(&mut self) -> Result<(), AudioIoError> {
        if self.fail_start {
            return Err(AudioIoError::EngineStart {
                reason: "mock transport configured to fail".to_string(),
            });
        }
        self.shared.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.shared.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Inspection and callback-driving handle for a [`MockTransport`].
///
/// Remains valid after the transport moves into a session.
#[derive(Clone)]
pub struct MockHandle {
    shared: Arc<MockShared>,
}

impl MockHandle {
    /// Number of `attach` calls observed.
    #[must_use]
    pub fn attach_count(&self) -> usize {
        self.shared.attaches.load(Ordering::SeqCst)
    }

    /// Number of `detach` calls observed.
    #[must_use]
    pub fn detach_count(&self) -> usize {
        self.shared.detaches.load(Ordering::SeqCst)
    }

    /// Number of `start` calls observed.
    #[must_use]
    pub fn start_count(&self) -> usize {
        self.shared.starts.load(Ordering::SeqCst)
    }

    /// Number of `stop` calls observed.
    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.shared.stops.load(Ordering::SeqCst)
    }

    /// Returns `true` while adapters are attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.shared.adapters.lock().is_some()
    }

    /// Simulates one output callback tick.
    ///
    /// Returns `false` if the pipeline is not attached.
    pub fn drive_render(&self, out: &mut [f64]) -> bool {
        let adapters = self.shared.adapters.lock();
        match adapters.as_ref() {
            Some((render, _)) => {
                render.render(out);
                true
            }
            None => false,
        }
    }

    /// Simulates one input callback tick with captured frames.
    ///
    /// Returns `false` if the pipeline is not attached.
    pub fn drive_capture(&self, frames: &[f32]) -> bool {
        let adapters = self.shared.adapters.lock();
        match adapters.as_ref() {
            Some((_, capture)) => {
                capture.capture(frames);
                true
            }
            None => false,
        }
    }
}
