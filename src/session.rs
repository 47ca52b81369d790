//! Audio session: the pipeline state machine and control surface.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::PipelineConfig;
use crate::error::AudioIoError;
use crate::event::{EventCallback, HardwareEvent, StreamEvent};
use crate::format::StreamFormat;
use crate::pipeline::{CaptureAdapter, DeliveryCommand, RenderAdapter, RingBuffer, SharedBuffer};
use crate::transport::HardwareTransport;

/// Counters describing a session's streaming behavior.
///
/// All drops and underruns are silent by design - these counters are the
/// only way they surface, alongside the coarser
/// [`StreamEvent`](crate::StreamEvent)s.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Total samples produced by the render adapter.
    pub samples_rendered: u64,
    /// Samples filled with silence because the buffer was empty.
    pub underrun_samples: u64,
    /// Inbound batches written into the ring buffer.
    pub batches_delivered: u64,
    /// Inbound batches dropped because the buffer was full.
    pub batches_dropped: u64,
    /// Inbound batches discarded as malformed wire data.
    pub malformed_batches: u64,
    /// Captured batches forwarded toward the peer.
    pub capture_batches: u64,
    /// Captured batches dropped because the outbound channel was full.
    pub capture_dropped: u64,
}

/// Internal counter state shared between the session and its adapters.
#[derive(Default)]
pub(crate) struct SessionState {
    pub samples_rendered: AtomicU64,
    pub underrun_samples: AtomicU64,
    pub batches_delivered: AtomicU64,
    pub batches_dropped: AtomicU64,
    pub malformed_batches: AtomicU64,
    pub capture_batches: AtomicU64,
    pub capture_dropped: AtomicU64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> SessionStats {
        SessionStats {
            samples_rendered: self.samples_rendered.load(Ordering::Relaxed),
            underrun_samples: self.underrun_samples.load(Ordering::Relaxed),
            batches_delivered: self.batches_delivered.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            malformed_batches: self.malformed_batches.load(Ordering::Relaxed),
            capture_batches: self.capture_batches.load(Ordering::Relaxed),
            capture_dropped: self.capture_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Observable state of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Pipeline nodes have never been attached.
    Uninitialized,
    /// Attached but not yet started.
    Attached,
    /// Streaming.
    Running,
    /// Halted; the pipeline stays attached.
    Stopped,
    /// Transient: tearing down and reattaching after a hardware
    /// reconfiguration.
    Resetting,
}

struct SessionInner {
    config: PipelineConfig,
    transport: Box<dyn HardwareTransport>,
    /// Kept for rebuilding the capture adapter on reattach; taken on
    /// shutdown so the outbound forwarder can finish.
    outbound_tx: Option<mpsc::Sender<Vec<u8>>>,
    delivery_cmd_tx: Option<mpsc::Sender<DeliveryCommand>>,
    worker_handles: Vec<JoinHandle<()>>,
    attached: bool,
    running: bool,
    has_run: bool,
}

struct SessionShared {
    control: parking_lot::Mutex<SessionInner>,
    buffer: SharedBuffer,
    stats: Arc<SessionState>,
    resetting: AtomicBool,
    event_callback: Option<EventCallback>,
    /// Captured at construction so resets can be spawned from any thread,
    /// including platform notification threads outside the runtime.
    runtime: tokio::runtime::Handle,
}

/// Handle to an audio session.
///
/// The session owns the ring buffer, the hardware transport, and the
/// background workers - there are no process-wide singletons. Handles are
/// cheap to clone; all of them control the same session.
///
/// # Lifecycle
///
/// ```text
/// uninitialized -> attached <-> running <-> stopped
///                        \___ resetting ___/
/// ```
///
/// [`start()`](Self::start) attaches the pipeline if needed, re-creates
/// the ring buffer from the current configuration, and starts the
/// hardware transport. [`stop()`](Self::stop) halts the transport but
/// leaves the pipeline attached. Hardware reconfiguration events trigger
/// a teardown/reattach cycle guarded against reentrancy.
#[derive(Clone)]
pub struct AudioSession {
    shared: Arc<SessionShared>,
}

impl AudioSession {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: PipelineConfig,
        transport: Box<dyn HardwareTransport>,
        buffer: SharedBuffer,
        stats: Arc<SessionState>,
        outbound_tx: mpsc::Sender<Vec<u8>>,
        delivery_cmd_tx: Option<mpsc::Sender<DeliveryCommand>>,
        worker_handles: Vec<JoinHandle<()>>,
        event_callback: Option<EventCallback>,
    ) -> Self {
        Self {
            shared: Arc::new(SessionShared {
                control: parking_lot::Mutex::new(SessionInner {
                    config,
                    transport,
                    outbound_tx: Some(outbound_tx),
                    delivery_cmd_tx,
                    worker_handles,
                    attached: false,
                    running: false,
                    has_run: false,
                }),
                buffer,
                stats,
                resetting: AtomicBool::new(false),
                event_callback,
                runtime: tokio::runtime::Handle::current(),
            }),
        }
    }

    /// Starts (or restarts) the audio pipeline.
    ///
    /// Attaches the pipeline nodes if they are not already attached, then
    /// re-creates the ring buffer sized to the current frame-duration and
    /// sample-rate parameters, and starts the hardware transport.
    ///
    /// # Errors
    ///
    /// A configuration or engine failure is fatal to this attempt: the
    /// error is returned, the pipeline stays stopped, and nothing is
    /// retried automatically.
    pub fn start(&self) -> Result<(), AudioIoError> {
        let mut inner = self.shared.control.lock();
        self.start_locked(&mut inner)
    }

    fn start_locked(&self, inner: &mut SessionInner) -> Result<(), AudioIoError> {
        // Attach first so the negotiated sample rate feeds the sizing below
        if !inner.attached {
            let outbound_tx = inner
                .outbound_tx
                .as_ref()
                .ok_or_else(|| AudioIoError::PipelineAttach {
                    reason: "session was shut down".to_string(),
                })?
                .clone();
            let render = RenderAdapter::new(
                Arc::clone(&self.shared.buffer),
                Arc::clone(&self.shared.stats),
            );
            let capture = CaptureAdapter::new(outbound_tx, Arc::clone(&self.shared.stats));
            let format = StreamFormat::mono_f64(inner.config.sample_rate);
            let negotiated = inner.transport.attach(render, capture, &format)?;
            inner.config.sample_rate = negotiated;
            inner.attached = true;
            tracing::info!(sample_rate = negotiated, "pipeline attached");
        }

        // Sizing is fixed at construction: re-create rather than resize.
        // Anything buffered before this (re)start is discarded with it.
        let capacity = inner.config.capacity();
        *self.shared.buffer.lock() = RingBuffer::new(capacity);
        tracing::debug!(capacity, "ring buffer created");

        inner.transport.start().map_err(|e| {
            tracing::error!(error = %e, "engine start failed");
            e
        })?;
        inner.running = true;
        inner.has_run = true;
        tracing::info!("audio session running");
        Ok(())
    }

    /// Halts the hardware transport; the pipeline stays attached.
    pub fn stop(&self) {
        let mut inner = self.shared.control.lock();
        inner.transport.stop();
        inner.running = false;
        tracing::info!("audio session stopped");
    }

    /// Returns `true` while the session is running.
    pub fn is_running(&self) -> bool {
        self.shared.control.lock().running
    }

    /// Returns the current pipeline state.
    pub fn state(&self) -> PipelineState {
        if self.shared.resetting.load(Ordering::SeqCst) {
            return PipelineState::Resetting;
        }
        let inner = self.shared.control.lock();
        if inner.running {
            PipelineState::Running
        } else if !inner.attached {
            PipelineState::Uninitialized
        } else if inner.has_run {
            PipelineState::Stopped
        } else {
            PipelineState::Attached
        }
    }

    /// Dispatches a hardware notification to the state machine.
    ///
    /// Route and configuration changes trigger a pipeline reset while
    /// running; interruptions are logged only. Reset requests arriving
    /// while a reset is already in progress are ignored.
    pub fn handle_hardware_event(&self, event: HardwareEvent) {
        match event {
            HardwareEvent::RouteChanged | HardwareEvent::ConfigChanged => {
                tracing::info!(?event, "hardware reconfiguration");
                self.reset();
            }
            HardwareEvent::Interrupted { resumed } => {
                tracing::info!(resumed, "hardware interruption");
            }
        }
    }

    fn reset(&self) {
        {
            let inner = self.shared.control.lock();
            if !inner.running {
                return;
            }
        }
        if self.shared.resetting.swap(true, Ordering::SeqCst) {
            tracing::debug!("reset already in progress, ignoring");
            return;
        }

        tracing::info!("resetting audio pipeline");
        {
            let mut inner = self.shared.control.lock();
            inner.transport.stop();
            inner.transport.detach();
            inner.attached = false;
        }

        // Restart off the notification context; `resetting` stays set
        // until the reattach completes, so notification bursts collapse
        // into one teardown/reattach cycle.
        let session = self.clone();
        self.shared.runtime.spawn(async move {
            let result = {
                let mut inner = session.shared.control.lock();
                session.start_locked(&mut inner)
            };
            if let Err(e) = result {
                tracing::error!(error = %e, "restart after reset failed");
                session.shared.control.lock().running = false;
            }
            session.emit_event(StreamEvent::PipelineReset);
            session.shared.resetting.store(false, Ordering::SeqCst);
        });
    }

    /// Sets the nominal frame duration.
    ///
    /// Takes effect on the next [`start()`](Self::start), when the ring
    /// buffer is re-created.
    pub fn set_frame_duration(&self, frame_duration: Duration) {
        self.shared.control.lock().config.frame_duration = frame_duration;
    }

    /// Returns the nominal frame duration.
    pub fn frame_duration(&self) -> Duration {
        self.shared.control.lock().config.frame_duration
    }

    /// Returns the negotiated stream format for both directions.
    pub fn format(&self) -> StreamFormat {
        StreamFormat::mono_f64(self.shared.control.lock().config.sample_rate)
    }

    /// Returns a snapshot of the session counters.
    pub fn stats(&self) -> SessionStats {
        self.shared.stats.snapshot()
    }

    fn emit_event(&self, event: StreamEvent) {
        if let Some(ref callback) = self.shared.event_callback {
            callback(event);
        }
    }

    /// Stops everything and waits for the background workers to finish.
    ///
    /// Unlike [`stop()`](Self::stop) this detaches the pipeline and ends
    /// the delivery worker and outbound forwarder. The session cannot be
    /// started again afterwards.
    pub async fn shutdown(self) {
        let (cmd_tx, handles) = {
            let mut inner = self.shared.control.lock();
            inner.transport.stop();
            inner.transport.detach();
            inner.attached = false;
            inner.running = false;
            // Dropping the last outbound sender ends the forwarder
            inner.outbound_tx = None;
            (
                inner.delivery_cmd_tx.take(),
                std::mem::take(&mut inner.worker_handles),
            )
        };

        if let Some(cmd_tx) = cmd_tx {
            let _ = cmd_tx.send(DeliveryCommand::Stop).await;
        }
        let _ = futures::future::join_all(handles).await;
        tracing::info!("audio session shut down");
    }
}
