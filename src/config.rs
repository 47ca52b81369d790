//! Pipeline configuration and the jitter-sized buffer policy.

use std::time::Duration;

/// Default time span of samples processed per hardware callback tick (3ms).
pub const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(3);

/// Default target sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: f64 = 48_000.0;

/// Default jitter multiplier.
///
/// The peer may run up to this many hardware ticks behind or ahead before
/// the buffer underruns (silence) or overflows (dropped batch).
pub const DEFAULT_JITTER_MULTIPLIER: f64 = 4.0;

/// Configuration for the audio pipeline.
///
/// The ring buffer is sized from these parameters on every
/// [`AudioSession::start()`] - changing them takes effect on the next
/// start, not in place.
///
/// # Example
///
/// ```
/// use audio_io::PipelineConfig;
/// use std::time::Duration;
///
/// let config = PipelineConfig {
///     frame_duration: Duration::from_millis(5),
///     ..Default::default()
/// };
/// assert_eq!(config.capacity(), 960);
/// ```
///
/// [`AudioSession::start()`]: crate::AudioSession::start
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Nominal duration of one hardware callback tick.
    ///
    /// Smaller values reduce end-to-end latency but shrink the buffer's
    /// slack for late deliveries. Default: 3ms
    pub frame_duration: Duration,

    /// Sample rate in Hz shared by both directions of the stream.
    ///
    /// Default: 48000. The hardware transport may renegotiate this when
    /// the pipeline attaches.
    pub sample_rate: f64,

    /// Buffer slack relative to one tick's worth of samples.
    ///
    /// This is the latency/glitch-tolerance trade-off: a larger
    /// multiplier absorbs burstier peer deliveries at the cost of
    /// buffered latency. Default: 4.0
    pub jitter_multiplier: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_duration: DEFAULT_FRAME_DURATION,
            sample_rate: DEFAULT_SAMPLE_RATE,
            jitter_multiplier: DEFAULT_JITTER_MULTIPLIER,
        }
    }
}

impl PipelineConfig {
    /// Ring buffer capacity in samples.
    ///
    /// `round(frame_duration * sample_rate * jitter_multiplier)`: one
    /// tick's worth of samples times the jitter headroom. With the
    /// defaults this is 576 samples (~12ms of slack at 48kHz).
    #[must_use]
    pub fn capacity(&self) -> usize {
        (self.frame_duration.as_secs_f64() * self.sample_rate * self.jitter_multiplier).round()
            as usize
    }

    /// Number of samples the hardware consumes or produces per tick.
    #[must_use]
    pub fn frame_samples(&self) -> usize {
        (self.frame_duration.as_secs_f64() * self.sample_rate).round() as usize
    }
}
