//! CPAL-backed hardware transport.
//!
//! This is the thin platform shim between the pipeline adapters and real
//! audio devices. CPAL streams are not `Send`, so the streams live on a
//! dedicated audio control thread owned by the transport; lifecycle calls
//! are forwarded to it over a channel.

use std::sync::mpsc;
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream};

use crate::error::AudioIoError;
use crate::format::{f64_to_f32, StreamFormat};
use crate::pipeline::{CaptureAdapter, RenderAdapter};
use crate::transport::HardwareTransport;

enum ThreadCommand {
    Play(mpsc::Sender<Result<(), AudioIoError>>),
    Pause,
    Shutdown,
}

struct AudioThread {
    cmd_tx: mpsc::Sender<ThreadCommand>,
    join: Option<JoinHandle<()>>,
}

impl Drop for AudioThread {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(ThreadCommand::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Duplex hardware transport over the system's default CPAL devices.
///
/// Built streams start paused; [`HardwareTransport::start`] begins
/// playback and capture, [`HardwareTransport::stop`] pauses both, and
/// [`HardwareTransport::detach`] tears the streams down.
///
/// The pipeline is mono: multi-channel input devices are downmixed by
/// averaging, and the rendered mono signal is duplicated across output
/// channels.
pub struct CpalTransport {
    input_device: Option<String>,
    output_device: Option<String>,
    thread: Option<AudioThread>,
}

impl CpalTransport {
    /// Uses the system default input and output devices.
    #[must_use]
    pub fn default_devices() -> Self {
        Self {
            input_device: None,
            output_device: None,
            thread: None,
        }
    }

    /// Uses specific devices by name (`None` falls back to the default).
    #[must_use]
    pub fn with_devices(input: Option<String>, output: Option<String>) -> Self {
        Self {
            input_device: input,
            output_device: output,
            thread: None,
        }
    }
}

impl HardwareTransport for CpalTransport {
    fn attach(
        &mut self,
        render: RenderAdapter,
        capture: CaptureAdapter,
        _format: &StreamFormat,
    ) -> Result<f64, AudioIoError> {
        if self.thread.is_some() {
            self.detach();
        }

        let (cmd_tx, cmd_rx) = mpsc::channel::<ThreadCommand>();
        let (setup_tx, setup_rx) = mpsc::channel::<Result<f64, AudioIoError>>();
        let input_name = self.input_device.clone();
        let output_name = self.output_device.clone();

        let join = std::thread::Builder::new()
            .name("audio-io-hw".to_string())
            .spawn(move || {
                let streams = match build_streams(
                    input_name.as_deref(),
                    output_name.as_deref(),
                    render,
                    capture,
                ) {
                    Ok((input, output, sample_rate)) => {
                        let _ = setup_tx.send(Ok(sample_rate));
                        (input, output)
                    }
                    Err(e) => {
                        let _ = setup_tx.send(Err(e));
                        return;
                    }
                };

                run_control_loop(&cmd_rx, &streams.0, &streams.1);
            })
            .map_err(|e| AudioIoError::Backend(e.to_string()))?;

        let sample_rate = setup_rx
            .recv()
            .map_err(|_| AudioIoError::PipelineAttach {
                reason: "audio thread exited during setup".to_string(),
            })??;

        self.thread = Some(AudioThread {
            cmd_tx,
            join: Some(join),
        });
        tracing::info!(sample_rate, "cpal transport attached");
        Ok(sample_rate)
    }

    fn detach(&mut self) {
        // AudioThread::drop shuts the control thread down and joins it
        if self.thread.take().is_some() {
            tracing::info!("cpal transport detached");
        }
    }

    fn start(&mut self) -> Result<(), AudioIoError> {
        let thread = self.thread.as_ref().ok_or(AudioIoError::PipelineAttach {
            reason: "transport not attached".to_string(),
        })?;

        let (ack_tx, ack_rx) = mpsc::channel();
        thread
            .cmd_tx
            .send(ThreadCommand::Play(ack_tx))
            .map_err(|_| AudioIoError::EngineStart {
                reason: "audio thread gone".to_string(),
            })?;
        ack_rx.recv().map_err(|_| AudioIoError::EngineStart {
            reason: "audio thread gone".to_string(),
        })?
    }

    fn stop(&mut self) {
        if let Some(thread) = self.thread.as_ref() {
            let _ = thread.cmd_tx.send(ThreadCommand::Pause);
        }
    }
}

fn run_control_loop(cmd_rx: &mpsc::Receiver<ThreadCommand>, input: &Stream, output: &Stream) {
    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            ThreadCommand::Play(ack) => {
                let result = input
                    .play()
                    .and_then(|()| output.play())
                    .map_err(|e| AudioIoError::EngineStart {
                        reason: e.to_string(),
                    });
                let _ = ack.send(result);
            }
            ThreadCommand::Pause => {
                let _ = input.pause();
                let _ = output.pause();
            }
            ThreadCommand::Shutdown => break,
        }
    }
    // Streams drop here, on the thread that built them
}

fn find_device(
    devices: impl Iterator<Item = cpal::Device>,
    name: &str,
) -> Result<cpal::Device, AudioIoError> {
    for device in devices {
        if device.name().is_ok_and(|n| n == name) {
            return Ok(device);
        }
    }
    Err(AudioIoError::DeviceNotFound {
        name: name.to_string(),
    })
}

#[allow(clippy::type_complexity)]
fn build_streams(
    input_name: Option<&str>,
    output_name: Option<&str>,
    render: RenderAdapter,
    capture: CaptureAdapter,
) -> Result<(Stream, Stream, f64), AudioIoError> {
    let host = cpal::default_host();

    let input_device = match input_name {
        Some(name) => find_device(
            host.input_devices()
                .map_err(|e| AudioIoError::Backend(e.to_string()))?,
            name,
        )?,
        None => host
            .default_input_device()
            .ok_or(AudioIoError::NoDefaultDevice)?,
    };
    let output_device = match output_name {
        Some(name) => find_device(
            host.output_devices()
                .map_err(|e| AudioIoError::Backend(e.to_string()))?,
            name,
        )?,
        None => host
            .default_output_device()
            .ok_or(AudioIoError::NoDefaultDevice)?,
    };

    let input_config = input_device
        .default_input_config()
        .map_err(|e| AudioIoError::Backend(e.to_string()))?;
    let output_config = output_device
        .default_output_config()
        .map_err(|e| AudioIoError::Backend(e.to_string()))?;

    if input_config.sample_format() != SampleFormat::F32 {
        return Err(AudioIoError::UnsupportedFormat {
            format: format!("{:?}", input_config.sample_format()),
        });
    }
    if output_config.sample_format() != SampleFormat::F32 {
        return Err(AudioIoError::UnsupportedFormat {
            format: format!("{:?}", output_config.sample_format()),
        });
    }

    let sample_rate = f64::from(input_config.sample_rate().0);
    let input_channels = input_config.channels() as usize;
    let output_channels = output_config.channels() as usize;

    let input_stream = build_input_stream(&input_device, &input_config.into(), input_channels, capture)?;
    let output_stream =
        build_output_stream(&output_device, &output_config.into(), output_channels, render)?;

    Ok((input_stream, output_stream, sample_rate))
}

fn build_input_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    capture: CaptureAdapter,
) -> Result<Stream, AudioIoError> {
    let mut mono = Vec::new();
    device
        .build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if channels == 1 {
                    capture.capture(data);
                } else {
                    // Downmix to mono by averaging each frame
                    mono.clear();
                    mono.extend(data.chunks_exact(channels).map(|frame| {
                        frame.iter().sum::<f32>() / channels as f32
                    }));
                    capture.capture(&mono);
                }
            },
            |err| {
                tracing::error!("input stream error: {err}");
            },
            None,
        )
        .map_err(|e| AudioIoError::Backend(e.to_string()))
}

fn build_output_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    render: RenderAdapter,
) -> Result<Stream, AudioIoError> {
    // Scratch grows to the tick size on the first callback and is reused
    // from then on.
    let mut scratch: Vec<f64> = Vec::new();
    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                scratch.resize(frames, 0.0);
                render.render(&mut scratch);
                for (frame, &sample) in data.chunks_exact_mut(channels).zip(scratch.iter()) {
                    frame.fill(f64_to_f32(sample));
                }
            },
            |err| {
                tracing::error!("output stream error: {err}");
            },
            None,
        )
        .map_err(|e| AudioIoError::Backend(e.to_string()))
}
