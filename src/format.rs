//! Typed stream format description and boundary sample conversion.

/// Numeric representation of a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleType {
    /// 64-bit float. The pipeline's native representation.
    #[default]
    F64,
    /// 32-bit float, as delivered by most hardware capture callbacks.
    F32,
    /// 16-bit signed integer PCM.
    I16,
}

impl SampleType {
    /// Width of one sample in bytes.
    #[must_use]
    pub fn width(&self) -> usize {
        match self {
            Self::F64 => 8,
            Self::F32 => 4,
            Self::I16 => 2,
        }
    }

    /// Stable lowercase name used in format descriptions.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::F64 => "double",
            Self::F32 => "float",
            Self::I16 => "int",
        }
    }
}

/// Format of one direction of the stream.
///
/// Replaces ad hoc key/value format maps with a fixed struct.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFormatDescription {
    /// Sample representation.
    pub sample_type: SampleType,
    /// Number of channels (the pipeline is mono; 1).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: f64,
}

/// The negotiated input and output formats of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamFormat {
    /// Capture side (hardware input to peer).
    pub input: AudioFormatDescription,
    /// Render side (peer to hardware output).
    pub output: AudioFormatDescription,
}

impl StreamFormat {
    /// Mono f64 on both directions at the given sample rate.
    ///
    /// This is the only format the pipeline currently negotiates.
    #[must_use]
    pub fn mono_f64(sample_rate: f64) -> Self {
        let desc = AudioFormatDescription {
            sample_type: SampleType::F64,
            channels: 1,
            sample_rate,
        };
        Self {
            input: desc,
            output: desc,
        }
    }
}

/// Widens an f32 hardware sample to the pipeline's f64 representation.
#[inline]
pub fn f32_to_f64(sample: f32) -> f64 {
    f64::from(sample)
}

/// Narrows a pipeline f64 sample to an f32 hardware buffer slot.
#[inline]
pub fn f64_to_f32(sample: f64) -> f32 {
    sample as f32
}
