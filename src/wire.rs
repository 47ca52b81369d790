//! Wire encoding for sample batches.
//!
//! Samples cross the peer boundary as tightly packed little-endian f64
//! values with no framing or length prefix beyond what the transport
//! itself provides. Decoding rejects buffers whose byte length is not a
//! multiple of the sample width; the batch is discarded, never a crash.

use crate::error::WireError;
use crate::format::f32_to_f64;

/// Width of one wire sample in bytes.
pub const SAMPLE_WIDTH: usize = std::mem::size_of::<f64>();

/// Encodes a batch of samples into wire bytes.
#[must_use]
pub fn encode(samples: &[f64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * SAMPLE_WIDTH);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Encodes f32 hardware frames, widening to the f64 wire representation.
///
/// Used by the capture adapter, which receives f32 buffers from the
/// hardware input callback.
#[must_use]
pub fn encode_frames(frames: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(frames.len() * SAMPLE_WIDTH);
    for &frame in frames {
        bytes.extend_from_slice(&f32_to_f64(frame).to_le_bytes());
    }
    bytes
}

/// Decodes wire bytes into a batch of samples.
///
/// # Errors
///
/// Returns [`WireError::Misaligned`] if `bytes.len()` is not a multiple
/// of [`SAMPLE_WIDTH`].
pub fn decode(bytes: &[u8]) -> Result<Vec<f64>, WireError> {
    if bytes.len() % SAMPLE_WIDTH != 0 {
        return Err(WireError::Misaligned {
            len: bytes.len(),
            width: SAMPLE_WIDTH,
        });
    }

    Ok(bytes
        .chunks_exact(SAMPLE_WIDTH)
        .map(|chunk| {
            // chunks_exact guarantees the slice length
            let mut raw = [0u8; SAMPLE_WIDTH];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        })
        .collect())
}
