//! Float-to-PCM WAV encoding.
//!
//! Produces the canonical 44-byte RIFF/WAVE header followed by
//! little-endian signed 16-bit PCM. Downstream lip-sync consumers parse
//! the header fields directly, so the layout is bit-exact and encoding
//! is deterministic.

use std::io::Cursor;
use thiserror::Error;

/// Size of the canonical WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Encoding errors
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Cannot encode an empty sample window")]
    EmptyInput,

    #[error("WAV write error: {0}")]
    WavError(String),
}

/// An encoded PCM WAV byte buffer.
///
/// Constructed once per active window by [`encode`], then handed to the
/// sink. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavBuffer {
    bytes: Vec<u8>,
}

impl WavBuffer {
    /// Full buffer: header plus PCM data.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// The PCM data section after the 44-byte header.
    pub fn data(&self) -> &[u8] {
        &self.bytes[WAV_HEADER_SIZE..]
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Convert a normalized sample to signed 16-bit PCM.
///
/// Clamps to [-1.0, 1.0], then scales asymmetrically: negative samples
/// by 32768 so that -1.0 maps to i16::MIN without overflow, non-negative
/// samples by 32767. Fractional results truncate toward zero.
fn sample_to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode normalized mono samples into a PCM WAV buffer.
///
/// `channels` is the declared channel count for the header; the samples
/// themselves are expected to already be interleaved accordingly (the
/// pipeline only ever passes mono).
pub fn encode(samples: &[f32], sample_rate: u32, channels: u16) -> Result<WavBuffer, EncodeError> {
    if samples.is_empty() {
        return Err(EncodeError::EmptyInput);
    }

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(WAV_HEADER_SIZE + samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| EncodeError::WavError(e.to_string()))?;

        for &sample in samples {
            writer
                .write_sample(sample_to_i16(sample))
                .map_err(|e| EncodeError::WavError(e.to_string()))?;
        }

        writer
            .finalize()
            .map_err(|e| EncodeError::WavError(e.to_string()))?;
    }

    Ok(WavBuffer {
        bytes: cursor.into_inner(),
    })
}
