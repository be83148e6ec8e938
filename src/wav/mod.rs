//! WAV encoding module

mod encoder;

pub use encoder::{encode, EncodeError, WavBuffer, WAV_HEADER_SIZE};
