//! Audio capture module
//!
//! Frame types and push-based capture sources (microphone, WAV file).

mod file;
mod frame;
mod microphone;
mod source;

pub use file::WavFileSource;
pub use frame::{downmix_to_mono, SampleFrame};
pub use microphone::MicrophoneSource;
pub use source::{CaptureError, CaptureSource, FrameCallback};
