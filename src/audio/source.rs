//! Capture source seam.
//!
//! A capture source delivers [`SampleFrame`]s to a callback at a
//! device-chosen cadence. The driver never pulls; sources push.

use thiserror::Error;

use super::frame::SampleFrame;

/// Capture source errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No audio device found")]
    NoDevice,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Capture already started")]
    AlreadyStarted,
}

/// Callback invoked once per captured frame.
pub type FrameCallback = Box<dyn Fn(SampleFrame) + Send + 'static>;

/// A push-based audio source.
///
/// Implementations deliver frames from a dedicated thread; `stop` must
/// be idempotent and safe to call while the callback is firing. When a
/// source stops delivering frames (device loss, end of file, explicit
/// stop) it drops the callback, which the driver observes as stream end.
pub trait CaptureSource: Send {
    /// Sample rate of the frames this source will deliver.
    fn sample_rate(&self) -> u32;

    /// Channel count of the frames this source will deliver.
    fn channels(&self) -> u16;

    /// Start delivering frames to `on_frame`.
    fn start(&mut self, on_frame: FrameCallback) -> Result<(), CaptureError>;

    /// Stop delivering frames.
    fn stop(&mut self);
}
