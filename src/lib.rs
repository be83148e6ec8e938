//! Lipstream - real-time audio to lip-sync streaming
//!
//! Continuously reads microphone (or decoded-file) samples, accumulates
//! them into fixed-duration windows, drops silent windows, encodes each
//! active window as PCM WAV, and forwards the bytes to a lip-sync
//! consumer without ever blocking the capture thread.
//!
//! ```no_run
//! use lipstream::audio::MicrophoneSource;
//! use lipstream::pipeline::{StreamConfig, StreamDriver};
//! use lipstream::sink::{LipSyncSink, SinkError};
//! use lipstream::wav::WavBuffer;
//!
//! struct MySink;
//!
//! #[async_trait::async_trait]
//! impl LipSyncSink for MySink {
//!     async fn submit_audio(&self, _buffer: WavBuffer) -> Result<(), SinkError> {
//!         // hand the bytes to the rendering engine
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> anyhow::Result<()> {
//! let source = MicrophoneSource::new()?;
//! let config = StreamConfig {
//!     sample_rate: 48000,
//!     ..StreamConfig::default()
//! };
//! let mut driver = StreamDriver::new(MySink, config);
//! driver.start(source).await?;
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod pipeline;
pub mod sink;
pub mod wav;

pub use audio::{CaptureError, CaptureSource, MicrophoneSource, SampleFrame, WavFileSource};
pub use pipeline::{DriverError, StreamConfig, StreamDriver, StreamStats, StreamStatus};
pub use sink::{LipSyncSink, SinkError};
pub use wav::{EncodeError, WavBuffer};
