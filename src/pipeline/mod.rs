//! Streaming pipeline module
//!
//! Accumulation, silence gating, optional smoothing, and the driver
//! that ties capture to the sink.

mod accumulator;
mod dispatch;
mod driver;
mod silence;
mod smoothing;
mod stats;

pub use accumulator::{AccumulatorError, SampleAccumulator};
pub use driver::{DriverError, StreamConfig, StreamDriver, StreamStatus};
pub use silence::{classify, WindowClassification, DEFAULT_SILENCE_THRESHOLD};
pub use smoothing::ExponentialSmoother;
pub use stats::StreamStats;
