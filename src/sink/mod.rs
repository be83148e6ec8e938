//! Lip-sync sink module
//!
//! The sink is the downstream consumer of encoded audio windows,
//! typically a rendering engine mapping audio energy to mouth shapes.
//! It may delay or reject submissions arbitrarily; the driver tolerates
//! both.

use async_trait::async_trait;
use thiserror::Error;

use crate::wav::WavBuffer;

/// Sink submission errors
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Submission rejected: {0}")]
    Rejected(String),

    #[error("Sink closed")]
    Closed,
}

/// Consumer of encoded audio windows.
///
/// `submit_audio` is awaited by a fire-and-forget dispatch task, never
/// by the capture loop, so implementations are free to take as long as
/// they need. Buffer ownership transfers to the sink.
#[async_trait]
pub trait LipSyncSink: Send + Sync {
    async fn submit_audio(&self, buffer: WavBuffer) -> Result<(), SinkError>;
}
