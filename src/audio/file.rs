//! WAV file playback source.
//!
//! Decodes a WAV file with hound and replays it through the same
//! callback shape as the microphone: mono frames of a fixed size,
//! paced at real time on a dedicated thread.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::frame::{downmix_to_mono, SampleFrame};
use super::source::{CaptureError, CaptureSource, FrameCallback};

/// Samples per delivered frame, mirroring a typical device buffer.
const FRAME_SIZE: usize = 4096;

enum PlaybackCommand {
    Stop,
}

/// Capture source that plays a decoded WAV file back in real time.
#[derive(Debug)]
pub struct WavFileSource {
    path: PathBuf,
    sample_rate: u32,
    samples: Option<Vec<f32>>,
    command_tx: Option<mpsc::Sender<PlaybackCommand>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl WavFileSource {
    /// Decode `path` up front; playback starts on [`CaptureSource::start`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let path = path.as_ref().to_path_buf();
        let mut reader = hound::WavReader::open(&path)
            .map_err(|e| CaptureError::ConfigError(format!("WAV open error: {}", e)))?;

        let spec = reader.spec();
        let samples = decode_samples(&mut reader, &spec)?;
        let mono = downmix_to_mono(&samples, spec.channels);

        tracing::info!(
            "Loaded {}: {}Hz {}ch, {:.1}s",
            path.display(),
            spec.sample_rate,
            spec.channels,
            mono.len() as f64 / spec.sample_rate as f64
        );

        Ok(Self {
            path,
            sample_rate: spec.sample_rate,
            samples: Some(mono),
            command_tx: None,
            thread_handle: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CaptureSource for WavFileSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        1
    }

    fn start(&mut self, on_frame: FrameCallback) -> Result<(), CaptureError> {
        if self.thread_handle.is_some() {
            return Err(CaptureError::AlreadyStarted);
        }
        let samples = self.samples.take().ok_or(CaptureError::AlreadyStarted)?;
        let sample_rate = self.sample_rate;

        let (command_tx, command_rx) = mpsc::channel();
        self.command_tx = Some(command_tx);

        let thread_handle = thread::spawn(move || {
            run_playback(samples, sample_rate, on_frame, command_rx);
        });
        self.thread_handle = Some(thread_handle);

        Ok(())
    }

    fn stop(&mut self) {
        if let Some(tx) = self.command_tx.take() {
            let _ = tx.send(PlaybackCommand::Stop);
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WavFileSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Decode all samples to normalized f32.
fn decode_samples<R: std::io::Read>(
    reader: &mut hound::WavReader<R>,
    spec: &hound::WavSpec,
) -> Result<Vec<f32>, CaptureError> {
    let samples: Result<Vec<f32>, hound::Error> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect(),
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect()
        }
    };
    samples.map_err(|e| CaptureError::ConfigError(format!("WAV decode error: {}", e)))
}

/// Deliver frames at real-time pace until exhausted or stopped.
fn run_playback(
    samples: Vec<f32>,
    sample_rate: u32,
    on_frame: FrameCallback,
    command_rx: mpsc::Receiver<PlaybackCommand>,
) {
    let frame_duration =
        Duration::from_secs_f64(FRAME_SIZE as f64 / sample_rate.max(1) as f64);

    for chunk in samples.chunks(FRAME_SIZE) {
        on_frame(SampleFrame::mono(chunk.to_vec(), sample_rate));

        // The command channel doubles as the pacing clock.
        match command_rx.recv_timeout(frame_duration) {
            Ok(PlaybackCommand::Stop) => {
                tracing::info!("Playback stopped");
                return;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => return,
        }
    }

    tracing::info!("Playback finished");
}
