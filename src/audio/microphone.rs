//! Microphone capture source.
//!
//! Uses cpal for cross-platform capture. Audio is captured in a
//! dedicated thread and delivered to the driver as mono frames at the
//! device's native sample rate. No resampling is performed.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use super::frame::{downmix_to_mono, SampleFrame};
use super::source::{CaptureError, CaptureSource, FrameCallback};

/// Commands to control the capture thread
enum AudioCommand {
    Stop,
}

/// Microphone capture source backed by the default cpal input device.
///
/// Multi-channel devices are downmixed to mono in the device callback,
/// so delivered frames always declare one channel.
pub struct MicrophoneSource {
    sample_rate: u32,
    device_channels: u16,
    command_tx: Option<mpsc::Sender<AudioCommand>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl MicrophoneSource {
    /// Probe the default input device and record its native format.
    pub fn new() -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        let supported_config = device
            .default_input_config()
            .map_err(|e| CaptureError::ConfigError(e.to_string()))?;

        tracing::info!(
            "Audio device: {:?} ({}Hz {}ch)",
            device.name(),
            supported_config.sample_rate().0,
            supported_config.channels()
        );

        Ok(Self {
            sample_rate: supported_config.sample_rate().0,
            device_channels: supported_config.channels(),
            command_tx: None,
            thread_handle: None,
        })
    }

    /// List available input devices
    pub fn list_devices() -> Vec<String> {
        let host = cpal::default_host();
        host.input_devices()
            .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
            .unwrap_or_default()
    }
}

impl CaptureSource for MicrophoneSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        // Frames are downmixed before delivery.
        1
    }

    fn start(&mut self, on_frame: FrameCallback) -> Result<(), CaptureError> {
        if self.thread_handle.is_some() {
            return Err(CaptureError::AlreadyStarted);
        }

        let (command_tx, command_rx) = mpsc::channel();
        self.command_tx = Some(command_tx.clone());

        let thread_handle = thread::spawn(move || {
            if let Err(e) = run_capture(on_frame, command_tx, command_rx) {
                tracing::error!("Audio capture error: {}", e);
            }
        });
        self.thread_handle = Some(thread_handle);

        Ok(())
    }

    fn stop(&mut self) {
        if let Some(tx) = self.command_tx.take() {
            let _ = tx.send(AudioCommand::Stop);
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run the capture stream on the dedicated thread.
///
/// The stream error callback requests shutdown through the same command
/// channel as an explicit stop; in both cases the frame callback is
/// dropped when this function returns, which the driver observes as the
/// end of the stream.
fn run_capture(
    on_frame: FrameCallback,
    command_tx: mpsc::Sender<AudioCommand>,
    command_rx: mpsc::Receiver<AudioCommand>,
) -> Result<(), CaptureError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

    let supported_config = device
        .default_input_config()
        .map_err(|e| CaptureError::ConfigError(e.to_string()))?;

    let sample_rate = supported_config.sample_rate().0;
    let channels = supported_config.channels();

    tracing::info!("Audio config: {}Hz {}ch -> mono", sample_rate, channels);

    let stream_config = supported_config.into();

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mono = downmix_to_mono(data, channels);
                if !mono.is_empty() {
                    on_frame(SampleFrame::mono(mono, sample_rate));
                }
            },
            move |err| {
                tracing::error!("Audio stream error: {}", err);
                let _ = command_tx.send(AudioCommand::Stop);
            },
            None,
        )
        .map_err(|e| CaptureError::StreamError(e.to_string()))?;

    stream
        .play()
        .map_err(|e| CaptureError::StreamError(e.to_string()))?;

    tracing::info!("Audio capture started");

    // Wait for stop signal
    loop {
        match command_rx.recv_timeout(std::time::Duration::from_millis(100)) {
            Ok(AudioCommand::Stop) => {
                tracing::info!("Audio capture stopped");
                break;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}
