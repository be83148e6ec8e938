//! Stream driver
//!
//! Orchestrates capture -> accumulate -> silence gate -> encode ->
//! dispatch. The capture thread only pushes frames into a channel; all
//! pipeline work happens on a spawned processing task, and sink
//! submissions are fire-and-forget so they can never stall capture.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};

use super::accumulator::SampleAccumulator;
use super::dispatch::Dispatcher;
use super::silence::{classify, WindowClassification, DEFAULT_SILENCE_THRESHOLD};
use super::smoothing::ExponentialSmoother;
use super::stats::{Counters, StreamStats};
use crate::audio::{CaptureError, CaptureSource, SampleFrame};
use crate::sink::LipSyncSink;
use crate::wav;

/// Stream configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StreamConfig {
    /// Sample rate of the capture source (Hz). Must match the source;
    /// the pipeline never resamples.
    pub sample_rate: u32,
    /// Window duration in seconds
    #[serde(default = "default_window_duration")]
    pub window_duration_secs: f32,
    /// Amplitude below which a window is dropped as silent
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold: f32,
    /// Maximum concurrent in-flight sink submissions
    #[serde(default = "default_max_outstanding")]
    pub max_outstanding_dispatches: usize,
    /// Optional exponential smoothing factor in (0, 1]
    #[serde(default)]
    pub smoothing: Option<f32>,
}

fn default_window_duration() -> f32 {
    0.3
}

fn default_silence_threshold() -> f32 {
    DEFAULT_SILENCE_THRESHOLD
}

fn default_max_outstanding() -> usize {
    4
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            window_duration_secs: default_window_duration(),
            silence_threshold: default_silence_threshold(),
            max_outstanding_dispatches: default_max_outstanding(),
            smoothing: None,
        }
    }
}

impl StreamConfig {
    /// Window size in samples at the configured rate.
    ///
    /// Rounded to the nearest sample so that durations like 0.01 survive
    /// the f32 representation.
    pub fn samples_per_window(&self) -> usize {
        (self.sample_rate as f64 * self.window_duration_secs as f64).round() as usize
    }

    fn validate(&self) -> Result<(), DriverError> {
        if self.sample_rate == 0 {
            return Err(DriverError::InvalidConfig("sample_rate must be > 0".into()));
        }
        if !self.window_duration_secs.is_finite() || self.window_duration_secs <= 0.0 {
            return Err(DriverError::InvalidConfig(
                "window_duration_secs must be positive".into(),
            ));
        }
        if self.samples_per_window() == 0 {
            return Err(DriverError::InvalidConfig(
                "window shorter than one sample".into(),
            ));
        }
        if !self.silence_threshold.is_finite() || self.silence_threshold < 0.0 {
            return Err(DriverError::InvalidConfig(
                "silence_threshold must be >= 0".into(),
            ));
        }
        if self.max_outstanding_dispatches == 0 {
            return Err(DriverError::InvalidConfig(
                "max_outstanding_dispatches must be >= 1".into(),
            ));
        }
        if let Some(alpha) = self.smoothing {
            if !alpha.is_finite() || alpha <= 0.0 || alpha > 1.0 {
                return Err(DriverError::InvalidConfig(
                    "smoothing factor must be in (0, 1]".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Driver errors
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Sample rate mismatch: configured {configured}Hz, source delivers {actual}Hz")]
    SampleRateMismatch { configured: u32, actual: u32 },

    #[error("Stream already running")]
    AlreadyRunning,
}

/// Stream state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// Never started
    Idle,
    /// Start in progress
    Starting,
    /// Capturing; dispatch runs concurrently and never blocks this state
    Capturing,
    /// Stop in progress
    Stopping,
    /// Stopped by request or device loss
    Stopped,
}

/// Drives one capture stream into a lip-sync sink.
pub struct StreamDriver {
    config: StreamConfig,
    sink: Arc<dyn LipSyncSink>,
    status: Arc<RwLock<StreamStatus>>,
    counters: Arc<Counters>,
    source: Option<Box<dyn CaptureSource>>,
    stop_tx: Option<mpsc::Sender<()>>,
}

impl StreamDriver {
    pub fn new(sink: impl LipSyncSink + 'static, config: StreamConfig) -> Self {
        Self {
            config,
            sink: Arc::new(sink),
            status: Arc::new(RwLock::new(StreamStatus::Idle)),
            counters: Arc::new(Counters::default()),
            source: None,
            stop_tx: None,
        }
    }

    /// Start streaming from `source`.
    ///
    /// Fails fast on configuration errors; a stream that starts will
    /// only stop on [`stop`](Self::stop) or capture device loss.
    pub async fn start(
        &mut self,
        mut source: impl CaptureSource + 'static,
    ) -> Result<(), DriverError> {
        {
            let status = self.status.read().await;
            if matches!(*status, StreamStatus::Starting | StreamStatus::Capturing) {
                return Err(DriverError::AlreadyRunning);
            }
        }

        self.config.validate()?;
        if source.sample_rate() != self.config.sample_rate {
            return Err(DriverError::SampleRateMismatch {
                configured: self.config.sample_rate,
                actual: source.sample_rate(),
            });
        }

        {
            let mut status = self.status.write().await;
            *status = StreamStatus::Starting;
        }

        // Channel from the capture thread to the processing task
        let (frame_tx, frame_rx) = mpsc::unbounded_channel::<SampleFrame>();

        // Channel to stop the processing task
        let (stop_tx, stop_rx) = mpsc::channel::<()>(1);
        self.stop_tx = Some(stop_tx);

        if let Err(e) = source.start(Box::new(move |frame| {
            let _ = frame_tx.send(frame);
        })) {
            let mut status = self.status.write().await;
            *status = StreamStatus::Idle;
            self.stop_tx = None;
            return Err(e.into());
        }
        self.source = Some(Box::new(source));

        let task = ProcessingTask {
            accumulator: SampleAccumulator::new(
                self.config.sample_rate,
                self.config.samples_per_window(),
            ),
            smoother: self.config.smoothing.map(ExponentialSmoother::new),
            dispatcher: Dispatcher::new(
                Arc::clone(&self.sink),
                self.config.max_outstanding_dispatches,
                Arc::clone(&self.counters),
            ),
            counters: Arc::clone(&self.counters),
            sample_rate: self.config.sample_rate,
            silence_threshold: self.config.silence_threshold,
        };
        tokio::spawn(task.run(frame_rx, stop_rx, Arc::clone(&self.status)));

        {
            let mut status = self.status.write().await;
            *status = StreamStatus::Capturing;
        }

        tracing::info!(
            "Stream started: {}Hz, {} sample windows, threshold {}",
            self.config.sample_rate,
            self.config.samples_per_window(),
            self.config.silence_threshold
        );
        Ok(())
    }

    /// Stop the stream.
    ///
    /// Discards the accumulator residual and issues best-effort
    /// cancellation to outstanding dispatches without awaiting them.
    pub async fn stop(&mut self) -> Result<(), DriverError> {
        {
            let status = self.status.read().await;
            if matches!(*status, StreamStatus::Idle | StreamStatus::Stopped) {
                return Ok(());
            }
        }

        {
            let mut status = self.status.write().await;
            *status = StreamStatus::Stopping;
        }

        // Signal the processing task
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(()).await;
        }

        // Stop the capture source
        if let Some(mut source) = self.source.take() {
            source.stop();
        }

        {
            let mut status = self.status.write().await;
            *status = StreamStatus::Stopped;
        }

        tracing::info!("Stream stopped");
        Ok(())
    }

    pub async fn status(&self) -> StreamStatus {
        *self.status.read().await
    }

    pub fn stats(&self) -> StreamStats {
        self.counters.snapshot()
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}

/// State owned by the spawned processing task.
struct ProcessingTask {
    accumulator: SampleAccumulator,
    smoother: Option<ExponentialSmoother>,
    dispatcher: Dispatcher,
    counters: Arc<Counters>,
    sample_rate: u32,
    silence_threshold: f32,
}

impl ProcessingTask {
    async fn run(
        mut self,
        mut frame_rx: mpsc::UnboundedReceiver<SampleFrame>,
        mut stop_rx: mpsc::Receiver<()>,
        status: Arc<RwLock<StreamStatus>>,
    ) {
        loop {
            tokio::select! {
                frame = frame_rx.recv() => match frame {
                    Some(frame) => self.process_frame(frame),
                    None => {
                        tracing::warn!("Capture device lost, stopping stream");
                        break;
                    }
                },
                _ = stop_rx.recv() => {
                    tracing::debug!("Stop signal received");
                    break;
                }
            }
        }

        self.accumulator.reset();
        self.dispatcher.abort_all();

        let mut status = status.write().await;
        *status = StreamStatus::Stopped;
    }

    /// Feed one frame through the pipeline.
    ///
    /// Accumulator and encoder errors are logged and the offending data
    /// skipped; propagating them would abort the whole capture session.
    fn process_frame(&mut self, frame: SampleFrame) {
        let windows = match self.accumulator.append(&frame) {
            Ok(windows) => windows,
            Err(e) => {
                tracing::error!("Dropping frame: {}", e);
                return;
            }
        };

        for mut window in windows {
            if classify(&window, self.silence_threshold) == WindowClassification::Silent {
                self.counters.windows_silent.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Silent window skipped");
                continue;
            }

            if let Some(smoother) = self.smoother.as_mut() {
                smoother.process(&mut window);
            }

            match wav::encode(&window, self.sample_rate, 1) {
                Ok(buffer) => self.dispatcher.dispatch(buffer),
                Err(e) => tracing::error!("Encode error: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::FrameCallback;
    use crate::sink::SinkError;
    use crate::wav::WavBuffer;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Capture source driven by hand from the test body.
    #[derive(Clone)]
    struct ScriptedSource {
        sample_rate: u32,
        callback: Arc<Mutex<Option<FrameCallback>>>,
    }

    impl ScriptedSource {
        fn new(sample_rate: u32) -> Self {
            Self {
                sample_rate,
                callback: Arc::new(Mutex::new(None)),
            }
        }

        fn push(&self, samples: Vec<f32>) {
            let callback = self.callback.lock().unwrap();
            if let Some(callback) = callback.as_ref() {
                callback(SampleFrame::mono(samples, self.sample_rate));
            }
        }

        /// Simulate device loss: the callback disappears mid-stream.
        fn disconnect(&self) {
            self.callback.lock().unwrap().take();
        }
    }

    impl CaptureSource for ScriptedSource {
        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn channels(&self) -> u16 {
            1
        }

        fn start(&mut self, on_frame: FrameCallback) -> Result<(), CaptureError> {
            *self.callback.lock().unwrap() = Some(on_frame);
            Ok(())
        }

        fn stop(&mut self) {
            self.callback.lock().unwrap().take();
        }
    }

    #[derive(Clone, Default)]
    struct CountingSink {
        submissions: Arc<AtomicUsize>,
        last_len: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LipSyncSink for CountingSink {
        async fn submit_audio(&self, buffer: WavBuffer) -> Result<(), SinkError> {
            self.last_len.store(buffer.len(), Ordering::SeqCst);
            self.submissions.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct StuckSink;

    #[async_trait]
    impl LipSyncSink for StuckSink {
        async fn submit_audio(&self, _buffer: WavBuffer) -> Result<(), SinkError> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    struct RejectingSink;

    #[async_trait]
    impl LipSyncSink for RejectingSink {
        async fn submit_audio(&self, _buffer: WavBuffer) -> Result<(), SinkError> {
            Err(SinkError::Rejected("sink busy".into()))
        }
    }

    /// 160-sample windows at 16kHz keep the tests fast.
    fn small_config() -> StreamConfig {
        StreamConfig {
            sample_rate: 16000,
            window_duration_secs: 0.01,
            ..StreamConfig::default()
        }
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..400 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached within timeout");
    }

    #[tokio::test]
    async fn active_window_reaches_sink() {
        let sink = CountingSink::default();
        let mut driver = StreamDriver::new(sink.clone(), small_config());
        let source = ScriptedSource::new(16000);

        driver.start(source.clone()).await.unwrap();
        source.push(vec![0.5; 160]);

        wait_until(|| sink.submissions.load(Ordering::SeqCst) == 1).await;
        // 44-byte header + 160 samples of 16-bit PCM
        assert_eq!(sink.last_len.load(Ordering::SeqCst), 44 + 320);
        assert_eq!(driver.stats().windows_dispatched, 1);

        driver.stop().await.unwrap();
    }

    #[tokio::test]
    async fn device_cadence_fills_default_window() {
        let sink = CountingSink::default();
        let mut driver = StreamDriver::new(sink.clone(), StreamConfig::default());
        let source = ScriptedSource::new(48000);

        driver.start(source.clone()).await.unwrap();
        assert_eq!(driver.config().samples_per_window(), 14400);

        source.push(vec![0.5; 4096]);
        source.push(vec![0.5; 4096]);
        source.push(vec![0.5; 6208]);

        wait_until(|| sink.submissions.load(Ordering::SeqCst) == 1).await;
        assert_eq!(sink.last_len.load(Ordering::SeqCst), 44 + 14400 * 2);

        driver.stop().await.unwrap();
    }

    #[tokio::test]
    async fn silent_window_produces_no_dispatch() {
        let sink = CountingSink::default();
        let mut driver = StreamDriver::new(sink.clone(), small_config());
        let source = ScriptedSource::new(16000);

        driver.start(source.clone()).await.unwrap();
        source.push(vec![0.0005; 160]);

        wait_until(|| driver.stats().windows_silent == 1).await;
        assert_eq!(sink.submissions.load(Ordering::SeqCst), 0);
        assert_eq!(driver.stats().windows_dispatched, 0);

        driver.stop().await.unwrap();
    }

    #[tokio::test]
    async fn backpressure_bounds_inflight_dispatches() {
        let mut config = small_config();
        config.max_outstanding_dispatches = 2;
        let mut driver = StreamDriver::new(StuckSink, config);
        let source = ScriptedSource::new(16000);

        driver.start(source.clone()).await.unwrap();
        for _ in 0..5 {
            source.push(vec![0.5; 160]);
        }

        wait_until(|| {
            let stats = driver.stats();
            stats.windows_dispatched + stats.windows_dropped == 5
        })
        .await;
        let stats = driver.stats();
        assert_eq!(stats.windows_dispatched, 2);
        assert_eq!(stats.windows_dropped, 3);

        driver.stop().await.unwrap();
    }

    #[tokio::test]
    async fn sink_failure_does_not_stop_stream() {
        let mut driver = StreamDriver::new(RejectingSink, small_config());
        let source = ScriptedSource::new(16000);

        driver.start(source.clone()).await.unwrap();
        source.push(vec![0.5; 160]);
        wait_until(|| driver.stats().dispatch_failures == 1).await;

        source.push(vec![0.5; 160]);
        wait_until(|| driver.stats().dispatch_failures == 2).await;

        assert_eq!(driver.status().await, StreamStatus::Capturing);
        driver.stop().await.unwrap();
    }

    #[tokio::test]
    async fn start_validates_sample_rate() {
        let mut driver = StreamDriver::new(CountingSink::default(), small_config());
        let source = ScriptedSource::new(44100);

        let err = driver.start(source).await.unwrap_err();
        assert!(matches!(
            err,
            DriverError::SampleRateMismatch {
                configured: 16000,
                actual: 44100
            }
        ));
        assert_eq!(driver.status().await, StreamStatus::Idle);
    }

    #[tokio::test]
    async fn start_rejects_invalid_config() {
        let mut config = small_config();
        config.max_outstanding_dispatches = 0;
        let mut driver = StreamDriver::new(CountingSink::default(), config);

        let err = driver.start(ScriptedSource::new(16000)).await.unwrap_err();
        assert!(matches!(err, DriverError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn start_twice_is_already_running() {
        let mut driver = StreamDriver::new(CountingSink::default(), small_config());
        driver.start(ScriptedSource::new(16000)).await.unwrap();

        let err = driver.start(ScriptedSource::new(16000)).await.unwrap_err();
        assert!(matches!(err, DriverError::AlreadyRunning));

        driver.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let mut driver = StreamDriver::new(CountingSink::default(), small_config());
        assert_eq!(driver.status().await, StreamStatus::Idle);
        driver.stop().await.unwrap();

        driver.start(ScriptedSource::new(16000)).await.unwrap();
        driver.stop().await.unwrap();
        assert_eq!(driver.status().await, StreamStatus::Stopped);
        driver.stop().await.unwrap();
        assert_eq!(driver.status().await, StreamStatus::Stopped);
    }

    #[tokio::test]
    async fn device_loss_stops_stream() {
        let mut driver = StreamDriver::new(CountingSink::default(), small_config());
        let source = ScriptedSource::new(16000);

        driver.start(source.clone()).await.unwrap();
        source.push(vec![0.5; 40]);
        source.disconnect();

        wait_until_status(&driver, StreamStatus::Stopped).await;
    }

    async fn wait_until_status(driver: &StreamDriver, expected: StreamStatus) {
        for _ in 0..400 {
            if driver.status().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("status never reached {:?}", expected);
    }
}
