//! Lipstream demo
//!
//! Streams the default microphone (or a WAV file passed as argument)
//! through the pipeline into a sink that just logs what it receives.
//!
//! Usage: `lipstream [config.json] [--file audio.wav]`

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lipstream::audio::{CaptureSource, MicrophoneSource, WavFileSource};
use lipstream::pipeline::{StreamConfig, StreamDriver};
use lipstream::sink::{LipSyncSink, SinkError};
use lipstream::wav::WavBuffer;

/// Sink that logs each submission instead of animating a character.
struct LoggingSink;

#[async_trait]
impl LipSyncSink for LoggingSink {
    async fn submit_audio(&self, buffer: WavBuffer) -> Result<(), SinkError> {
        tracing::info!("Sink received {} byte WAV window", buffer.len());
        Ok(())
    }
}

/// Load config from a JSON file, or fall back to defaults.
fn load_config(path: Option<&str>) -> StreamConfig {
    let Some(path) = path else {
        return StreamConfig::default();
    };
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(config) => {
                tracing::info!("Config loaded from {}", path);
                config
            }
            Err(e) => {
                tracing::warn!("Invalid config, using defaults: {}", e);
                StreamConfig::default()
            }
        },
        Err(e) => {
            tracing::warn!("Cannot read config {}: {}", path, e);
            StreamConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lipstream=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Lipstream v{}", env!("CARGO_PKG_VERSION"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let file = args
        .iter()
        .position(|a| a == "--file")
        .and_then(|i| args.get(i + 1))
        .cloned();
    let config_path = args.iter().find(|a| a.ends_with(".json")).cloned();

    let mut config = load_config(config_path.as_deref());

    let devices = MicrophoneSource::list_devices();
    tracing::info!("Input devices: {:?}", devices);

    let mut driver = if let Some(path) = file {
        let source = WavFileSource::open(&path)?;
        config.sample_rate = source.sample_rate();
        let mut driver = StreamDriver::new(LoggingSink, config);
        driver.start(source).await?;
        driver
    } else {
        let source = MicrophoneSource::new()?;
        config.sample_rate = source.sample_rate();
        let mut driver = StreamDriver::new(LoggingSink, config);
        driver.start(source).await?;
        driver
    };

    tracing::info!("Streaming for 10 seconds...");
    tokio::time::sleep(Duration::from_secs(10)).await;

    driver.stop().await?;

    let stats = driver.stats();
    tracing::info!(
        "Done: {} dispatched, {} silent, {} dropped, {} failed",
        stats.windows_dispatched,
        stats.windows_silent,
        stats.windows_dropped,
        stats.dispatch_failures
    );

    Ok(())
}
