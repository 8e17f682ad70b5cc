use anyhow::{bail, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::file::WavFileInput;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Duration of this frame in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let per_channel = self.samples.len() as u64 / self.channels as u64;
        per_channel * 1000 / self.sample_rate as u64
    }

    /// Convert to the target rate and channel count
    ///
    /// Downsampling is plain decimation and only stereo can be folded to mono;
    /// anything else is passed through unchanged.
    pub fn into_format(self, target_sample_rate: u32, target_channels: u16) -> Self {
        let mut frame = self;

        if frame.channels != target_channels && target_channels == 1 {
            frame = frame.stereo_to_mono();
        }

        if frame.sample_rate != target_sample_rate {
            frame = frame.downsample(target_sample_rate);
        }

        frame
    }

    fn downsample(self, target_rate: u32) -> Self {
        if target_rate == 0 {
            return self;
        }

        let ratio = self.sample_rate / target_rate;
        if ratio <= 1 {
            return self; // Can't upsample
        }

        let channels = self.channels.max(1) as usize;
        let samples: Vec<i16> = self
            .samples
            .chunks_exact(channels)
            .step_by(ratio as usize)
            .flatten()
            .copied()
            .collect();

        Self {
            samples,
            sample_rate: target_rate,
            ..self
        }
    }

    fn stereo_to_mono(self) -> Self {
        if self.channels != 2 {
            return self;
        }

        let samples = self
            .samples
            .chunks_exact(2)
            .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
            .collect();

        Self {
            samples,
            channels: 1,
            ..self
        }
    }
}

/// Configuration for audio input
#[derive(Debug, Clone)]
pub struct AudioInputConfig {
    /// Target sample rate (will downsample if needed)
    pub target_sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Frame size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
    /// Pace frames at capture speed; disable to stream files as fast as possible
    pub realtime: bool,
}

impl Default for AudioInputConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // 16kHz speech input
            target_channels: 1,        // Mono
            buffer_duration_ms: 100,   // 100ms frames
            realtime: true,
        }
    }
}

impl AudioInputConfig {
    pub(crate) fn samples_per_frame(&self) -> usize {
        (self.target_sample_rate as u64 * self.buffer_duration_ms / 1000) as usize
            * self.target_channels.max(1) as usize
    }
}

/// Audio capture owned by a translation session
///
/// `open` hands out the frame stream; the stream ends once the input is
/// closed or, for finite sources, when the source is exhausted.
/// Implementations must also release the source when dropped.
#[async_trait::async_trait]
pub trait AudioInput: Send {
    /// Start capturing audio
    async fn open(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio; safe to call repeatedly
    fn close(&mut self);

    /// Check if the input is currently capturing
    fn is_open(&self) -> bool;

    /// Input name for logging
    fn name(&self) -> &str;
}

/// Where session audio comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Endless paced silence (headless stand-in for a live microphone)
    Silence,
    /// WAV file streamed as if captured live
    File(String),
}

/// Audio input factory
pub struct AudioInputFactory;

impl AudioInputFactory {
    pub fn create(source: AudioSource, config: AudioInputConfig) -> Result<Box<dyn AudioInput>> {
        match source {
            AudioSource::Silence => Ok(Box::new(SilenceInput::new(config))),
            AudioSource::File(path) => Ok(Box::new(WavFileInput::new(path, config))),
        }
    }
}

/// Produces silent frames at a fixed cadence until closed
pub struct SilenceInput {
    config: AudioInputConfig,
    task: Option<JoinHandle<()>>,
}

impl SilenceInput {
    pub fn new(config: AudioInputConfig) -> Self {
        Self { config, task: None }
    }
}

#[async_trait::async_trait]
impl AudioInput for SilenceInput {
    async fn open(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.is_open() {
            bail!("Already capturing");
        }
        if self.config.buffer_duration_ms == 0 {
            bail!("Frame duration must be positive");
        }

        let (tx, rx) = mpsc::channel(32);
        let config = self.config.clone();

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(config.buffer_duration_ms));
            let mut timestamp_ms = 0;

            loop {
                if config.realtime {
                    ticker.tick().await;
                }

                let frame = AudioFrame {
                    samples: vec![0; config.samples_per_frame()],
                    sample_rate: config.target_sample_rate,
                    channels: config.target_channels,
                    timestamp_ms,
                };

                if tx.send(frame).await.is_err() {
                    debug!("Silence input receiver dropped");
                    break;
                }
                timestamp_ms += config.buffer_duration_ms;
            }
        }));

        info!(
            "Silence input opened ({}Hz, {} channels)",
            self.config.target_sample_rate, self.config.target_channels
        );

        Ok(rx)
    }

    fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("Silence input closed");
        }
    }

    fn is_open(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn name(&self) -> &str {
        "silence"
    }
}

impl Drop for SilenceInput {
    fn drop(&mut self) {
        self.close();
    }
}
