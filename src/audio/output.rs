use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::events::AudioChunk;

/// Destination for synthesized speech
///
/// Chunks carry 16-bit little-endian PCM; an empty final chunk closes the
/// current utterance.
pub trait AudioSink: Send {
    fn play(&mut self, chunk: &AudioChunk) -> Result<()>;

    /// Flush anything still buffered
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// Discards audio (headless and test environments)
#[derive(Debug, Default)]
pub struct NullAudioSink;

impl AudioSink for NullAudioSink {
    fn play(&mut self, _chunk: &AudioChunk) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Writes each synthesized utterance to its own WAV file
pub struct WavFileSink {
    output_dir: PathBuf,
    sample_rate: u32,
    current: Option<hound::WavWriter<BufWriter<File>>>,
    current_path: Option<PathBuf>,
    utterance_index: usize,
    written: Vec<PathBuf>,
}

impl WavFileSink {
    pub fn new(output_dir: impl Into<PathBuf>, sample_rate: u32) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).context("Failed to create output directory")?;

        info!(
            "Synthesized audio will be written to {} ({}Hz mono)",
            output_dir.display(),
            sample_rate
        );

        Ok(Self {
            output_dir,
            sample_rate,
            current: None,
            current_path: None,
            utterance_index: 0,
            written: Vec::new(),
        })
    }

    /// Files completed so far
    pub fn written_files(&self) -> &[PathBuf] {
        &self.written
    }

    fn start_utterance(&mut self) -> Result<()> {
        let path = self
            .output_dir
            .join(format!("synthesis-{:03}.wav", self.utterance_index));

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        self.current = Some(writer);
        self.current_path = Some(path);
        self.utterance_index += 1;
        Ok(())
    }

    fn finish_utterance(&mut self) -> Result<()> {
        if let Some(writer) = self.current.take() {
            writer.finalize().context("Failed to finalize WAV file")?;
            if let Some(path) = self.current_path.take() {
                info!("Synthesized audio saved: {}", path.display());
                self.written.push(path);
            }
        }
        Ok(())
    }
}

impl AudioSink for WavFileSink {
    fn play(&mut self, chunk: &AudioChunk) -> Result<()> {
        if !chunk.is_empty() {
            if self.current.is_none() {
                self.start_utterance()?;
            }

            if let Some(writer) = &mut self.current {
                for pair in chunk.bytes.chunks_exact(2) {
                    writer
                        .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
                        .context("Failed to write sample to WAV")?;
                }
            }
        }

        if chunk.is_final {
            self.finish_utterance()?;
        }

        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finish_utterance()
    }

    fn name(&self) -> &str {
        "wav"
    }
}

impl Drop for WavFileSink {
    fn drop(&mut self) {
        if let Some(writer) = self.current.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}

/// Where synthesized speech goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioOutput {
    None,
    WavFiles(String),
}

/// Audio sink factory
pub struct AudioSinkFactory;

impl AudioSinkFactory {
    pub fn create(output: AudioOutput, sample_rate: u32) -> Result<Box<dyn AudioSink>> {
        match output {
            AudioOutput::None => Ok(Box::new(NullAudioSink)),
            AudioOutput::WavFiles(dir) => Ok(Box::new(WavFileSink::new(Path::new(&dir), sample_rate)?)),
        }
    }
}

/// Totals reported when the playback worker shuts down
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub chunks: usize,
    pub bytes: usize,
    pub utterances: usize,
    pub failures: usize,
}

enum PlaybackCommand {
    Play(AudioChunk),
    Shutdown,
}

/// Cheap, cloneable handle for queueing audio to the playback worker
#[derive(Clone)]
pub struct PlaybackHandle {
    tx: mpsc::UnboundedSender<PlaybackCommand>,
}

impl PlaybackHandle {
    /// Queue a chunk; never blocks
    pub fn enqueue(&self, chunk: AudioChunk) {
        if self.tx.send(PlaybackCommand::Play(chunk)).is_err() {
            warn!("Playback worker gone, dropping audio chunk");
        }
    }
}

/// Plays synthesized audio on a dedicated blocking worker
///
/// Keeps slow sinks off the event delivery path.
pub struct AudioPlayer {
    tx: mpsc::UnboundedSender<PlaybackCommand>,
    worker: JoinHandle<Result<PlaybackSummary>>,
}

impl AudioPlayer {
    /// Start the worker; must be called inside a tokio runtime
    pub fn spawn(mut sink: Box<dyn AudioSink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();

        info!("Audio playback worker started ({})", sink.name());

        let worker = tokio::task::spawn_blocking(move || {
            let mut summary = PlaybackSummary::default();

            while let Some(command) = rx.blocking_recv() {
                let chunk = match command {
                    PlaybackCommand::Play(chunk) => chunk,
                    PlaybackCommand::Shutdown => break,
                };

                summary.chunks += 1;
                summary.bytes += chunk.len();
                if chunk.is_final {
                    summary.utterances += 1;
                }

                if let Err(e) = sink.play(&chunk) {
                    summary.failures += 1;
                    warn!("Audio playback failed on {}: {:#}", sink.name(), e);
                }
            }

            sink.finish()?;
            info!("Audio playback worker stopped");
            Ok(summary)
        });

        Self { tx, worker }
    }

    pub fn handle(&self) -> PlaybackHandle {
        PlaybackHandle {
            tx: self.tx.clone(),
        }
    }

    /// Play everything queued so far, then stop the worker
    pub async fn shutdown(self) -> Result<PlaybackSummary> {
        // Worker may already be gone; the join below reports why
        let _ = self.tx.send(PlaybackCommand::Shutdown);
        self.worker.await.context("Playback worker panicked")?
    }
}
