use super::event::RecognitionEvent;
use super::render::render_event;
use crate::audio::PlaybackHandle;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Receives session events as they are delivered
///
/// Called on the session's delivery task: implementations must return
/// quickly and hand heavy work (playback, uploads) to another context.
/// Event data is borrowed for the duration of the call only.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &RecognitionEvent);
}

/// Prints events in the console line format
pub struct ConsoleSink<W: Write + Send = io::Stdout> {
    source_language: String,
    writer: Mutex<W>,
    playback: Option<PlaybackHandle>,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout(source_language: impl Into<String>) -> Self {
        Self::new(source_language, io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(source_language: impl Into<String>, writer: W) -> Self {
        Self {
            source_language: source_language.into(),
            writer: Mutex::new(writer),
            playback: None,
        }
    }

    /// Forward synthesized audio to a playback worker
    pub fn with_playback(mut self, playback: PlaybackHandle) -> Self {
        self.playback = Some(playback);
        self
    }

    pub fn into_writer(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> EventSink for ConsoleSink<W> {
    fn on_event(&self, event: &RecognitionEvent) {
        let lines = render_event(&self.source_language, event);

        match self.writer.lock() {
            Ok(mut writer) => {
                for line in &lines {
                    if let Err(e) = writeln!(writer, "{}", line) {
                        warn!("Failed to write console output: {}", e);
                        break;
                    }
                }
                writer.flush().ok();
            }
            Err(_) => warn!("Console writer poisoned, dropping {} event", event.kind()),
        }

        if let (RecognitionEvent::Synthesizing(chunk), Some(playback)) = (event, &self.playback) {
            playback.enqueue(chunk.clone());
        }
    }
}

/// Appends every event as one JSON line, for later replay
pub struct EventLogSink {
    writer: Mutex<BufWriter<File>>,
}

impl EventLogSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create event log: {:?}", path))?;

        info!("Recording events to {}", path.display());

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl EventSink for EventLogSink {
    fn on_event(&self, event: &RecognitionEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize {} event: {}", event.kind(), e);
                return;
            }
        };

        if let Ok(mut writer) = self.writer.lock() {
            if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
                warn!("Failed to append to event log: {}", e);
            }
        }
    }
}

/// Delivers each event to several sinks, in registration order
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutSink {
    fn on_event(&self, event: &RecognitionEvent) {
        for sink in &self.sinks {
            sink.on_event(event);
        }
    }
}
