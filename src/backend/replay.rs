use super::driver::{run_recognition, FrameScript, RecognitionTask};
use super::{EventSender, SpeechTranslator};
use crate::audio::AudioFrame;
use crate::events::RecognitionEvent;
use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::info;

/// Read a JSON-lines event log, skipping blank lines
pub fn load_event_log(path: impl AsRef<Path>) -> Result<Vec<RecognitionEvent>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event log: {:?}", path))?;

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Invalid event on line {} of {:?}", i + 1, path))
        })
        .collect()
}

/// Replays a recorded session, one event per audio frame
///
/// Recorded session start/stop markers are dropped; the replay reports its
/// own lifecycle.
pub struct ReplayTranslator {
    path: PathBuf,
    task: RecognitionTask,
}

impl ReplayTranslator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            task: RecognitionTask::default(),
        }
    }
}

struct Replay {
    pending: VecDeque<RecognitionEvent>,
}

impl FrameScript for Replay {
    fn on_frame(&mut self, _frame: &AudioFrame) -> Vec<RecognitionEvent> {
        self.pending.pop_front().into_iter().collect()
    }
}

#[async_trait::async_trait]
impl SpeechTranslator for ReplayTranslator {
    async fn start(&self, audio: mpsc::Receiver<AudioFrame>, events: EventSender) -> Result<()> {
        let path = self.path.clone();
        let recorded = tokio::task::spawn_blocking(move || load_event_log(path))
            .await
            .context("Event log reader task failed")??;

        let pending: VecDeque<RecognitionEvent> = recorded
            .into_iter()
            .filter(|e| {
                !matches!(
                    e,
                    RecognitionEvent::SessionStarted | RecognitionEvent::SessionStopped
                )
            })
            .collect();

        info!("Replaying {} events from {}", pending.len(), self.path.display());

        self.task
            .spawn(self.name(), move |shutdown| {
                tokio::spawn(async move {
                    run_recognition(Replay { pending }, audio, events, shutdown).await;
                })
            })
            .await
    }

    async fn stop(&self) -> Result<()> {
        self.task.stop(self.name()).await
    }

    fn name(&self) -> &str {
        "replay"
    }
}
