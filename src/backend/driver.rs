use super::EventSender;
use crate::audio::AudioFrame;
use crate::events::{CancellationReason, RecognitionEvent};
use anyhow::{bail, Context, Result};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Produces backend events as audio arrives
pub(crate) trait FrameScript: Send + 'static {
    fn on_frame(&mut self, frame: &AudioFrame) -> Vec<RecognitionEvent>;
}

/// Why the recognition loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopExit {
    Stopped,
    EndOfStream,
    ReceiverGone,
}

/// Continuous recognition loop shared by the built-in backends
///
/// Emits `SessionStarted`, feeds every frame to the script, reports
/// `Canceled(EndOfStream)` when the audio ends, and always finishes with
/// `SessionStopped` while the receiver is still listening.
pub(crate) async fn run_recognition<S: FrameScript>(
    mut script: S,
    mut audio: mpsc::Receiver<AudioFrame>,
    events: EventSender,
    mut shutdown: oneshot::Receiver<()>,
) -> LoopExit {
    if events.send(RecognitionEvent::SessionStarted).is_err() {
        return LoopExit::ReceiverGone;
    }

    let exit = loop {
        tokio::select! {
            _ = &mut shutdown => break LoopExit::Stopped,

            frame = audio.recv() => {
                let Some(frame) = frame else {
                    let canceled = RecognitionEvent::Canceled {
                        reason: CancellationReason::EndOfStream,
                        error_code: None,
                        error_details: None,
                    };
                    if events.send(canceled).is_err() {
                        break LoopExit::ReceiverGone;
                    }
                    break LoopExit::EndOfStream;
                };

                let mut gone = false;
                for event in script.on_frame(&frame) {
                    if events.send(event).is_err() {
                        gone = true;
                        break;
                    }
                }
                if gone {
                    break LoopExit::ReceiverGone;
                }
            }
        }
    };

    if exit != LoopExit::ReceiverGone {
        let _ = events.send(RecognitionEvent::SessionStopped);
    }

    debug!("Recognition loop finished: {:?}", exit);
    exit
}

struct Running {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Owns the recognition task of a backend between start and stop
#[derive(Default)]
pub(crate) struct RecognitionTask {
    running: Mutex<Option<Running>>,
}

impl RecognitionTask {
    pub(crate) async fn spawn<F>(&self, backend: &str, make: F) -> Result<()>
    where
        F: FnOnce(oneshot::Receiver<()>) -> JoinHandle<()>,
    {
        let mut running = self.running.lock().await;
        if running.as_ref().is_some_and(|r| !r.task.is_finished()) {
            bail!("{} backend already running", backend);
        }

        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = make(shutdown_rx);
        *running = Some(Running { shutdown, task });

        info!("{} backend started", backend);
        Ok(())
    }

    pub(crate) async fn stop(&self, backend: &str) -> Result<()> {
        let Some(running) = self.running.lock().await.take() else {
            return Ok(());
        };

        // Already finished on its own when the send fails
        let _ = running.shutdown.send(());
        running
            .task
            .await
            .with_context(|| format!("{} recognition task panicked", backend))?;

        info!("{} backend stopped", backend);
        Ok(())
    }
}

impl Drop for RecognitionTask {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            if !running.task.is_finished() {
                warn!("Recognition task dropped while running, aborting");
                running.task.abort();
            }
        }
    }
}
