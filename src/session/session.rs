use super::config::SessionConfig;
use super::stats::{SessionStats, StatsCounter};
use crate::audio::AudioInput;
use crate::backend::SpeechTranslator;
use crate::error::SessionError;
use crate::events::{CancellationReason, EventSink, RecognitionEvent};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Lifecycle of a translation session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Started,
    /// Terminal
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Started => "started",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct Lifecycle {
    state: SessionState,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
}

/// Forwards backend events to the sink, in order, until shut down
struct Dispatcher {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Dispatcher {
    fn spawn(
        session_id: String,
        mut events: mpsc::UnboundedReceiver<RecognitionEvent>,
        sink: Arc<dyn EventSink>,
        stats: Arc<StatsCounter>,
    ) -> Self {
        let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let deliver = |event: RecognitionEvent| {
                if let RecognitionEvent::Canceled {
                    reason: CancellationReason::Error,
                    error_details,
                    ..
                } = &event
                {
                    warn!(
                        "Session {} canceled by service: {}",
                        session_id,
                        error_details.as_deref().unwrap_or("no details")
                    );
                }
                debug!("Delivering {} event", event.kind());
                stats.record(&event);
                sink.on_event(&event);
            };

            loop {
                tokio::select! {
                    biased;

                    event = events.recv() => match event {
                        Some(event) => deliver(event),
                        None => break,
                    },

                    _ = &mut shutdown_rx => {
                        // Deliver what was already sent, then refuse the rest
                        events.close();
                        while let Some(event) = events.recv().await {
                            deliver(event);
                        }
                        break;
                    }
                }
            }

            debug!("Event delivery finished");
        });

        Self { shutdown, task }
    }

    async fn finish(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            error!("Event delivery task panicked: {}", e);
        }
    }
}

/// A continuous speech translation session
///
/// Owns the audio input and the backend handle. Events produced by the
/// backend are delivered to the sink on a dedicated task; none are delivered
/// after `stop` returns. A stopped session cannot be restarted.
pub struct TranslationSession {
    id: String,
    config: SessionConfig,
    backend: Box<dyn SpeechTranslator>,
    input: Mutex<Box<dyn AudioInput>>,
    lifecycle: std::sync::Mutex<Lifecycle>,
    stats: Arc<StatsCounter>,
    /// Held across start and stop so they never interleave
    dispatcher: Mutex<Option<Dispatcher>>,
}

impl TranslationSession {
    pub fn new(
        config: SessionConfig,
        backend: Box<dyn SpeechTranslator>,
        input: Box<dyn AudioInput>,
    ) -> Self {
        let id = format!("session-{}", uuid::Uuid::new_v4());

        info!(
            "Creating translation session {} ({} backend, {} input)",
            id,
            backend.name(),
            input.name()
        );

        Self {
            id,
            config,
            backend,
            input: Mutex::new(input),
            lifecycle: std::sync::Mutex::new(Lifecycle {
                state: SessionState::Created,
                started_at: None,
                stopped_at: None,
            }),
            stats: Arc::new(StatsCounter::default()),
            dispatcher: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.lifecycle().state
    }

    /// Begin continuous recognition, delivering events to `sink`
    ///
    /// Service-side failures (bad credentials, unreachable endpoint) are not
    /// errors here: they arrive as `Canceled` events. On any error the audio
    /// input is released and the session ends up stopped.
    pub async fn start(&self, sink: Arc<dyn EventSink>) -> Result<(), SessionError> {
        let mut dispatcher = self.dispatcher.lock().await;

        {
            let mut lifecycle = self.lifecycle();
            match lifecycle.state {
                SessionState::Created => {}
                SessionState::Started => return Err(SessionError::AlreadyStarted),
                SessionState::Stopped => return Err(SessionError::Terminated),
            }
            lifecycle.state = SessionState::Started;
            lifecycle.started_at = Some(Utc::now());
        }

        info!("Starting translation session: {}", self.id);

        let audio = {
            let mut input = self.input.lock().await;
            match input.open().await {
                Ok(audio) => audio,
                Err(e) => {
                    input.close();
                    self.mark_stopped();
                    error!("Failed to open audio input: {:#}", e);
                    return Err(SessionError::AudioInput(e));
                }
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let delivery = Dispatcher::spawn(self.id.clone(), rx, sink, Arc::clone(&self.stats));

        if let Err(e) = self.backend.start(audio, tx).await {
            error!("Failed to start {} backend: {:#}", self.backend.name(), e);
            if let Err(stop_err) = self.backend.stop().await {
                warn!("Backend cleanup failed: {:#}", stop_err);
            }
            self.input.lock().await.close();
            delivery.finish().await;
            self.mark_stopped();
            return Err(SessionError::Backend(e));
        }

        *dispatcher = Some(delivery);

        info!("Translation session started: {}", self.id);
        Ok(())
    }

    /// Stop recognition and release the audio input
    ///
    /// Waits for the backend to confirm shutdown and for every pending event
    /// to be delivered. Stopping a stopped session does nothing.
    pub async fn stop(&self) -> SessionStats {
        let mut dispatcher = self.dispatcher.lock().await;

        let previous = {
            let mut lifecycle = self.lifecycle();
            let previous = lifecycle.state;
            if previous != SessionState::Stopped {
                lifecycle.state = SessionState::Stopped;
                lifecycle.stopped_at = Some(Utc::now());
            }
            previous
        };

        match previous {
            SessionState::Stopped => {
                debug!("Session {} already stopped", self.id);
                return self.stats();
            }
            SessionState::Created => {
                info!("Session {} stopped before it was started", self.id);
                return self.stats();
            }
            SessionState::Started => {}
        }

        info!("Stopping translation session: {}", self.id);

        if let Err(e) = self.backend.stop().await {
            error!("Failed to stop {} backend: {:#}", self.backend.name(), e);
        }

        self.input.lock().await.close();

        if let Some(delivery) = dispatcher.take() {
            delivery.finish().await;
        }

        info!("Translation session stopped: {}", self.id);
        self.stats()
    }

    /// Current session statistics
    pub fn stats(&self) -> SessionStats {
        let (started_at, stopped_at) = {
            let lifecycle = self.lifecycle();
            (lifecycle.started_at, lifecycle.stopped_at)
        };
        self.stats.snapshot(&self.id, started_at, stopped_at)
    }

    fn mark_stopped(&self) {
        let mut lifecycle = self.lifecycle();
        lifecycle.state = SessionState::Stopped;
        lifecycle.stopped_at = Some(Utc::now());
    }

    fn lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.lifecycle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for TranslationSession {
    fn drop(&mut self) {
        let state = self
            .lifecycle
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .state;

        if state != SessionState::Started {
            return;
        }

        warn!("Session {} dropped without stop, releasing resources", self.id);

        self.input.get_mut().close();
        if let Some(delivery) = self.dispatcher.get_mut().take() {
            delivery.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFrame;
    use crate::backend::ReplayTranslator;
    use crate::session::Credentials;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct TrackedInput {
        closed: Arc<AtomicBool>,
    }

    #[async_trait::async_trait]
    impl AudioInput for TrackedInput {
        async fn open(&mut self) -> anyhow::Result<mpsc::Receiver<AudioFrame>> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }

        fn is_open(&self) -> bool {
            !self.closed.load(Ordering::SeqCst)
        }

        fn name(&self) -> &str {
            "tracked"
        }
    }

    #[test]
    fn test_drop_closes_input_even_if_lifecycle_poisoned() {
        let credentials =
            Credentials::from_subscription("0123456789abcdef0123456789abcdef", "westus").unwrap();
        let config = SessionConfig::new("en-US", ["de"], None, credentials).unwrap();
        let closed = Arc::new(AtomicBool::new(false));

        let session = TranslationSession::new(
            config,
            Box::new(ReplayTranslator::new("unused.jsonl")),
            Box::new(TrackedInput {
                closed: Arc::clone(&closed),
            }),
        );

        let poisoner = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let mut lifecycle = session.lifecycle.lock().unwrap();
                    lifecycle.state = SessionState::Started;
                    panic!("poison lifecycle");
                })
                .join()
        });
        assert!(poisoner.is_err());
        assert!(session.lifecycle.is_poisoned());

        drop(session);
        assert!(closed.load(Ordering::SeqCst));
    }
}
