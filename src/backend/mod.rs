//! The external speech translation capability
//!
//! Recognition, translation and synthesis are not done here: a
//! `SpeechTranslator` is the opaque handle a session drives. It consumes the
//! session's audio frames and reports everything it does as
//! `RecognitionEvent`s on the channel it is given, including connection and
//! authentication failures (as `Canceled` events, never as `start` errors).
//!
//! Built-in implementations:
//! - `SimulatedTranslator`: scripted utterances paced by incoming audio
//! - `ReplayTranslator`: replays a recorded JSON-lines event log

mod driver;
mod replay;
mod simulated;

pub use replay::{load_event_log, ReplayTranslator};
pub use simulated::{ScriptedUtterance, SimulatedTranslator, SimulationScript};

use crate::audio::AudioFrame;
use crate::events::RecognitionEvent;
use crate::session::SessionConfig;
use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Channel a backend reports events on
pub type EventSender = mpsc::UnboundedSender<RecognitionEvent>;

/// Handle to a configured speech translation capability
#[async_trait::async_trait]
pub trait SpeechTranslator: Send + Sync {
    /// Begin continuous recognition over `audio`
    ///
    /// Returns once recognition is running; results arrive on `events`.
    async fn start(&self, audio: mpsc::Receiver<AudioFrame>, events: EventSender) -> Result<()>;

    /// Stop continuous recognition and wait until the backend has shut down
    ///
    /// Stopping a backend that is not running is a no-op.
    async fn stop(&self) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Which capability to configure
#[derive(Debug, Clone)]
pub enum BackendKind {
    Simulated(SimulationScript),
    Replay(PathBuf),
}

/// Translation backend factory
pub struct BackendFactory;

impl BackendFactory {
    /// Configure a capability for one session
    pub fn create(kind: BackendKind, config: &SessionConfig) -> Result<Box<dyn SpeechTranslator>> {
        match kind {
            BackendKind::Simulated(script) => {
                Ok(Box::new(SimulatedTranslator::new(config.clone(), script)))
            }
            BackendKind::Replay(path) => Ok(Box::new(ReplayTranslator::new(path))),
        }
    }
}
