pub mod audio;
pub mod backend;
pub mod config;
pub mod console;
pub mod error;
pub mod events;
pub mod session;

pub use audio::{
    AudioFrame, AudioInput, AudioInputConfig, AudioInputFactory, AudioOutput,
    AudioPlayer, AudioSink, AudioSinkFactory, AudioSource,
};
pub use backend::{BackendFactory, BackendKind, SpeechTranslator};
pub use config::Config;
pub use console::{ConsoleDriver, QuitReason};
pub use error::{ConfigError, SessionError};
pub use events::{
    AudioChunk, CancellationReason, ConsoleSink, EventLogSink, EventSink, FanoutSink,
    RecognitionEvent, ResultReason,
};
pub use session::{Credentials, SessionConfig, SessionState, SessionStats, TranslationSession};
