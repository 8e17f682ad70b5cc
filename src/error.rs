use thiserror::Error;

/// Invalid session setup, reported before anything is started
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("subscription key must not be empty")]
    EmptySubscriptionKey,

    #[error("service region must not be empty")]
    EmptyRegion,

    #[error("source language must be set")]
    MissingSourceLanguage,

    #[error("at least one target language must be set")]
    NoTargetLanguage,

    #[error("invalid language tag: {0:?}")]
    InvalidLanguageTag(String),

    #[error("synthesis voice must not be blank when set")]
    BlankVoice,
}

/// Lifecycle and startup failures of a translation session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session already started")]
    AlreadyStarted,

    #[error("session is stopped and cannot be restarted")]
    Terminated,

    #[error("failed to open audio input")]
    AudioInput(#[source] anyhow::Error),

    #[error("translation backend failed to start")]
    Backend(#[source] anyhow::Error),
}
