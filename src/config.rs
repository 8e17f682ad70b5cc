use crate::audio::{AudioInputConfig, AudioOutput, AudioSource};
use crate::backend::{BackendKind, SimulationScript};
use crate::error::ConfigError;
use crate::session::{Credentials, SessionConfig};
use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable holding the subscription key
pub const KEY_ENV: &str = "SPEECH_KEY";
/// Environment variable holding the service region
pub const REGION_ENV: &str = "SPEECH_REGION";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub translation: TranslationConfig,
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub simulation: SimulationScript,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub source_language: String,
    pub target_languages: Vec<String>,
    /// Voice for speaking translations; no synthesis when unset or blank
    pub voice: Option<String>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            source_language: "en-US".to_string(),
            target_languages: vec!["de".to_string()],
            voice: Some("de-DE-Hedda".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    #[default]
    Simulated,
    Replay,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Prefer the SPEECH_KEY environment variable over storing this in a file
    pub subscription_key: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub backend: BackendChoice,
    /// Event log to replay when `backend = "replay"`
    pub replay_file: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            subscription_key: String::new(),
            region: "westus".to_string(),
            endpoint: None,
            backend: BackendChoice::default(),
            replay_file: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// WAV file to stream instead of live capture
    pub input_file: Option<String>,
    /// Directory for synthesized speech; playback is discarded when unset
    pub output_dir: Option<String>,
    pub sample_rate: u32,
    pub frame_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_file: None,
            output_dir: None,
            sample_rate: 16000,
            frame_ms: 100,
        }
    }
}

impl AudioConfig {
    pub fn source(&self) -> AudioSource {
        match &self.input_file {
            Some(path) => AudioSource::File(expand(path)),
            None => AudioSource::Silence,
        }
    }

    pub fn output(&self) -> AudioOutput {
        match &self.output_dir {
            Some(dir) => AudioOutput::WavFiles(expand(dir)),
            None => AudioOutput::None,
        }
    }

    pub fn input_config(&self) -> AudioInputConfig {
        AudioInputConfig {
            target_sample_rate: self.sample_rate,
            target_channels: 1,
            buffer_duration_ms: self.frame_ms,
            realtime: true,
        }
    }
}

impl Config {
    /// Load `<path>.toml` (optional), `QST_*` environment overrides and the
    /// SPEECH_KEY / SPEECH_REGION credentials
    ///
    /// `QST_TRANSLATION__TARGET_LANGUAGES` takes a comma-separated list.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("QST")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("translation.target_languages"),
            )
            .build()?;

        let mut cfg: Self = settings.try_deserialize()?;
        cfg.apply_credentials(std::env::var(KEY_ENV).ok(), std::env::var(REGION_ENV).ok());
        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Injected credentials win over configured ones; blank values are ignored
    pub fn apply_credentials(&mut self, key: Option<String>, region: Option<String>) {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.service.subscription_key = key;
        }
        if let Some(region) = region.filter(|r| !r.trim().is_empty()) {
            self.service.region = region;
        }
    }

    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        let mut credentials =
            Credentials::from_subscription(&self.service.subscription_key, &self.service.region)?;
        if let Some(endpoint) = &self.service.endpoint {
            credentials = credentials.with_endpoint(endpoint);
        }

        SessionConfig::new(
            &self.translation.source_language,
            &self.translation.target_languages,
            self.translation
                .voice
                .clone()
                .filter(|voice| !voice.trim().is_empty()),
            credentials,
        )
    }

    pub fn backend_kind(&self) -> Result<BackendKind> {
        match self.service.backend {
            BackendChoice::Simulated => Ok(BackendKind::Simulated(self.simulation.clone())),
            BackendChoice::Replay => match &self.service.replay_file {
                Some(path) => Ok(BackendKind::Replay(PathBuf::from(expand(path)))),
                None => bail!("service.replay_file is required for the replay backend"),
            },
        }
    }
}

fn expand(path: &str) -> String {
    shellexpand::tilde(path).into_owned()
}
