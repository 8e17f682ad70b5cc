use super::driver::{run_recognition, FrameScript, RecognitionTask};
use super::{EventSender, SpeechTranslator};
use crate::audio::AudioFrame;
use crate::events::{
    AudioChunk, CancellationErrorCode, RecognitionEvent, ResultReason, Translations,
};
use crate::session::SessionConfig;
use anyhow::Result;
use serde::Deserialize;
use std::f32::consts::PI;
use tokio::sync::mpsc;
use tracing::{info, warn};

const SYNTHESIS_SAMPLE_RATE: u32 = 16000;
const SYNTHESIS_CHUNK_BYTES: usize = 3200; // 100ms of 16kHz mono PCM
const SYNTHESIS_MS_PER_CHAR: usize = 60;

/// One utterance the simulated speaker says
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedUtterance {
    /// What is recognized in the source language
    #[serde(default)]
    pub text: String,

    /// Translations by target language; missing targets are not translated
    #[serde(default)]
    pub translations: Translations,

    /// Unintelligible audio: reported as a no-match result
    #[serde(default)]
    pub no_match: bool,
}

impl ScriptedUtterance {
    pub fn new(text: &str, translations: &[(&str, &str)]) -> Self {
        Self {
            text: text.to_string(),
            translations: translations
                .iter()
                .map(|(lang, text)| (lang.to_string(), text.to_string()))
                .collect(),
            no_match: false,
        }
    }

    pub fn noise() -> Self {
        Self {
            text: String::new(),
            translations: Translations::new(),
            no_match: true,
        }
    }
}

/// Timeline of the simulated speaker, measured in audio frames
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationScript {
    pub utterances: Vec<ScriptedUtterance>,
    /// Frames of audio per recognized word
    pub frames_per_word: usize,
    /// Frames of silence before each utterance
    pub pause_frames: usize,
    /// Start over after the last utterance
    pub repeat: bool,
}

impl Default for SimulationScript {
    fn default() -> Self {
        Self {
            utterances: vec![
                ScriptedUtterance::new(
                    "Hello, how are you today?",
                    &[("de", "Hallo, wie geht es dir heute?"), ("fr", "Bonjour, comment allez-vous aujourd'hui ?")],
                ),
                ScriptedUtterance::noise(),
                ScriptedUtterance::new(
                    "Where is the train station?",
                    &[("de", "Wo ist der Bahnhof?"), ("fr", "Où est la gare ?")],
                ),
            ],
            frames_per_word: 3,  // ~300ms per word at 100ms frames
            pause_frames: 10,    // ~1s between utterances
            repeat: false,
        }
    }
}

/// Offline stand-in for the cloud speech translation service
///
/// Validates the subscription key the way the service would (asynchronously,
/// via a `Canceled` event) and then plays its script against the audio it is
/// fed.
pub struct SimulatedTranslator {
    config: SessionConfig,
    script: SimulationScript,
    task: RecognitionTask,
}

impl SimulatedTranslator {
    pub fn new(config: SessionConfig, script: SimulationScript) -> Self {
        Self {
            config,
            script,
            task: RecognitionTask::default(),
        }
    }
}

#[async_trait::async_trait]
impl SpeechTranslator for SimulatedTranslator {
    async fn start(&self, audio: mpsc::Receiver<AudioFrame>, events: EventSender) -> Result<()> {
        info!(
            "Connecting to {} ({} -> {})",
            self.config.credentials().endpoint(),
            self.config.source_language(),
            self.config.target_languages().join(", ")
        );

        let authorized = is_well_formed_key(self.config.credentials().subscription_key());
        let timeline = Timeline::new(&self.config, self.script.clone());

        self.task
            .spawn(self.name(), move |shutdown| {
                tokio::spawn(async move {
                    if !authorized {
                        warn!("Subscription key rejected");
                        let _ = events.send(RecognitionEvent::SessionStarted);
                        let _ = events.send(RecognitionEvent::error(
                            CancellationErrorCode::AuthenticationFailure,
                            "WebSocket upgrade failed: Authentication error (401). \
                             Please check subscription information and region name.",
                        ));
                        let _ = events.send(RecognitionEvent::SessionStopped);
                        return;
                    }

                    run_recognition(timeline, audio, events, shutdown).await;
                })
            })
            .await
    }

    async fn stop(&self) -> Result<()> {
        self.task.stop(self.name()).await
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

/// Service keys are 32+ characters of ASCII letters and digits
fn is_well_formed_key(key: &str) -> bool {
    key.len() >= 32 && key.chars().all(|c| c.is_ascii_alphanumeric())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pause,
    Speaking { words_heard: usize },
    Idle,
}

/// Frame-by-frame playback of a `SimulationScript`
pub(crate) struct Timeline {
    script: SimulationScript,
    targets: Vec<String>,
    /// Target language the synthesis voice speaks
    voice_target: Option<String>,
    index: usize,
    phase: Phase,
    frames_in_phase: usize,
}

impl Timeline {
    pub(crate) fn new(config: &SessionConfig, script: SimulationScript) -> Self {
        let phase = if script.utterances.is_empty() {
            Phase::Idle
        } else {
            Phase::Pause
        };

        let voice_target = config
            .synthesis_voice()
            .and_then(|voice| voice_target(voice, config.target_languages()));

        Self {
            script,
            targets: config.target_languages().to_vec(),
            voice_target,
            index: 0,
            phase,
            frames_in_phase: 0,
        }
    }

    fn current(&self) -> &ScriptedUtterance {
        &self.script.utterances[self.index]
    }

    fn word_count(&self) -> usize {
        self.current().text.split_whitespace().count().max(1)
    }

    /// Translations restricted to the session's target languages
    ///
    /// Script keys match target tags ignoring case; results are keyed by the
    /// target tag as configured.
    fn translations(&self, words_heard: Option<usize>) -> Translations {
        let utterance = self.current();
        let source_words = self.word_count();

        self.targets
            .iter()
            .filter_map(|lang| {
                let full = utterance.translations.get(lang).or_else(|| {
                    utterance
                        .translations
                        .iter()
                        .find(|(key, _)| key.eq_ignore_ascii_case(lang))
                        .map(|(_, text)| text)
                })?;
                let text = match words_heard {
                    None => full.clone(),
                    Some(heard) => {
                        let words: Vec<&str> = full.split_whitespace().collect();
                        let take = (heard * words.len()).div_ceil(source_words);
                        words[..take.min(words.len())].join(" ")
                    }
                };
                Some((lang.clone(), text))
            })
            .collect()
    }

    fn finish_utterance(&mut self) -> Vec<RecognitionEvent> {
        let utterance = self.current();
        let mut events = Vec::new();

        if utterance.no_match {
            events.push(RecognitionEvent::no_match());
        } else {
            let translations = self.translations(None);
            let reason = if translations.is_empty() {
                ResultReason::RecognizedSpeech
            } else {
                ResultReason::TranslatedSpeech
            };

            let spoken = self
                .voice_target
                .as_ref()
                .and_then(|lang| translations.get(lang))
                .cloned();

            events.push(RecognitionEvent::Recognized {
                reason,
                text: utterance.text.clone(),
                translations,
            });

            if let Some(text) = spoken {
                events.extend(synthesize(&text).into_iter().map(RecognitionEvent::Synthesizing));
            }
        }

        self.index += 1;
        if self.index >= self.script.utterances.len() {
            if self.script.repeat {
                self.index = 0;
            } else {
                self.phase = Phase::Idle;
                return events;
            }
        }
        self.phase = Phase::Pause;
        events
    }
}

impl FrameScript for Timeline {
    fn on_frame(&mut self, _frame: &AudioFrame) -> Vec<RecognitionEvent> {
        self.frames_in_phase += 1;

        match self.phase {
            Phase::Idle => Vec::new(),

            Phase::Pause => {
                if self.frames_in_phase >= self.script.pause_frames {
                    self.phase = Phase::Speaking { words_heard: 0 };
                    self.frames_in_phase = 0;
                }
                Vec::new()
            }

            Phase::Speaking { words_heard } => {
                if self.frames_in_phase < self.script.frames_per_word.max(1) {
                    return Vec::new();
                }
                self.frames_in_phase = 0;

                // One extra tick after the last word closes the utterance
                let words_heard = words_heard + 1;
                if self.current().no_match || words_heard > self.word_count() {
                    return self.finish_utterance();
                }
                self.phase = Phase::Speaking { words_heard };

                let text = self
                    .current()
                    .text
                    .split_whitespace()
                    .take(words_heard)
                    .collect::<Vec<_>>()
                    .join(" ");

                vec![RecognitionEvent::Recognizing {
                    text,
                    translations: self.translations(Some(words_heard)),
                }]
            }
        }
    }
}

/// The target a voice speaks: "de-DE-Hedda" speaks "de-DE" or "de"
///
/// The longest target that prefixes the voice name wins; otherwise a target
/// with the same primary language subtag.
fn voice_target(voice: &str, targets: &[String]) -> Option<String> {
    let voice = voice.to_ascii_lowercase();
    let primary = |tag: &str| tag.split('-').next().unwrap_or(tag).to_ascii_lowercase();

    targets
        .iter()
        .filter(|target| {
            let target = target.to_ascii_lowercase();
            voice == target || voice.starts_with(&format!("{target}-"))
        })
        .max_by_key(|target| target.len())
        .or_else(|| targets.iter().find(|target| primary(target) == primary(&voice)))
        .cloned()
}

/// Stand-in synthesis: a tone as long as the text, in 100ms chunks
fn synthesize(text: &str) -> Vec<AudioChunk> {
    let duration_ms = text.chars().count() * SYNTHESIS_MS_PER_CHAR;
    let total_samples = SYNTHESIS_SAMPLE_RATE as usize * duration_ms / 1000;

    let pcm: Vec<u8> = (0..total_samples)
        .flat_map(|n| {
            let t = n as f32 / SYNTHESIS_SAMPLE_RATE as f32;
            let sample = ((2.0 * PI * 440.0 * t).sin() * 3000.0) as i16;
            sample.to_le_bytes()
        })
        .collect();

    let mut chunks: Vec<AudioChunk> = pcm
        .chunks(SYNTHESIS_CHUNK_BYTES)
        .map(|bytes| AudioChunk::data(bytes.to_vec()))
        .collect();
    chunks.push(AudioChunk::end_of_synthesis());
    chunks
}
