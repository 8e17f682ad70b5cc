// Tests for application config loading and session config validation

use anyhow::Result;
use qs_translator::audio::{AudioOutput, AudioSource};
use qs_translator::backend::BackendKind;
use qs_translator::config::BackendChoice;
use qs_translator::{Config, ConfigError, Credentials, SessionConfig};
use std::sync::{Mutex, MutexGuard};

const KEY: &str = "0123456789abcdef0123456789abcdef";

/// Environment variables are process-wide; tests that load from them take turns
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Sets environment variables for one test and restores the previous values
struct ScopedEnv {
    saved: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl ScopedEnv {
    fn new(vars: &[(&'static str, Option<&str>)]) -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let saved = vars
            .iter()
            .map(|(name, value)| {
                let previous = std::env::var(name).ok();
                match value {
                    Some(value) => std::env::set_var(name, value),
                    None => std::env::remove_var(name),
                }
                (*name, previous)
            })
            .collect();
        Self { saved, _lock: lock }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (name, previous) in &self.saved {
            match previous {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }
    }
}

#[test]
fn test_defaults_need_only_credentials() -> Result<()> {
    let mut cfg = Config::from_toml("")?;
    assert_eq!(cfg.session_config().unwrap_err(), ConfigError::EmptySubscriptionKey);

    cfg.apply_credentials(Some(KEY.to_string()), None);
    let session = cfg.session_config()?;

    assert_eq!(session.source_language(), "en-US");
    assert_eq!(session.target_languages(), ["de".to_string()]);
    assert_eq!(session.synthesis_voice(), Some("de-DE-Hedda"));
    assert_eq!(session.credentials().region(), "westus");
    assert_eq!(cfg.audio.source(), AudioSource::Silence);
    assert_eq!(cfg.audio.output(), AudioOutput::None);
    assert!(matches!(cfg.backend_kind()?, BackendKind::Simulated(_)));

    Ok(())
}

#[test]
fn test_file_settings() -> Result<()> {
    let cfg = Config::from_toml(
        r#"
        [translation]
        source_language = "fr-FR"
        target_languages = ["en", "es"]
        voice = ""

        [service]
        subscription_key = "0123456789abcdef0123456789abcdef"
        region = "westeurope"
        backend = "replay"
        replay_file = "/tmp/events.jsonl"

        [audio]
        input_file = "/tmp/input.wav"
        output_dir = "/tmp/synthesis"
        frame_ms = 50

        [simulation]
        frames_per_word = 4

        [[simulation.utterances]]
        text = "bonjour"
        translations = { en = "hello" }
        "#,
    )?;

    let session = cfg.session_config()?;
    assert_eq!(session.source_language(), "fr-FR");
    assert_eq!(session.target_languages(), ["en".to_string(), "es".to_string()]);
    assert_eq!(session.synthesis_voice(), None, "Blank voice disables synthesis");
    assert_eq!(session.credentials().region(), "westeurope");

    assert_eq!(cfg.service.backend, BackendChoice::Replay);
    assert!(matches!(cfg.backend_kind()?, BackendKind::Replay(path) if path.ends_with("events.jsonl")));
    assert_eq!(cfg.audio.source(), AudioSource::File("/tmp/input.wav".to_string()));
    assert_eq!(cfg.audio.output(), AudioOutput::WavFiles("/tmp/synthesis".to_string()));
    assert_eq!(cfg.audio.input_config().buffer_duration_ms, 50);

    assert_eq!(cfg.simulation.frames_per_word, 4);
    assert_eq!(cfg.simulation.utterances.len(), 1);
    assert_eq!(cfg.simulation.utterances[0].translations["en"], "hello");

    Ok(())
}

#[test]
fn test_injected_credentials_override_file() -> Result<()> {
    let mut cfg = Config::from_toml(
        r#"
        [service]
        subscription_key = "from-file"
        region = "westus"
        "#,
    )?;

    cfg.apply_credentials(Some(KEY.to_string()), Some("eastus".to_string()));
    assert_eq!(cfg.service.subscription_key, KEY);
    assert_eq!(cfg.service.region, "eastus");

    // Blank injected values are ignored
    cfg.apply_credentials(Some("  ".to_string()), Some(String::new()));
    assert_eq!(cfg.service.subscription_key, KEY);
    assert_eq!(cfg.service.region, "eastus");

    Ok(())
}

#[test]
fn test_script_translation_keys_survive_loading() -> Result<()> {
    let cfg = Config::from_toml(
        r#"
        [translation]
        target_languages = ["pt-BR"]

        [[simulation.utterances]]
        text = "hello"
        translations = { "pt-BR" = "olá" }
        "#,
    )?;

    let translations = &cfg.simulation.utterances[0].translations;
    assert_eq!(translations.len(), 1);
    assert!(translations
        .iter()
        .any(|(lang, text)| lang.eq_ignore_ascii_case("pt-BR") && text == "olá"));
    assert_eq!(cfg.translation.target_languages, vec!["pt-BR".to_string()]);
    Ok(())
}

#[test]
fn test_replay_requires_file() -> Result<()> {
    let cfg = Config::from_toml("[service]\nbackend = \"replay\"\n")?;
    assert!(cfg.backend_kind().is_err());
    Ok(())
}

#[test]
fn test_missing_config_file_uses_defaults() -> Result<()> {
    let _env = ScopedEnv::new(&[
        ("QST_TRANSLATION__SOURCE_LANGUAGE", None),
        ("QST_TRANSLATION__TARGET_LANGUAGES", None),
    ]);
    let cfg = Config::load("/nonexistent/qs-translator")?;
    assert_eq!(cfg.translation.source_language, "en-US");
    assert_eq!(cfg.audio.sample_rate, 16000);
    Ok(())
}

#[test]
fn test_environment_overrides_file() -> Result<()> {
    let temp_dir = tempfile::TempDir::new()?;
    let base = temp_dir.path().join("qs-translator");
    std::fs::write(
        base.with_extension("toml"),
        "[translation]\nsource_language = \"en-US\"\ntarget_languages = [\"de\"]\n\n[service]\nregion = \"westus\"\n",
    )?;

    let _env = ScopedEnv::new(&[
        ("QST_TRANSLATION__SOURCE_LANGUAGE", Some("fr-FR")),
        ("QST_TRANSLATION__TARGET_LANGUAGES", Some("es,pt-BR")),
        ("SPEECH_KEY", Some(KEY)),
        ("SPEECH_REGION", Some("northeurope")),
    ]);

    let cfg = Config::load(&base.display().to_string())?;
    let session = cfg.session_config()?;

    assert_eq!(session.source_language(), "fr-FR");
    assert_eq!(session.target_languages(), ["es".to_string(), "pt-BR".to_string()]);
    assert_eq!(session.credentials().subscription_key(), KEY);
    assert_eq!(session.credentials().region(), "northeurope");

    Ok(())
}

#[test]
fn test_single_target_language_from_environment() -> Result<()> {
    let _env = ScopedEnv::new(&[
        ("QST_TRANSLATION__SOURCE_LANGUAGE", None),
        ("QST_TRANSLATION__TARGET_LANGUAGES", Some("es")),
    ]);

    let cfg = Config::load("/nonexistent/qs-translator")?;
    assert_eq!(cfg.translation.target_languages, vec!["es".to_string()]);

    Ok(())
}

fn credentials() -> Credentials {
    Credentials::from_subscription(KEY, "westus").unwrap()
}

#[test]
fn test_session_config_requires_target_language() {
    let result = SessionConfig::new("en-US", Vec::<String>::new(), None, credentials());
    assert_eq!(result.unwrap_err(), ConfigError::NoTargetLanguage);
}

#[test]
fn test_session_config_requires_source_language() {
    let result = SessionConfig::new("  ", ["de"], None, credentials());
    assert_eq!(result.unwrap_err(), ConfigError::MissingSourceLanguage);
}

#[test]
fn test_session_config_rejects_bad_tags() {
    let result = SessionConfig::new("en-US", ["german"], None, credentials());
    assert_eq!(
        result.unwrap_err(),
        ConfigError::InvalidLanguageTag("german".to_string())
    );
}

#[test]
fn test_session_config_rejects_blank_voice() {
    let result = SessionConfig::new("en-US", ["de"], Some(" ".to_string()), credentials());
    assert_eq!(result.unwrap_err(), ConfigError::BlankVoice);
}

#[test]
fn test_credentials_must_be_non_empty() {
    assert_eq!(
        Credentials::from_subscription("", "westus").unwrap_err(),
        ConfigError::EmptySubscriptionKey
    );
    assert_eq!(
        Credentials::from_subscription(KEY, " ").unwrap_err(),
        ConfigError::EmptyRegion
    );
}
