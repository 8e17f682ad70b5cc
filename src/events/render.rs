use super::event::{CancellationReason, RecognitionEvent, ResultReason};

/// Render an event as the console lines shown to the user
///
/// `source_language` is the recognition language of the session; translation
/// lines are emitted in target language order.
pub fn render_event(source_language: &str, event: &RecognitionEvent) -> Vec<String> {
    match event {
        RecognitionEvent::SessionStarted => {
            vec![String::new(), "Session started event.".to_string()]
        }

        RecognitionEvent::SessionStopped => {
            vec![String::new(), "Session stopped event.".to_string()]
        }

        RecognitionEvent::Recognizing { text, translations } => {
            let mut lines = vec![format!("RECOGNIZING in '{source_language}': Text={text}")];
            lines.extend(
                translations
                    .iter()
                    .map(|(lang, text)| format!("    TRANSLATING into '{lang}': {text}")),
            );
            lines
        }

        RecognitionEvent::Recognized {
            reason,
            text,
            translations,
        } => match reason {
            ResultReason::TranslatedSpeech => {
                let mut lines = vec![format!("RECOGNIZED in '{source_language}': Text={text}")];
                lines.extend(
                    translations
                        .iter()
                        .map(|(lang, text)| format!("    TRANSLATED into '{lang}': {text}")),
                );
                lines
            }
            ResultReason::RecognizedSpeech => vec![
                format!("RECOGNIZED: Text={text}"),
                "    Speech not translated.".to_string(),
            ],
            ResultReason::NoMatch => vec!["NOMATCH: Speech could not be recognized.".to_string()],
        },

        RecognitionEvent::Synthesizing(chunk) => {
            if chunk.is_empty() {
                vec![format!("AudioSize: {} (end of synthesis data)", chunk.len())]
            } else {
                vec![format!("AudioSize: {}", chunk.len())]
            }
        }

        RecognitionEvent::Canceled {
            reason,
            error_details,
            ..
        } => {
            let mut lines = vec![format!("CANCELED: Reason={reason}")];
            if *reason == CancellationReason::Error {
                lines.push(format!(
                    "CANCELED: ErrorDetails={}",
                    error_details.as_deref().unwrap_or_default()
                ));
                lines.push("CANCELED: Did you update the subscription info?".to_string());
            }
            lines
        }
    }
}
