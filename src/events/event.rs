use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Translations keyed by target language tag
pub type Translations = BTreeMap<String, String>;

/// Outcome of a final recognition result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultReason {
    /// Recognized and translated into the target languages
    TranslatedSpeech,
    /// Recognized but no translation was produced
    RecognizedSpeech,
    /// Audio was heard but could not be recognized
    NoMatch,
}

/// Why continuous recognition was canceled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancellationReason {
    /// Service or connection failure; see the error details
    Error,
    /// The audio stream ended
    EndOfStream,
    /// Canceled on request of the client
    CancelledByUser,
}

impl fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "Error",
            Self::EndOfStream => "EndOfStream",
            Self::CancelledByUser => "CancelledByUser",
        };
        f.write_str(name)
    }
}

/// Error classification attached to `CancellationReason::Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancellationErrorCode {
    AuthenticationFailure,
    ConnectionFailure,
    ServiceTimeout,
    BadRequest,
    ServiceError,
}

/// A slice of synthesized speech audio
///
/// An empty, final chunk marks the end of synthesis data for an utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioChunk {
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
    pub is_final: bool,
}

impl AudioChunk {
    pub fn data(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            is_final: false,
        }
    }

    pub fn end_of_synthesis() -> Self {
        Self {
            bytes: Vec::new(),
            is_final: true,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Everything a translation backend reports while a session runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecognitionEvent {
    SessionStarted,

    /// Intermediate hypothesis for the utterance in progress
    Recognizing {
        text: String,
        #[serde(default)]
        translations: Translations,
    },

    /// Final result for one utterance
    Recognized {
        reason: ResultReason,
        text: String,
        #[serde(default)]
        translations: Translations,
    },

    Synthesizing(AudioChunk),

    Canceled {
        reason: CancellationReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_code: Option<CancellationErrorCode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_details: Option<String>,
    },

    SessionStopped,
}

impl RecognitionEvent {
    pub fn no_match() -> Self {
        Self::Recognized {
            reason: ResultReason::NoMatch,
            text: String::new(),
            translations: Translations::new(),
        }
    }

    pub fn error(code: CancellationErrorCode, details: impl Into<String>) -> Self {
        Self::Canceled {
            reason: CancellationReason::Error,
            error_code: Some(code),
            error_details: Some(details.into()),
        }
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionStarted => "session_started",
            Self::Recognizing { .. } => "recognizing",
            Self::Recognized { .. } => "recognized",
            Self::Synthesizing(_) => "synthesizing",
            Self::Canceled { .. } => "canceled",
            Self::SessionStopped => "session_stopped",
        }
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let event = RecognitionEvent::Recognizing {
            text: "hello".to_string(),
            translations: Translations::from([("de".to_string(), "hallo".to_string())]),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"recognizing\""));
        assert!(json.contains("\"de\":\"hallo\""));
    }

    #[test]
    fn test_audio_chunk_bytes_are_base64() {
        let event = RecognitionEvent::Synthesizing(AudioChunk::data(vec![0, 1, 2, 255]));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"bytes\":\"AAEC/w==\""));

        let parsed: RecognitionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_canceled_omits_missing_details() {
        let event = RecognitionEvent::Canceled {
            reason: CancellationReason::EndOfStream,
            error_code: None,
            error_details: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("error_details"));
        assert_eq!(CancellationReason::EndOfStream.to_string(), "EndOfStream");
    }
}
