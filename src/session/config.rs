use crate::error::ConfigError;
use std::fmt;

/// Subscription credentials for the speech translation service
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    subscription_key: String,
    region: String,
    endpoint: Option<String>,
}

impl Credentials {
    /// Credentials for a regional service endpoint
    pub fn from_subscription(
        subscription_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let subscription_key = subscription_key.into().trim().to_string();
        let region = region.into().trim().to_string();

        if subscription_key.is_empty() {
            return Err(ConfigError::EmptySubscriptionKey);
        }
        if region.is_empty() {
            return Err(ConfigError::EmptyRegion);
        }

        Ok(Self {
            subscription_key,
            region,
            endpoint: None,
        })
    }

    /// Override the regional endpoint (private deployments, proxies)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.endpoint = (!endpoint.trim().is_empty()).then_some(endpoint);
        self
    }

    pub fn subscription_key(&self) -> &str {
        &self.subscription_key
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Explicit endpoint, or the default one derived from the region
    pub fn endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!(
                "wss://{}.s2s.speech.microsoft.com/speech/translation/cognitiveservices/v1",
                self.region
            ),
        }
    }
}

// Never print the key itself
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("subscription_key", &"<redacted>")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Immutable configuration of one translation session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    source_language: String,
    target_languages: Vec<String>,
    synthesis_voice: Option<String>,
    credentials: Credentials,
}

impl SessionConfig {
    /// Validate and build a session configuration
    ///
    /// Target languages are de-duplicated, keeping first-seen order.
    pub fn new<I, S>(
        source_language: impl Into<String>,
        target_languages: I,
        synthesis_voice: Option<String>,
        credentials: Credentials,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source_language = source_language.into().trim().to_string();
        if source_language.is_empty() {
            return Err(ConfigError::MissingSourceLanguage);
        }
        validate_language_tag(&source_language)?;

        let mut targets: Vec<String> = Vec::new();
        for lang in target_languages {
            let lang = lang.into().trim().to_string();
            validate_language_tag(&lang)?;
            if !targets.contains(&lang) {
                targets.push(lang);
            }
        }
        if targets.is_empty() {
            return Err(ConfigError::NoTargetLanguage);
        }

        let synthesis_voice = match synthesis_voice {
            Some(voice) if voice.trim().is_empty() => return Err(ConfigError::BlankVoice),
            Some(voice) => Some(voice.trim().to_string()),
            None => None,
        };

        Ok(Self {
            source_language,
            target_languages: targets,
            synthesis_voice,
            credentials,
        })
    }

    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    pub fn target_languages(&self) -> &[String] {
        &self.target_languages
    }

    pub fn synthesis_voice(&self) -> Option<&str> {
        self.synthesis_voice.as_deref()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

/// Accepts BCP-47 style tags such as `de`, `en-US`, `zh-Hans`
fn validate_language_tag(tag: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidLanguageTag(tag.to_string());

    let mut parts = tag.split('-');
    let primary = parts.next().ok_or_else(invalid)?;
    if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }

    for subtag in parts {
        if subtag.is_empty() || subtag.len() > 8 || !subtag.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(invalid());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::from_subscription("0123456789abcdef0123456789abcdef", "westus").unwrap()
    }

    #[test]
    fn test_language_tags() {
        assert!(validate_language_tag("de").is_ok());
        assert!(validate_language_tag("en-US").is_ok());
        assert!(validate_language_tag("zh-Hans").is_ok());
        assert!(validate_language_tag("").is_err());
        assert!(validate_language_tag("english").is_err());
        assert!(validate_language_tag("en-").is_err());
        assert!(validate_language_tag("en US").is_err());
    }

    #[test]
    fn test_targets_deduplicated_in_order() {
        let config = SessionConfig::new("en-US", ["de", "fr", "de"], None, creds()).unwrap();
        assert_eq!(config.target_languages(), ["de".to_string(), "fr".to_string()]);
    }

    #[test]
    fn test_debug_redacts_key() {
        let printed = format!("{:?}", creds());
        assert!(!printed.contains("0123456789abcdef"));
        assert!(printed.contains("westus"));
    }

    #[test]
    fn test_default_endpoint_uses_region() {
        assert!(creds().endpoint().starts_with("wss://westus."));
        let custom = creds().with_endpoint("wss://localhost:9000");
        assert_eq!(custom.endpoint(), "wss://localhost:9000");
    }
}
