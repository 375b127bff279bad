//! Speech-to-text input

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Locale used for recognition unless configured otherwise
pub const DEFAULT_LOCALE: &str = "en-US";

/// Ways a capture can fail
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    /// No recognizer is available on this system
    #[error("speech recognition is not supported here")]
    Unsupported,

    /// The capture ended without a transcript
    #[error("no speech was detected")]
    NoSpeech,

    /// The recognizer reported an error
    #[error("speech recognition failed: {0}")]
    Failed(String),
}

/// Produces one final transcript per activation.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn capture(&self, locale: &str) -> Result<String, SpeechError>;
}

/// Recognizer for environments with no capture backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedRecognizer;

#[async_trait]
impl SpeechRecognizer for UnsupportedRecognizer {
    async fn capture(&self, _locale: &str) -> Result<String, SpeechError> {
        Err(SpeechError::Unsupported)
    }
}

/// A single-shot speech input session with a fixed locale.
///
/// The first `Unsupported` report is returned to the caller; after that the
/// feature is off and activations fail with [`crate::Error::SpeechDisabled`].
pub struct SpeechInput {
    recognizer: Box<dyn SpeechRecognizer>,
    locale: String,
    disabled: AtomicBool,
    listening: AtomicBool,
}

impl SpeechInput {
    pub fn new(recognizer: impl SpeechRecognizer + 'static) -> Self {
        Self::with_locale(recognizer, DEFAULT_LOCALE)
    }

    pub fn with_locale(recognizer: impl SpeechRecognizer + 'static, locale: impl Into<String>) -> Self {
        Self {
            recognizer: Box::new(recognizer),
            locale: locale.into(),
            disabled: AtomicBool::new(false),
            listening: AtomicBool::new(false),
        }
    }

    /// Speech input with no backend
    pub fn unsupported() -> Self {
        Self::new(UnsupportedRecognizer)
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Whether speech input has been turned off
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    /// Whether a capture is running
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }

    /// Run one capture and return the trimmed transcript.
    pub async fn start(&self) -> crate::Result<String> {
        if self.is_disabled() {
            return Err(crate::Error::SpeechDisabled);
        }
        if self.listening.swap(true, Ordering::AcqRel) {
            return Err(crate::Error::Busy);
        }

        let _listening = ListeningGuard(&self.listening);

        tracing::debug!(locale = %self.locale, "listening");
        let result = self.recognizer.capture(&self.locale).await;

        match result {
            Ok(transcript) if transcript.trim().is_empty() => Err(SpeechError::NoSpeech.into()),
            Ok(transcript) => Ok(transcript.trim().to_string()),
            Err(SpeechError::Unsupported) => {
                self.disabled.store(true, Ordering::Release);
                tracing::info!("speech input unavailable, disabling");
                Err(SpeechError::Unsupported.into())
            }
            Err(e) => {
                tracing::warn!(error = %e, "speech capture failed");
                Err(e.into())
            }
        }
    }
}

struct ListeningGuard<'a>(&'a AtomicBool);

impl Drop for ListeningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct ScriptedRecognizer {
        results: Mutex<Vec<Result<String, SpeechError>>>,
        locales: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedRecognizer {
        fn new(results: Vec<Result<String, SpeechError>>) -> Self {
            Self {
                results: Mutex::new(results),
                locales: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl SpeechRecognizer for ScriptedRecognizer {
        async fn capture(&self, locale: &str) -> Result<String, SpeechError> {
            self.locales.lock().push(locale.to_string());
            let mut results = self.results.lock();
            if results.is_empty() {
                Err(SpeechError::NoSpeech)
            } else {
                results.remove(0)
            }
        }
    }

    #[tokio::test]
    async fn test_transcript_is_trimmed() {
        let recognizer = ScriptedRecognizer::new(vec![Ok("  hello world \n".into())]);
        let locales = recognizer.locales.clone();
        let input = SpeechInput::new(recognizer);

        assert_eq!(input.start().await.unwrap(), "hello world");
        assert_eq!(*locales.lock(), vec!["en-US".to_string()]);
        assert!(!input.is_listening());
    }

    #[tokio::test]
    async fn test_unsupported_reported_once_then_disabled() {
        let input = SpeechInput::unsupported();

        assert!(matches!(
            input.start().await,
            Err(Error::Speech(SpeechError::Unsupported))
        ));
        assert!(input.is_disabled());
        assert!(matches!(input.start().await, Err(Error::SpeechDisabled)));
    }

    #[tokio::test]
    async fn test_other_failures_keep_feature_enabled() {
        let input = SpeechInput::with_locale(
            ScriptedRecognizer::new(vec![
                Err(SpeechError::Failed("mic busy".into())),
                Ok("".into()),
                Ok("second try".into()),
            ]),
            "en-GB",
        );

        assert!(matches!(input.start().await, Err(Error::Speech(SpeechError::Failed(_)))));
        assert!(matches!(input.start().await, Err(Error::Speech(SpeechError::NoSpeech))));
        assert_eq!(input.start().await.unwrap(), "second try");
        assert!(!input.is_disabled());
        assert_eq!(input.locale(), "en-GB");
    }
}
