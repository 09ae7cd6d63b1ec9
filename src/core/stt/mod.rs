//! Streaming speech-to-text providers.
//!
//! Every provider implements the [`SpeechRecognizer`] trait; consumers pick
//! one by enum or vendor tag through the factory functions below, or manage
//! their own [`RecognizerRegistry`].

mod base;
mod registry;
pub mod xunfei;

// Re-export public types and traits
pub use base::{
    ErrorCallback, ProgressCallback, RecognitionConfig, RecognitionResult, ResultCallback,
    SessionState, SpeechRecognizer, SttError,
};
pub use registry::{RecognizerFactoryFn, RecognizerRegistry};

// Re-export Xunfei implementation
pub use xunfei::{TranscriptReconciler, XunfeiStt, XunfeiSttConfig};

/// Supported recognition providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SttProvider {
    /// Xunfei (iFLYTEK) IAT streaming dictation.
    Xunfei,
}

impl std::fmt::Display for SttProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SttProvider::Xunfei => write!(f, "xunfei"),
        }
    }
}

impl std::str::FromStr for SttProvider {
    type Err = SttError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xunfei" | "iflytek" | "iat" => Ok(SttProvider::Xunfei),
            _ => Err(SttError::ConfigurationError(format!(
                "Unknown recognition provider: '{s}'"
            ))),
        }
    }
}

/// Factory function to create a recognizer by vendor tag.
///
/// # Arguments
/// * `provider` - Vendor tag (e.g. "xunfei")
/// * `config` - Base recognition configuration
///
/// # Example
///
/// ```rust,no_run
/// use voicepace::core::stt::{create_recognizer, RecognitionConfig};
///
/// let config = RecognitionConfig {
///     app_id: "app".to_string(),
///     api_key: "key".to_string(),
///     api_secret: "secret".to_string(),
///     ..Default::default()
/// };
/// let recognizer = create_recognizer("xunfei", config).unwrap();
/// ```
pub fn create_recognizer(
    provider: &str,
    config: RecognitionConfig,
) -> Result<Box<dyn SpeechRecognizer>, SttError> {
    RecognizerRegistry::with_builtins().create(provider, config)
}

/// Factory function to create a recognizer from the provider enum.
pub fn create_recognizer_from_enum(
    provider: SttProvider,
    config: RecognitionConfig,
) -> Result<Box<dyn SpeechRecognizer>, SttError> {
    create_recognizer(&provider.to_string(), config)
}

#[cfg(test)]
mod factory_tests {
    use super::*;

    fn valid_config() -> RecognitionConfig {
        RecognitionConfig {
            app_id: "app".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_provider_parse_and_display() {
        assert_eq!("xunfei".parse::<SttProvider>().unwrap(), SttProvider::Xunfei);
        assert_eq!("IFLYTEK".parse::<SttProvider>().unwrap(), SttProvider::Xunfei);
        assert_eq!(SttProvider::Xunfei.to_string(), "xunfei");
        assert!("deepgram".parse::<SttProvider>().is_err());
    }

    #[test]
    fn test_create_by_tag() {
        let recognizer = create_recognizer("xunfei", valid_config()).unwrap();
        assert_eq!(recognizer.provider_info(), "Xunfei IAT Streaming STT v2");
    }

    #[test]
    fn test_create_from_enum() {
        let recognizer = create_recognizer_from_enum(SttProvider::Xunfei, valid_config()).unwrap();
        assert!(!recognizer.is_ready());
    }

    #[test]
    fn test_create_unknown_tag_fails() {
        assert!(create_recognizer("nonexistent", valid_config()).is_err());
    }
}
