//! Runtime registry of recognition providers.
//!
//! Providers register a constructor under a vendor tag; consumers create
//! recognizers by tag without naming concrete types. The registry is
//! concurrency-safe and may be shared across tasks.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::base::{RecognitionConfig, SpeechRecognizer, SttError};

/// Constructor registered for one vendor tag.
pub type RecognizerFactoryFn =
    Arc<dyn Fn(RecognitionConfig) -> Result<Box<dyn SpeechRecognizer>, SttError> + Send + Sync>;

/// Registry of recognizer constructors indexed by vendor tag.
#[derive(Default)]
pub struct RecognizerRegistry {
    factories: DashMap<String, RecognizerFactoryFn>,
}

impl RecognizerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: DashMap::new(),
        }
    }

    /// Create a registry with all built-in providers registered.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry
            .register(
                "xunfei",
                Arc::new(|config| {
                    Ok(Box::new(super::xunfei::XunfeiStt::new(config)?)
                        as Box<dyn SpeechRecognizer>)
                }),
            )
            .expect("built-in registration cannot collide in an empty registry");
        registry
    }

    /// Register a constructor under `tag` (case-insensitive).
    ///
    /// Empty tags and duplicate registrations are rejected; a tag's
    /// constructor never changes once registered.
    pub fn register(&self, tag: &str, factory: RecognizerFactoryFn) -> Result<(), SttError> {
        if tag.trim().is_empty() {
            return Err(SttError::ConfigurationError(
                "provider tag must not be empty".to_string(),
            ));
        }

        let id = tag.to_lowercase();
        match self.factories.entry(id) {
            Entry::Occupied(_) => Err(SttError::ConfigurationError(format!(
                "provider '{}' is already registered",
                tag
            ))),
            Entry::Vacant(entry) => {
                entry.insert(factory);
                tracing::debug!(provider = %tag, "Registered recognition provider");
                Ok(())
            }
        }
    }

    /// Create a recognizer for `tag`.
    pub fn create(
        &self,
        tag: &str,
        config: RecognitionConfig,
    ) -> Result<Box<dyn SpeechRecognizer>, SttError> {
        let id = tag.to_lowercase();
        let factory = self.factories.get(&id).ok_or_else(|| {
            SttError::ConfigurationError(format!(
                "Unknown recognition provider: '{}'. Available providers: {:?}",
                tag,
                self.provider_names()
            ))
        })?;
        let factory = factory.clone();
        factory(config)
    }

    /// Registered vendor tags, unordered.
    pub fn provider_names(&self) -> Vec<String> {
        self.factories.iter().map(|e| e.key().clone()).collect()
    }

    /// Whether `tag` has a registered constructor.
    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(&tag.to_lowercase())
    }
}
