//! Base trait and shared types for speech-recognition providers.
//!
//! Every provider implements [`SpeechRecognizer`] so consumers can drive a
//! recognition session without depending on vendor-specific types. Audio
//! capture is injected as a collaborator (see [`crate::core::audio`]) rather
//! than reached through ambient state, and all progress is delivered through
//! async callbacks.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use crate::core::audio::AudioCapture;

// =============================================================================
// Errors
// =============================================================================

/// Errors produced by recognition sessions and their collaborators.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SttError {
    /// Missing or invalid credentials/configuration. No session is attempted.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A second `start` while a session is already active. Rejected
    /// synchronously, before any I/O.
    #[error("Concurrent session rejected: {0}")]
    ConcurrentSession(String),

    /// Failed to establish the transport connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Transport failure after the connection was established (send/receive).
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Malformed inbound message from the recognition service.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The recognition service reported a non-zero result code.
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// No capture device was injected, or it failed to start.
    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    /// File-based audio input could not be read.
    #[error("Capture read error: {0}")]
    CaptureRead(String),
}

// =============================================================================
// Session state
// =============================================================================

/// Lifecycle of one recognition session.
///
/// `Failed` is reachable from `Connecting` or `Streaming` on any transport,
/// parse, or capture error; failure is terminal and is not retried. At most
/// one session per recognizer may be in `Connecting`, `Streaming`, or
/// `Closing` at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Closing,
    Closed,
    Failed,
}

// =============================================================================
// Configuration
// =============================================================================

/// Base configuration shared by all recognition providers.
///
/// Credentials come from the caller as a validated struct; the core never
/// reads them from the environment or storage itself.
#[derive(Debug, Clone)]
pub struct RecognitionConfig {
    /// Application identifier issued by the provider.
    pub app_id: String,
    /// API key for request signing.
    pub api_key: String,
    /// API secret for request signing.
    pub api_secret: String,
    /// Recognition language tag (e.g. "zh_cn").
    pub language: String,
    /// Audio sample rate in Hz.
    pub sample_rate: u32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            language: "zh_cn".to_string(),
            sample_rate: 16000,
        }
    }
}

impl RecognitionConfig {
    /// Check that all identity fields are present.
    ///
    /// Must pass before any session may open or any URL may be signed.
    pub fn validate(&self) -> Result<(), SttError> {
        if self.app_id.is_empty() {
            return Err(SttError::ConfigurationError(
                "app_id is required".to_string(),
            ));
        }
        if self.api_key.is_empty() {
            return Err(SttError::ConfigurationError(
                "api_key is required".to_string(),
            ));
        }
        if self.api_secret.is_empty() {
            return Err(SttError::ConfigurationError(
                "api_secret is required".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Results and callbacks
// =============================================================================

/// One reconciled transcript update delivered to the consumer.
#[derive(Debug, Clone)]
pub struct RecognitionResult {
    /// The full reconciled text as currently displayed.
    pub text: String,
    /// True exactly once per session, on the terminal update.
    pub is_finished: bool,
}

impl RecognitionResult {
    pub fn new(text: String, is_finished: bool) -> Self {
        Self { text, is_finished }
    }
}

/// Async callback invoked for each transcript update.
pub type ResultCallback = Arc<
    dyn Fn(RecognitionResult) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync,
>;

/// Async callback invoked when the session fails.
pub type ErrorCallback =
    Arc<dyn Fn(SttError) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback invoked with file-recognition progress in `[0.0, 1.0]`.
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

// =============================================================================
// Provider trait
// =============================================================================

/// Unified interface for streaming speech-recognition providers.
///
/// A recognizer handles exactly one connect-stream-disconnect lifecycle at a
/// time; `start_streaming` on a session already past `Idle` fails with
/// [`SttError::ConcurrentSession`] without side effects.
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send {
    /// Create a recognizer from a validated configuration.
    fn new(config: RecognitionConfig) -> Result<Self, SttError>
    where
        Self: Sized;

    /// Inject the audio-capture collaborator used by `start_streaming`.
    fn set_capture(&mut self, capture: Box<dyn AudioCapture>);

    /// Begin a microphone session. Returns as soon as the connection is
    /// initiated; progress is delivered via callbacks.
    async fn start_streaming(&mut self) -> Result<(), SttError>;

    /// Recognize a whole audio file by streaming it in frames.
    async fn recognize_file(&mut self, path: &Path) -> Result<(), SttError>;

    /// Gracefully end the session. Idempotent; no-op when not running.
    async fn stop(&mut self) -> Result<(), SttError>;

    /// Tear the session down immediately. Idempotent; never errors on a
    /// closed session.
    async fn cancel(&mut self) -> Result<(), SttError>;

    /// Register the transcript-update callback.
    async fn on_result(&mut self, callback: ResultCallback) -> Result<(), SttError>;

    /// Register the error callback.
    async fn on_error(&mut self, callback: ErrorCallback) -> Result<(), SttError>;

    /// Current session state.
    fn state(&self) -> SessionState;

    /// True while audio frames are being accepted.
    fn is_ready(&self) -> bool;

    /// Access the base configuration.
    fn get_config(&self) -> Option<&RecognitionConfig>;

    /// Human-readable provider identification.
    fn provider_info(&self) -> &'static str;
}

impl std::fmt::Debug for dyn SpeechRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechRecognizer")
            .field("provider", &self.provider_info())
            .finish_non_exhaustive()
    }
}
