pub mod analytics;
pub mod audio;
pub mod stt;

// Re-export commonly used types for convenience
pub use stt::{
    RecognitionConfig, RecognitionResult, RecognizerRegistry, SessionState, SpeechRecognizer,
    SttError, SttProvider, TranscriptReconciler, XunfeiStt, create_recognizer,
    create_recognizer_from_enum,
};

pub use audio::{AudioCapture, AudioFrame, CaptureSpec, FRAME_SIZE, FileAudioSource};

pub use analytics::{
    RateAnalyticsEngine, RateClass, RateClassifier, RateSample, RateThresholds, SessionSummary,
    word_count,
};
