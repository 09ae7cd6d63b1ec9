//! Streaming speech recognition with live speaking-rate analytics.
//!
//! `voicepace` streams microphone or file audio to the Xunfei IAT dictation
//! service over a signed WebSocket session, reconciles dynamically-corrected
//! partial results into a stable transcript stream, and derives speaking-rate
//! figures from that stream.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voicepace::core::{RecognitionConfig, SpeechRecognizer, XunfeiStt};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RecognitionConfig {
//!         app_id: "your-app-id".to_string(),
//!         api_key: "your-api-key".to_string(),
//!         api_secret: "your-api-secret".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let mut stt = XunfeiStt::new(config)?;
//!     stt.on_result(Arc::new(|result| {
//!         Box::pin(async move {
//!             println!("{}", result.text);
//!         })
//!     }))
//!     .await?;
//!
//!     stt.recognize_file(std::path::Path::new("speech.pcm")).await?;
//!     stt.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod core;

// Re-export commonly used items for convenience
pub use core::*;
