//! Xunfei (iFLYTEK) IAT streaming speech recognition integration.
//!
//! This module provides a streaming dictation client for the Xunfei IAT v2
//! WebSocket API with support for:
//!
//! - Real-time streaming transcription of 16 kHz mono PCM audio
//! - HMAC-SHA256 signed connection URLs (per-connection authorization)
//! - Dynamic correction (`wpgs`): partial results may revise earlier guesses
//! - Reconciliation of revisable fragments into a coherent transcript
//! - Graceful end-of-session with a final, committed result
//! - File recognition with progress reporting
//!
//! # Architecture
//!
//! The module is organized into focused submodules:
//!
//! - [`auth`]: Signed WebSocket URL construction
//! - [`config`]: Configuration types (`XunfeiSttConfig`, endpoint constants)
//! - [`messages`]: Wire message types for API communication
//! - [`transcript`]: Partial-result reconciliation (`TranscriptReconciler`)
//! - [`client`]: The main `XunfeiStt` client implementation
//!
//! # Partial Results
//!
//! Unlike providers with immutable transcripts, IAT with dynamic correction
//! enabled may rewrite its most recent guess as more audio arrives. Each
//! delivered [`crate::core::stt::RecognitionResult`] therefore carries the
//! full reconciled text rather than a delta; consumers replace their display
//! with it wholesale.
//!
//! # Example
//!
//! ```rust,no_run
//! use voicepace::core::stt::{RecognitionConfig, SpeechRecognizer, XunfeiStt};
//! use std::sync::Arc;
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
//!
//!     stt.on_result(Arc::new(|result| {
//!         Box::pin(async move {
//!             println!("Transcript: {}", result.text);
//!             if result.is_finished {
//!                 println!("(session finished)");
//!             }
//!         })
//!     }))
//!     .await?;
//!
//!     stt.recognize_file(std::path::Path::new("speech.pcm")).await?;
//!     stt.stop().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
mod client;
pub mod config;
mod messages;
mod transcript;

#[cfg(test)]
mod tests;

// Re-export public types
pub use client::XunfeiStt;
pub use config::{DEFAULT_VAD_EOS_MS, IAT_HOST, IAT_URL, XunfeiSttConfig};
pub use messages::{
    AudioPacket, CorrectionMode, FrameStatus, HandshakePacket, InboundFragment, InboundMessage,
};
pub use transcript::TranscriptReconciler;
