//! Configuration types for the Xunfei IAT streaming dictation service.
//!
//! This module contains all configuration-related types including:
//! - Service endpoint constants
//! - Voice-activity end-of-speech tuning
//! - Dynamic correction (wpgs) selection
//! - Handshake and signed-URL construction helpers

use std::time::Duration;

use time::OffsetDateTime;
use url::Url;

use super::super::base::{RecognitionConfig, SttError};
use super::auth;
use super::messages::{
    AUDIO_ENCODING, AUDIO_FORMAT, BusinessParams, CommonParams, FrameStatus, HandshakeData,
    HandshakePacket,
};

// =============================================================================
// Service endpoint
// =============================================================================

/// WebSocket endpoint of the IAT dictation service.
pub const IAT_URL: &str = "wss://iat-api.xfyun.cn/v2/iat";

/// Host name signed into the authorization digest.
pub const IAT_HOST: &str = "iat-api.xfyun.cn";

/// Request line signed into the authorization digest.
pub const IAT_REQUEST_LINE: &str = "GET /v2/iat HTTP/1.1";

/// Default trailing-silence end-of-speech timeout in milliseconds.
pub const DEFAULT_VAD_EOS_MS: u32 = 5000;

/// Default hard cap on session length.
pub const DEFAULT_MAX_SESSION: Duration = Duration::from_secs(60);

// =============================================================================
// Main Configuration
// =============================================================================

/// Configuration specific to the Xunfei IAT streaming service.
///
/// Extends the base `RecognitionConfig` with IAT-specific parameters for
/// the signed WebSocket handshake.
#[derive(Debug, Clone)]
pub struct XunfeiSttConfig {
    /// Base recognition configuration (credentials, language, sample rate).
    pub base: RecognitionConfig,

    /// Trailing-silence timeout in milliseconds before the service declares
    /// end of speech on its own.
    pub vad_eos_ms: u32,

    /// Enable dynamic correction (`dwa: "wpgs"`).
    ///
    /// With correction on, the service may revise its most recent partial
    /// result; fragments carry `pgs` markers describing the revision.
    pub dynamic_correction: bool,

    /// Hard cap on session length; the session closes itself when reached.
    pub max_session: Duration,

    /// WebSocket endpoint. Overridable for testing against a local server.
    pub endpoint: String,

    /// Host name used in the signature. Must match the endpoint host.
    pub host: String,
}

impl Default for XunfeiSttConfig {
    fn default() -> Self {
        Self {
            base: RecognitionConfig::default(),
            vad_eos_ms: DEFAULT_VAD_EOS_MS,
            dynamic_correction: true,
            max_session: DEFAULT_MAX_SESSION,
            endpoint: IAT_URL.to_string(),
            host: IAT_HOST.to_string(),
        }
    }
}

impl XunfeiSttConfig {
    /// Create a configuration from base credentials with IAT defaults.
    pub fn from_base(base: RecognitionConfig) -> Self {
        Self {
            base,
            ..Default::default()
        }
    }

    /// Accent model matching the configured language.
    pub fn accent(&self) -> &'static str {
        // The IAT dictation domain only distinguishes mandarin today;
        // other accents require a different service plan.
        "mandarin"
    }

    /// Build the signed WebSocket URL for a connection opened at `now`.
    pub fn signed_url(&self, now: OffsetDateTime) -> Result<Url, SttError> {
        auth::signed_url(&self.base, &self.endpoint, &self.host, IAT_REQUEST_LINE, now)
    }

    /// Build the handshake packet sent as the first message of a session.
    pub fn handshake(&self) -> HandshakePacket {
        HandshakePacket {
            common: CommonParams {
                app_id: self.base.app_id.clone(),
            },
            business: BusinessParams {
                language: self.base.language.clone(),
                domain: "iat",
                accent: self.accent(),
                vad_eos: self.vad_eos_ms,
                dwa: self.dynamic_correction.then_some("wpgs"),
            },
            data: HandshakeData {
                status: FrameStatus::Initial,
                format: AUDIO_FORMAT,
                encoding: AUDIO_ENCODING,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn test_config() -> XunfeiSttConfig {
        XunfeiSttConfig::from_base(RecognitionConfig {
            app_id: "app123".to_string(),
            api_key: "key456".to_string(),
            api_secret: "secret789".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_default_config() {
        let config = XunfeiSttConfig::default();
        assert_eq!(config.vad_eos_ms, 5000);
        assert!(config.dynamic_correction);
        assert_eq!(config.max_session, Duration::from_secs(60));
        assert_eq!(config.endpoint, "wss://iat-api.xfyun.cn/v2/iat");
        assert_eq!(config.host, "iat-api.xfyun.cn");
    }

    #[test]
    fn test_signed_url_targets_endpoint() {
        let url = test_config()
            .signed_url(datetime!(2024-01-03 04:05:06 UTC))
            .unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.host_str(), Some("iat-api.xfyun.cn"));
        assert_eq!(url.path(), "/v2/iat");
    }

    #[test]
    fn test_handshake_reflects_config() {
        let mut config = test_config();
        config.vad_eos_ms = 3000;
        let json = serde_json::to_value(config.handshake()).unwrap();
        assert_eq!(json["common"]["app_id"], "app123");
        assert_eq!(json["business"]["language"], "zh_cn");
        assert_eq!(json["business"]["vad_eos"], 3000);
        assert_eq!(json["business"]["dwa"], "wpgs");
        assert_eq!(json["data"]["status"], 0);
    }

    #[test]
    fn test_handshake_without_dynamic_correction() {
        let mut config = test_config();
        config.dynamic_correction = false;
        let json = serde_json::to_value(config.handshake()).unwrap();
        assert!(json["business"].get("dwa").is_none());
    }
}
