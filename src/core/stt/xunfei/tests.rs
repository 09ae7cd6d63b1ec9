//! Tests for the Xunfei IAT STT implementation.
//!
//! This module contains unit tests for:
//! - Configuration handling and URL signing
//! - Inbound message handling and reconciliation
//! - Client state management
//! - Error handling

use super::*;
use crate::core::stt::base::{RecognitionConfig, SessionState, SpeechRecognizer, SttError};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;

fn test_config() -> RecognitionConfig {
    RecognitionConfig {
        app_id: "app123".to_string(),
        api_key: "key456".to_string(),
        api_secret: "secret789".to_string(),
        ..Default::default()
    }
}

// =============================================================================
// Construction Tests
// =============================================================================

mod construction_tests {
    use super::*;

    #[test]
    fn test_new_with_valid_config() {
        let stt = XunfeiStt::new(test_config()).unwrap();
        assert_eq!(stt.state(), SessionState::Idle);
        assert!(!stt.is_ready());
        assert_eq!(stt.get_config().unwrap().app_id, "app123");
        assert_eq!(stt.provider_info(), "Xunfei IAT Streaming STT v2");
    }

    #[test]
    fn test_new_rejects_missing_credentials() {
        let mut config = test_config();
        config.api_secret.clear();

        let err = XunfeiStt::new(config).unwrap_err();
        assert!(matches!(err, SttError::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn test_start_streaming_without_capture() {
        let mut stt = XunfeiStt::new(test_config()).unwrap();
        let err = stt.start_streaming().await.unwrap_err();
        assert!(matches!(err, SttError::CaptureUnavailable(_)));
        // A rejected start leaves the session idle.
        assert_eq!(stt.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_stop_and_cancel_are_idempotent_when_idle() {
        let mut stt = XunfeiStt::new(test_config()).unwrap();
        assert!(stt.stop().await.is_ok());
        assert!(stt.cancel().await.is_ok());
        assert!(stt.stop().await.is_ok());
        assert_eq!(stt.state(), SessionState::Idle);
    }
}

// =============================================================================
// Inbound Handling Tests
// =============================================================================

mod inbound_tests {
    use super::*;
    use crate::core::stt::base::RecognitionResult;
    use parking_lot::Mutex;

    fn channel() -> (
        mpsc::Sender<RecognitionResult>,
        mpsc::Receiver<RecognitionResult>,
    ) {
        mpsc::channel(256)
    }

    fn text(json: &str) -> Message {
        Message::Text(json.to_string().into())
    }

    #[test]
    fn test_partial_results_are_reconciled_across_messages() {
        let (tx, mut rx) = channel();
        let mut reconciler = TranscriptReconciler::new();
        let transcript = Mutex::new(String::new());

        let first = r#"{"code":0,"data":{"status":1,"result":{"pgs":"apd",
            "ws":[{"cw":[{"w":"你"}]},{"cw":[{"w":"好"}]}]}}}"#;
        assert!(XunfeiStt::handle_inbound(text(first), &mut reconciler, &transcript, &tx).unwrap());
        assert_eq!(rx.try_recv().unwrap().text, "你好");

        // A replacement revises the whole provisional tail.
        let second = r#"{"code":0,"data":{"status":1,"result":{"pgs":"rpl","rg":[1,2],
            "ws":[{"cw":[{"w":"你"}]},{"cw":[{"w":"好"}]},{"cw":[{"w":"世"}]},{"cw":[{"w":"界"}]}]}}}"#;
        assert!(
            XunfeiStt::handle_inbound(text(second), &mut reconciler, &transcript, &tx).unwrap()
        );
        let update = rx.try_recv().unwrap();
        assert_eq!(update.text, "你好世界");
        assert!(!update.is_finished);
        assert_eq!(*transcript.lock(), "你好世界");
    }

    #[test]
    fn test_finished_message_finalizes_and_stops() {
        let (tx, mut rx) = channel();
        let mut reconciler = TranscriptReconciler::new();
        let transcript = Mutex::new(String::new());

        let partial = r#"{"code":0,"data":{"status":1,"result":{"pgs":"apd",
            "ws":[{"cw":[{"w":"你好"}]}]}}}"#;
        assert!(
            XunfeiStt::handle_inbound(text(partial), &mut reconciler, &transcript, &tx).unwrap()
        );
        rx.try_recv().unwrap();

        let finished = r#"{"code":0,"sid":"iat000abc","data":{"status":2,"result":{
            "ws":[{"cw":[{"w":"。"}]}]}}}"#;
        let should_continue =
            XunfeiStt::handle_inbound(text(finished), &mut reconciler, &transcript, &tx).unwrap();
        assert!(!should_continue);

        let update = rx.try_recv().unwrap();
        assert_eq!(update.text, "你好。");
        assert!(update.is_finished);
    }

    #[test]
    fn test_finished_without_result_still_delivers_terminal_update() {
        let (tx, mut rx) = channel();
        let mut reconciler = TranscriptReconciler::new();
        let transcript = Mutex::new(String::new());
        reconciler.apply(&InboundFragment {
            text: "你好".to_string(),
            correction: CorrectionMode::None,
            is_finished: false,
        });

        let finished = r#"{"code":0,"data":{"status":2}}"#;
        assert!(
            !XunfeiStt::handle_inbound(text(finished), &mut reconciler, &transcript, &tx).unwrap()
        );

        let update = rx.try_recv().unwrap();
        assert_eq!(update.text, "你好");
        assert!(update.is_finished);
    }

    #[test]
    fn test_nonzero_code_is_provider_error() {
        let (tx, _rx) = channel();
        let mut reconciler = TranscriptReconciler::new();
        let transcript = Mutex::new(String::new());

        let msg = r#"{"code":10165,"message":"invalid app_id"}"#;
        let err =
            XunfeiStt::handle_inbound(text(msg), &mut reconciler, &transcript, &tx).unwrap_err();

        if let SttError::ProviderError(detail) = err {
            assert!(detail.contains("10165"));
            assert!(detail.contains("invalid app_id"));
        } else {
            panic!("Expected ProviderError");
        }
    }

    #[test]
    fn test_malformed_payload_is_parse_error() {
        let (tx, _rx) = channel();
        let mut reconciler = TranscriptReconciler::new();
        let transcript = Mutex::new(String::new());

        let err =
            XunfeiStt::handle_inbound(text("not json at all"), &mut reconciler, &transcript, &tx)
                .unwrap_err();
        assert!(matches!(err, SttError::ParseError(_)));
    }

    #[test]
    fn test_close_frame_ends_session() {
        let (tx, _rx) = channel();
        let mut reconciler = TranscriptReconciler::new();
        let transcript = Mutex::new(String::new());

        let should_continue =
            XunfeiStt::handle_inbound(Message::Close(None), &mut reconciler, &transcript, &tx)
                .unwrap();
        assert!(!should_continue);
    }

    #[test]
    fn test_ping_pong_are_ignored() {
        let (tx, mut rx) = channel();
        let mut reconciler = TranscriptReconciler::new();
        let transcript = Mutex::new(String::new());

        assert!(
            XunfeiStt::handle_inbound(Message::Ping(vec![].into()), &mut reconciler, &transcript, &tx)
                .unwrap()
        );
        assert!(
            XunfeiStt::handle_inbound(Message::Pong(vec![].into()), &mut reconciler, &transcript, &tx)
                .unwrap()
        );
        assert!(rx.try_recv().is_err());
    }
}

// =============================================================================
// Signing Tests
// =============================================================================

mod signing_tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_signed_url_is_deterministic_for_fixed_instant() {
        let config = XunfeiSttConfig::from_base(test_config());
        let now = datetime!(2024-05-01 12:00:00 UTC);

        let a = config.signed_url(now).unwrap();
        let b = config.signed_url(now).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_signed_url_carries_all_auth_params() {
        let config = XunfeiSttConfig::from_base(test_config());
        let url = config.signed_url(datetime!(2024-05-01 12:00:00 UTC)).unwrap();

        let params: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
        assert_eq!(params, ["authorization", "date", "host"]);
    }
}
