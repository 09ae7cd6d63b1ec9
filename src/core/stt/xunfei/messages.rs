//! Wire message types for the Xunfei IAT WebSocket API.
//!
//! One JSON object per WebSocket text message, both directions:
//!
//! - **Outgoing**: [`HandshakePacket`] on connection open (carries session
//!   parameters and frame status 0), then [`AudioPacket`] per audio frame
//!   (status 1 for continuation, 2 for the terminal frame). Audio payloads
//!   are base64-encoded raw PCM.
//! - **Incoming**: [`InboundMessage`] with a result code, a status, and the
//!   recognized word lattice. The optional `pgs` field carries the dynamic
//!   correction mode when the `wpgs` feature is negotiated.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

/// Wire value of `data.format` for 16 kHz 16-bit PCM.
pub const AUDIO_FORMAT: &str = "audio/L16;rate=16000";

/// Wire value of `data.encoding` for raw (uncompressed) audio.
pub const AUDIO_ENCODING: &str = "raw";

// =============================================================================
// Outgoing packets (client to server)
// =============================================================================

/// Position of a packet inside the session's single ordered audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// First packet of the session; sent with the handshake.
    Initial,
    /// Any packet between the first and the last.
    Continue,
    /// Terminal packet; exactly one per completed session.
    Final,
}

impl FrameStatus {
    /// Wire encoding: 0 = first, 1 = continuation, 2 = final.
    pub fn as_wire(&self) -> u8 {
        match self {
            Self::Initial => 0,
            Self::Continue => 1,
            Self::Final => 2,
        }
    }
}

impl Serialize for FrameStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_wire())
    }
}

/// `common` section of the handshake.
#[derive(Debug, Clone, Serialize)]
pub struct CommonParams {
    pub app_id: String,
}

/// `business` section of the handshake.
#[derive(Debug, Clone, Serialize)]
pub struct BusinessParams {
    /// Recognition language (e.g. "zh_cn").
    pub language: String,
    /// Service domain; always "iat" for dictation.
    pub domain: &'static str,
    /// Accent model; "mandarin" for zh_cn.
    pub accent: &'static str,
    /// Trailing-silence end-of-speech timeout in milliseconds.
    pub vad_eos: u32,
    /// Dynamic correction switch; "wpgs" when enabled, omitted otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dwa: Option<&'static str>,
}

/// `data` section of the handshake (no audio yet).
#[derive(Debug, Clone, Serialize)]
pub struct HandshakeData {
    pub status: FrameStatus,
    pub format: &'static str,
    pub encoding: &'static str,
}

/// First packet of a session, sent as soon as the transport opens.
#[derive(Debug, Clone, Serialize)]
pub struct HandshakePacket {
    pub common: CommonParams,
    pub business: BusinessParams,
    pub data: HandshakeData,
}

/// `data` section of an audio packet.
#[derive(Debug, Clone, Serialize)]
pub struct AudioData {
    pub status: FrameStatus,
    pub format: &'static str,
    pub encoding: &'static str,
    /// Base64-encoded raw PCM; empty on the synthetic terminal packet.
    pub audio: String,
}

/// One audio frame on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct AudioPacket {
    pub data: AudioData,
}

impl AudioPacket {
    /// Wrap a raw PCM chunk for transmission.
    pub fn new(payload: &[u8], status: FrameStatus) -> Self {
        Self {
            data: AudioData {
                status,
                format: AUDIO_FORMAT,
                encoding: AUDIO_ENCODING,
                audio: BASE64.encode(payload),
            },
        }
    }

    /// Terminal packet with no audio, used to end a session from `stop()`.
    pub fn terminal() -> Self {
        Self::new(&[], FrameStatus::Final)
    }
}

// =============================================================================
// Incoming messages (server to client)
// =============================================================================

/// Dynamic-correction mode of one inbound fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorrectionMode {
    /// No dynamic correction negotiated; fragments append to stable text.
    #[default]
    None,
    /// `pgs = "apd"`: the previous provisional text becomes stable, this
    /// fragment starts a new provisional tail.
    Append,
    /// `pgs = "rpl"`: this fragment replaces the previous provisional guess.
    Replace,
}

impl CorrectionMode {
    fn from_pgs(pgs: Option<&str>) -> Self {
        match pgs {
            Some("apd") => Self::Append,
            Some("rpl") => Self::Replace,
            _ => Self::None,
        }
    }
}

/// One word candidate (`cw` entry).
#[derive(Debug, Clone, Deserialize)]
pub struct WordCandidate {
    pub w: String,
}

/// One slot of the word lattice (`ws` entry); candidates ranked best-first.
#[derive(Debug, Clone, Deserialize)]
pub struct WordSlot {
    #[serde(default)]
    pub cw: Vec<WordCandidate>,
}

/// The `data.result` payload of an inbound message.
#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionPayload {
    #[serde(default)]
    pub ws: Vec<WordSlot>,
    /// Dynamic correction marker: "apd" or "rpl". Absent when the feature is
    /// off or the fragment is plain.
    #[serde(default)]
    pub pgs: Option<String>,
    /// Replacement range for "rpl" fragments (informational).
    #[serde(default)]
    pub rg: Option<Vec<u32>>,
}

impl RecognitionPayload {
    /// Concatenate the best candidate of each slot into the fragment text.
    pub fn text(&self) -> String {
        self.ws
            .iter()
            .filter_map(|slot| slot.cw.first())
            .map(|cw| cw.w.as_str())
            .collect()
    }
}

/// The `data` section of an inbound message.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundData {
    /// 2 marks the last message of the session.
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub result: Option<RecognitionPayload>,
}

/// One inbound recognition message, possibly partial.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    /// 0 on success; anything else is a service-side failure.
    #[serde(default)]
    pub code: i32,
    /// Human-readable failure description accompanying a non-zero code.
    #[serde(default)]
    pub message: Option<String>,
    /// Service-assigned session id.
    #[serde(default)]
    pub sid: Option<String>,
    #[serde(default)]
    pub data: Option<InboundData>,
}

/// One fragment extracted from an [`InboundMessage`], ready for
/// reconciliation.
#[derive(Debug, Clone)]
pub struct InboundFragment {
    pub text: String,
    pub correction: CorrectionMode,
    pub is_finished: bool,
}

impl InboundMessage {
    /// Parse a WebSocket text payload.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// True when the service reported completion (`code == 0` and
    /// `data.status == 2`).
    pub fn is_finished(&self) -> bool {
        self.code == 0 && self.data.as_ref().map(|d| d.status) == Some(2)
    }

    /// Extract the reconcilable fragment, if the message carries one.
    ///
    /// Completion messages without a result payload still yield an empty
    /// fragment so the terminal update is delivered exactly once.
    pub fn fragment(&self) -> Option<InboundFragment> {
        let is_finished = self.is_finished();
        match self.data.as_ref().and_then(|d| d.result.as_ref()) {
            Some(result) => Some(InboundFragment {
                text: result.text(),
                correction: CorrectionMode::from_pgs(result.pgs.as_deref()),
                is_finished,
            }),
            None if is_finished => Some(InboundFragment {
                text: String::new(),
                correction: CorrectionMode::None,
                is_finished: true,
            }),
            None => None,
        }
    }
}
