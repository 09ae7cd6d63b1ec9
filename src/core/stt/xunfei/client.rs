//! Xunfei IAT streaming recognition client.
//!
//! This module contains the main `XunfeiStt` struct that implements the
//! `SpeechRecognizer` trait for real-time dictation over the IAT WebSocket
//! API.
//!
//! # Key Features
//!
//! - **Signed Handshake**: The WebSocket URL carries an HMAC-SHA256
//!   authorization computed per connection (see [`super::auth`])
//! - **Dynamic Correction**: Partial results may revise earlier guesses;
//!   fragments are reconciled into a coherent transcript before delivery
//! - **Base64 Audio**: Audio frames travel inside JSON text messages,
//!   base64-encoded
//! - **Session Cap**: A hard duration limit ends over-long sessions
//!   gracefully

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex as SyncMutex;
use tokio::sync::{Mutex, mpsc};
use tokio::time::{Instant, timeout};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};

use super::config::XunfeiSttConfig;
use super::messages::{AudioPacket, FrameStatus, InboundMessage};
use super::transcript::TranscriptReconciler;
use crate::core::audio::{AudioCapture, AudioFrame, CaptureSpec, FRAME_SIZE, FileAudioSource};
use crate::core::stt::base::{
    ErrorCallback, ProgressCallback, RecognitionConfig, RecognitionResult, ResultCallback,
    SessionState, SpeechRecognizer, SttError,
};

// =============================================================================
// Constants
// =============================================================================

/// Per-message idle timeout for WebSocket message reception.
/// Resets after each successful message. Catches stuck/dead connections.
const WS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// How long `stop` waits for the service's final result before giving up.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// =============================================================================
// Type Aliases
// =============================================================================

/// Type alias for the async result callback function.
type AsyncResultCallback = Box<
    dyn Fn(RecognitionResult) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
        + Send
        + Sync,
>;

/// Type alias for the async error callback function.
type AsyncErrorCallback = Box<
    dyn Fn(SttError) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
        + Send
        + Sync,
>;

/// Shutdown request delivered to the connection task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shutdown {
    /// Send the terminal packet and wait for the service's final result.
    Graceful,
    /// Close the transport immediately; no final result is expected.
    Immediate,
}

// =============================================================================
// XunfeiStt Client
// =============================================================================

/// Xunfei IAT streaming recognition client.
///
/// Manages one connect-stream-disconnect lifecycle at a time:
/// - Signed WebSocket connection establishment
/// - Audio frame transmission (base64 inside JSON)
/// - Partial-result reconciliation and transcript callbacks
/// - Graceful and immediate shutdown
///
/// # Architecture
///
/// ```text
/// ┌──────────────┐     ┌──────────────────┐     ┌─────────────────┐
/// │ AudioCapture │────▶│ frame_tx (mpsc)  │────▶│ Connection Task │
/// └──────────────┘     └──────────────────┘     └────────┬────────┘
///                                                        │ reconcile
///                      ┌──────────────────┐              │
///                      │ result_tx (mpsc) │◀─────────────┘
///                      └────────┬─────────┘
///                               │
///                      ┌────────▼─────────┐
///                      │ Result Forward   │────▶ User Callback
///                      │      Task        │
///                      └──────────────────┘
/// ```
///
/// The connection task owns the WebSocket exclusively. `start_streaming`
/// returns as soon as the task is spawned; connection progress and all
/// results arrive through the registered callbacks.
///
/// # Thread Safety
///
/// Shared state uses:
/// - `tokio::sync::Mutex` for async-safe access to callbacks
/// - `parking_lot::Mutex` for the session-state snapshot
/// - `Arc<AtomicBool>` flags for single-flight admission and frame gating
/// - Bounded `mpsc` channels for backpressure control
pub struct XunfeiStt {
    /// Configuration for the recognition client.
    pub(crate) config: Option<XunfeiSttConfig>,

    /// Injected capture collaborator; consumed by the next session.
    capture: Option<Box<dyn AudioCapture>>,

    /// Session state snapshot (shared with the connection task).
    state: Arc<SyncMutex<SessionState>>,

    /// Single-flight admission flag. Set before any I/O; cleared when the
    /// connection task exits.
    session_active: Arc<AtomicBool>,

    /// True only while the transport accepts audio. Frames arriving while
    /// this is false are dropped, never queued.
    accepting_audio: Arc<AtomicBool>,

    /// Shutdown request sender (shared by stop/cancel/Drop).
    shutdown_tx: Option<mpsc::Sender<Shutdown>>,

    /// Connection task handle.
    connection_handle: Option<tokio::task::JoinHandle<()>>,

    /// Result forwarding task handle.
    result_forward_handle: Option<tokio::task::JoinHandle<()>>,

    /// Error forwarding task handle.
    error_forward_handle: Option<tokio::task::JoinHandle<()>>,

    /// Shared callback storage for async access.
    result_callback: Arc<Mutex<Option<AsyncResultCallback>>>,

    /// Error callback storage.
    error_callback: Arc<Mutex<Option<AsyncErrorCallback>>>,

    /// File-recognition progress callback storage.
    progress_callback: Arc<SyncMutex<Option<ProgressCallback>>>,

    /// Latest reconciled transcript. Survives a failed session; cleared when
    /// the next session starts.
    transcript: Arc<SyncMutex<String>>,
}

impl std::fmt::Debug for XunfeiStt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XunfeiStt")
            .field("config", &self.config)
            .field("session_active", &self.session_active)
            .field("accepting_audio", &self.accepting_audio)
            .finish_non_exhaustive()
    }
}

impl XunfeiStt {
    /// Handle one inbound WebSocket message.
    ///
    /// Parses the JSON payload, folds any recognition fragment into the
    /// reconciler, and emits the updated transcript.
    ///
    /// # Returns
    /// * `Ok(true)` - Continue processing messages
    /// * `Ok(false)` - Session finished or transport closed
    /// * `Err(SttError)` - Error occurred, close connection
    pub(crate) fn handle_inbound(
        message: Message,
        reconciler: &mut TranscriptReconciler,
        transcript: &SyncMutex<String>,
        result_tx: &mpsc::Sender<RecognitionResult>,
    ) -> Result<bool, SttError> {
        match message {
            Message::Text(text) => {
                debug!("Received IAT message: {}", text);

                let inbound = InboundMessage::parse(&text)
                    .map_err(|e| SttError::ParseError(format!("malformed IAT message: {e}")))?;

                if inbound.code != 0 {
                    return Err(SttError::ProviderError(format!(
                        "IAT error code {}: {}",
                        inbound.code,
                        inbound.message.as_deref().unwrap_or("no detail"),
                    )));
                }

                if let Some(fragment) = inbound.fragment() {
                    let text = if fragment.is_finished {
                        reconciler.apply(&fragment);
                        reconciler.finalize()
                    } else {
                        reconciler.apply(&fragment)
                    };
                    transcript.lock().clone_from(&text);

                    let result = RecognitionResult::new(text, fragment.is_finished);
                    if result_tx.try_send(result).is_err() {
                        warn!("Failed to deliver transcript update - channel closed");
                    }

                    if fragment.is_finished {
                        if let Some(sid) = inbound.sid.as_deref() {
                            info!("IAT session {} finished", sid);
                        }
                        return Ok(false);
                    }
                }

                Ok(true)
            }

            Message::Close(close_frame) => {
                info!("IAT WebSocket closed: {:?}", close_frame);
                Ok(false)
            }

            Message::Ping(_) | Message::Pong(_) => Ok(true),

            Message::Binary(_) => {
                debug!("Ignoring unexpected binary message from IAT");
                Ok(true)
            }

            _ => Ok(true),
        }
    }

    /// Spawn the connection task and supporting forwarders for one session.
    ///
    /// Returns as soon as the tasks are running; it does not wait for the
    /// transport to open. Exactly one session may run at a time.
    async fn start_session(
        &mut self,
        mut capture: Box<dyn AudioCapture>,
        total_frames: Option<usize>,
    ) -> Result<(), SttError> {
        let config = self
            .config
            .clone()
            .ok_or_else(|| SttError::ConfigurationError("No configuration available".to_string()))?;
        config.base.validate()?;

        // Single-flight admission, before any I/O or task spawn.
        if self
            .session_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SttError::ConcurrentSession(
                "a recognition session is already running".to_string(),
            ));
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<Shutdown>(2);
        // Bounded channels for backpressure while preventing memory exhaustion.
        let (result_tx, mut result_rx) = mpsc::channel::<RecognitionResult>(256);
        let (error_tx, mut error_rx) = mpsc::channel::<SttError>(64);

        self.shutdown_tx = Some(shutdown_tx);
        *self.state.lock() = SessionState::Connecting;
        self.transcript.lock().clear();

        let state = self.state.clone();
        let session_active = self.session_active.clone();
        let accepting_audio = self.accepting_audio.clone();
        let progress_callback = self.progress_callback.clone();
        let transcript = self.transcript.clone();

        let connection_handle = tokio::spawn(async move {
            let fail = |state: &Arc<SyncMutex<SessionState>>,
                        error_tx: &mpsc::Sender<SttError>,
                        err: SttError| {
                error!("{}", err);
                let _ = error_tx.try_send(err);
                *state.lock() = SessionState::Failed;
            };

            // Sign the URL at connect time; the digest embeds the current
            // date and expires service-side after a few minutes.
            let url = match config.signed_url(time::OffsetDateTime::now_utc()) {
                Ok(url) => url,
                Err(e) => {
                    fail(&state, &error_tx, e);
                    session_active.store(false, Ordering::Release);
                    return;
                }
            };

            let (ws_stream, _response) = match connect_async(url.as_str()).await {
                Ok(result) => result,
                Err(e) => {
                    let err =
                        SttError::ConnectionFailed(format!("Failed to connect to IAT: {e}"));
                    fail(&state, &error_tx, err);
                    session_active.store(false, Ordering::Release);
                    return;
                }
            };

            info!("Connected to IAT WebSocket");

            let (mut ws_sink, mut ws_stream) = ws_stream.split();

            // First message of the session carries the business parameters.
            let handshake = match serde_json::to_string(&config.handshake()) {
                Ok(json) => json,
                Err(e) => {
                    let err = SttError::ConfigurationError(format!(
                        "Failed to serialize handshake: {e}"
                    ));
                    fail(&state, &error_tx, err);
                    session_active.store(false, Ordering::Release);
                    return;
                }
            };
            if let Err(e) = ws_sink.send(Message::Text(handshake.into())).await {
                let err = SttError::NetworkError(format!("Failed to send handshake: {e}"));
                fail(&state, &error_tx, err);
                session_active.store(false, Ordering::Release);
                return;
            }

            *state.lock() = SessionState::Streaming;
            accepting_audio.store(true, Ordering::Release);

            // The capture only gets its sink once the transport accepts
            // audio, so no frame can queue behind a connecting socket. The
            // capture winds down on channel closure: when this task drops
            // frame_rx, sends into the sink fail and start() returns, after
            // which the device is released.
            let (frame_tx, mut frame_rx) = mpsc::channel::<AudioFrame>(32);
            let spec = CaptureSpec {
                sample_rate: config.base.sample_rate,
                frame_size: FRAME_SIZE,
            };
            tokio::spawn(async move {
                if let Err(e) = capture.start(spec, frame_tx).await {
                    warn!("Audio capture ended with error: {}", e);
                }
                if let Err(e) = capture.stop().await {
                    warn!("Audio capture did not stop cleanly: {}", e);
                }
            });

            let mut reconciler = TranscriptReconciler::new();
            let mut frames_sent: usize = 0;
            let mut final_sent = false;

            let deadline = tokio::time::sleep(config.max_session);
            tokio::pin!(deadline);

            // Main event loop
            loop {
                tokio::select! {
                    // Outgoing audio frames from the capture.
                    maybe_frame = frame_rx.recv(), if !final_sent => {
                        let Some(frame) = maybe_frame else {
                            // Capture ended without a final frame (e.g. a
                            // device error). End the session gracefully so
                            // the text recognized so far is finalized.
                            debug!("Capture channel closed; sending terminal packet");
                            if Self::send_terminal(&mut ws_sink, &error_tx, &state).await {
                                final_sent = true;
                                accepting_audio.store(false, Ordering::Release);
                                *state.lock() = SessionState::Closing;
                                deadline.as_mut().reset(Instant::now() + SHUTDOWN_GRACE);
                                continue;
                            }
                            break;
                        };

                        if !accepting_audio.load(Ordering::Acquire) {
                            // Transport is not open for audio; drop, never queue.
                            debug!("Dropped {} byte frame - transport not accepting audio", frame.payload.len());
                            continue;
                        }

                        let status = if frame.is_final {
                            FrameStatus::Final
                        } else {
                            FrameStatus::Continue
                        };
                        let packet = AudioPacket::new(&frame.payload, status);
                        let json = match serde_json::to_string(&packet) {
                            Ok(json) => json,
                            Err(e) => {
                                let err = SttError::ProviderError(format!(
                                    "Failed to serialize audio packet: {e}"
                                ));
                                fail(&state, &error_tx, err);
                                break;
                            }
                        };
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            let err = SttError::NetworkError(format!(
                                "Failed to send audio to IAT: {e}"
                            ));
                            fail(&state, &error_tx, err);
                            break;
                        }

                        frames_sent += 1;
                        if let (Some(total), Some(cb)) =
                            (total_frames, progress_callback.lock().as_ref())
                        {
                            cb((frames_sent as f64 / total.max(1) as f64).min(1.0));
                        }

                        if frame.is_final {
                            debug!("Sent final audio frame ({} total)", frames_sent);
                            final_sent = true;
                            accepting_audio.store(false, Ordering::Release);
                            *state.lock() = SessionState::Closing;
                            deadline.as_mut().reset(Instant::now() + SHUTDOWN_GRACE);
                        }
                    }

                    // Incoming messages with idle timeout.
                    message = timeout(WS_MESSAGE_TIMEOUT, ws_stream.next()) => {
                        match message {
                            Ok(Some(Ok(msg))) => {
                                match Self::handle_inbound(msg, &mut reconciler, &transcript, &result_tx) {
                                    Ok(true) => {}
                                    Ok(false) => {
                                        *state.lock() = SessionState::Closed;
                                        break;
                                    }
                                    Err(e) => {
                                        fail(&state, &error_tx, e);
                                        break;
                                    }
                                }
                            }
                            Ok(Some(Err(e))) => {
                                let err = SttError::NetworkError(format!("WebSocket error: {e}"));
                                fail(&state, &error_tx, err);
                                break;
                            }
                            Ok(None) => {
                                info!("IAT WebSocket stream ended");
                                *state.lock() = SessionState::Closed;
                                break;
                            }
                            Err(_elapsed) => {
                                let err = SttError::NetworkError(
                                    "WebSocket idle timeout - no message for 60 seconds".into()
                                );
                                fail(&state, &error_tx, err);
                                break;
                            }
                        }
                    }

                    // Hard cap on session length, reused as the grace window
                    // once the terminal packet is out.
                    _ = &mut deadline => {
                        if final_sent {
                            warn!("Timed out waiting for the final result; closing");
                            let _ = ws_sink.send(Message::Close(None)).await;
                            *state.lock() = SessionState::Closed;
                            break;
                        }
                        info!(
                            "Session duration limit of {:?} reached; ending gracefully",
                            config.max_session
                        );
                        accepting_audio.store(false, Ordering::Release);
                        if !Self::send_terminal(&mut ws_sink, &error_tx, &state).await {
                            break;
                        }
                        final_sent = true;
                        *state.lock() = SessionState::Closing;
                        // Leave a short window for the final result.
                        deadline.as_mut().reset(Instant::now() + SHUTDOWN_GRACE);
                    }

                    // Deliberate shutdown from stop/cancel/Drop.
                    maybe_req = shutdown_rx.recv() => {
                        match maybe_req {
                            Some(Shutdown::Graceful) if !final_sent => {
                                info!("Graceful shutdown requested");
                                accepting_audio.store(false, Ordering::Release);
                                if !Self::send_terminal(&mut ws_sink, &error_tx, &state).await {
                                    break;
                                }
                                final_sent = true;
                                *state.lock() = SessionState::Closing;
                                deadline.as_mut().reset(Instant::now() + SHUTDOWN_GRACE);
                            }
                            Some(Shutdown::Graceful) => {
                                // Terminal packet already sent; keep waiting
                                // for the final result.
                            }
                            Some(Shutdown::Immediate) | None => {
                                info!("Immediate shutdown requested");
                                let _ = ws_sink.send(Message::Close(None)).await;
                                *state.lock() = SessionState::Closed;
                                break;
                            }
                        }
                    }
                }
            }

            accepting_audio.store(false, Ordering::Release);
            session_active.store(false, Ordering::Release);
            info!("IAT WebSocket connection closed");
        });

        self.connection_handle = Some(connection_handle);

        // Result forwarding task.
        let callback_ref = self.result_callback.clone();
        let result_forward_handle = tokio::spawn(async move {
            while let Some(result) = result_rx.recv().await {
                if let Some(callback) = callback_ref.lock().await.as_ref() {
                    callback(result).await;
                } else {
                    debug!(
                        "Transcript update (no callback): {} (finished: {})",
                        result.text, result.is_finished
                    );
                }
            }
        });
        self.result_forward_handle = Some(result_forward_handle);

        // Error forwarding task.
        let error_callback_ref = self.error_callback.clone();
        let error_forward_handle = tokio::spawn(async move {
            while let Some(err) = error_rx.recv().await {
                if let Some(callback) = error_callback_ref.lock().await.as_ref() {
                    callback(err).await;
                } else {
                    error!("Recognition error (no callback registered): {}", err);
                }
            }
        });
        self.error_forward_handle = Some(error_forward_handle);

        Ok(())
    }

    /// Send the empty terminal packet that ends the audio stream.
    ///
    /// Returns false (after recording the failure) when the send fails.
    async fn send_terminal<S>(
        ws_sink: &mut S,
        error_tx: &mpsc::Sender<SttError>,
        state: &Arc<SyncMutex<SessionState>>,
    ) -> bool
    where
        S: futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        let packet = AudioPacket::terminal();
        let json = match serde_json::to_string(&packet) {
            Ok(json) => json,
            Err(e) => {
                let err =
                    SttError::ProviderError(format!("Failed to serialize terminal packet: {e}"));
                error!("{}", err);
                let _ = error_tx.try_send(err);
                *state.lock() = SessionState::Failed;
                return false;
            }
        };
        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
            let err = SttError::NetworkError(format!("Failed to send terminal packet: {e}"));
            error!("{}", err);
            let _ = error_tx.try_send(err);
            *state.lock() = SessionState::Failed;
            return false;
        }
        true
    }

    /// Wait for the connection task and forwarders to wind down.
    async fn join_session_tasks(&mut self) {
        if let Some(handle) = self.connection_handle.take() {
            if timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                warn!("Connection task did not exit within grace period");
            }
        }
        // Forwarders end naturally once the connection task drops its
        // channel senders.
        if let Some(handle) = self.result_forward_handle.take() {
            let _ = timeout(Duration::from_secs(1), handle).await;
        }
        if let Some(handle) = self.error_forward_handle.take() {
            let _ = timeout(Duration::from_secs(1), handle).await;
        }
        self.shutdown_tx = None;
    }

    /// Register the file-recognition progress callback.
    ///
    /// Invoked with values in `[0.0, 1.0]` as frames of the file are sent.
    pub fn on_progress(&mut self, callback: ProgressCallback) {
        *self.progress_callback.lock() = Some(callback);
    }

    /// Latest reconciled transcript.
    ///
    /// Text recognized before a transport failure stays readable here; a new
    /// session clears it.
    pub fn transcript(&self) -> String {
        self.transcript.lock().clone()
    }

    /// Create a client from a full provider configuration, including a
    /// non-default endpoint.
    pub fn with_config(config: XunfeiSttConfig) -> Result<Self, SttError> {
        config.base.validate()?;

        Ok(Self {
            config: Some(config),
            capture: None,
            state: Arc::new(SyncMutex::new(SessionState::Idle)),
            session_active: Arc::new(AtomicBool::new(false)),
            accepting_audio: Arc::new(AtomicBool::new(false)),
            shutdown_tx: None,
            connection_handle: None,
            result_forward_handle: None,
            error_forward_handle: None,
            result_callback: Arc::new(Mutex::new(None)),
            error_callback: Arc::new(Mutex::new(None)),
            progress_callback: Arc::new(SyncMutex::new(None)),
            transcript: Arc::new(SyncMutex::new(String::new())),
        })
    }
}

impl Drop for XunfeiStt {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.try_send(Shutdown::Immediate);
        }
    }
}

// =============================================================================
// SpeechRecognizer Trait Implementation
// =============================================================================

#[async_trait::async_trait]
impl SpeechRecognizer for XunfeiStt {
    fn new(config: RecognitionConfig) -> Result<Self, SttError> {
        Self::with_config(XunfeiSttConfig::from_base(config))
    }

    fn set_capture(&mut self, capture: Box<dyn AudioCapture>) {
        self.capture = Some(capture);
    }

    async fn start_streaming(&mut self) -> Result<(), SttError> {
        let capture = self.capture.take().ok_or_else(|| {
            SttError::CaptureUnavailable("no audio capture has been injected".to_string())
        })?;
        self.start_session(capture, None).await
    }

    async fn recognize_file(&mut self, path: &Path) -> Result<(), SttError> {
        let source = FileAudioSource::open(path).await?;
        let total_frames = source.frame_count(FRAME_SIZE);
        self.start_session(Box::new(source), Some(total_frames)).await
    }

    async fn stop(&mut self) -> Result<(), SttError> {
        if !self.session_active.load(Ordering::Acquire) {
            return Ok(());
        }
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(Shutdown::Graceful).await;
        }
        self.join_session_tasks().await;
        Ok(())
    }

    async fn cancel(&mut self) -> Result<(), SttError> {
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(Shutdown::Immediate).await;
        }
        self.join_session_tasks().await;

        let mut state = self.state.lock();
        if *state != SessionState::Idle && *state != SessionState::Failed {
            *state = SessionState::Closed;
        }
        Ok(())
    }

    async fn on_result(&mut self, callback: ResultCallback) -> Result<(), SttError> {
        *self.result_callback.lock().await = Some(Box::new(move |result| {
            let cb = callback.clone();
            Box::pin(async move {
                cb(result).await;
            })
        }));
        Ok(())
    }

    async fn on_error(&mut self, callback: ErrorCallback) -> Result<(), SttError> {
        *self.error_callback.lock().await = Some(Box::new(move |error| {
            let cb = callback.clone();
            Box::pin(async move {
                cb(error).await;
            })
        }));
        Ok(())
    }

    fn state(&self) -> SessionState {
        *self.state.lock()
    }

    fn is_ready(&self) -> bool {
        self.accepting_audio.load(Ordering::Acquire)
    }

    fn get_config(&self) -> Option<&RecognitionConfig> {
        self.config.as_ref().map(|c| &c.base)
    }

    fn provider_info(&self) -> &'static str {
        "Xunfei IAT Streaming STT v2"
    }
}
