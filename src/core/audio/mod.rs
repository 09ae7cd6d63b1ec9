//! Audio capture contract.
//!
//! Capture devices are external collaborators; the session only sees this
//! narrow interface. A capture produces fixed-format raw audio frames (16-bit
//! PCM, mono) and marks the session's last frame. Frames are delivered through
//! a bounded channel owned by the session's connection task.

use std::path::Path;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use crate::core::stt::SttError;

/// Nominal audio chunk size in bytes (40 ms of 16 kHz mono 16-bit PCM).
pub const FRAME_SIZE: usize = 1280;

/// Default capture sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

/// One raw audio chunk in capture order.
///
/// `is_final` appears on exactly one frame per session (the last), or never
/// if the session is cancelled.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub payload: Bytes,
    pub is_final: bool,
}

/// Parameters a capture device is started with.
#[derive(Debug, Clone, Copy)]
pub struct CaptureSpec {
    pub sample_rate: u32,
    pub frame_size: usize,
}

impl Default for CaptureSpec {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            frame_size: FRAME_SIZE,
        }
    }
}

/// Narrow interface over whatever capture device is present.
///
/// The production implementation adapts a real microphone backend; tests use
/// scripted captures. The session owns the handle exclusively for the
/// lifetime of one session and stops it on every exit path.
#[async_trait::async_trait]
pub trait AudioCapture: Send {
    /// Start producing frames into `sink`. Must deliver frames in capture
    /// order and close the channel (by dropping the sender) after the final
    /// frame.
    async fn start(
        &mut self,
        spec: CaptureSpec,
        sink: mpsc::Sender<AudioFrame>,
    ) -> Result<(), SttError>;

    /// Release the capture device. The session calls this after `start`
    /// returns, on every exit path. Safe to call when not capturing.
    async fn stop(&mut self) -> Result<(), SttError>;
}

// =============================================================================
// File-backed capture
// =============================================================================

/// Capture implementation that replays an audio file as fixed-size frames.
///
/// Used by file recognition: the whole file is read up front, then chunked
/// into `frame_size` pieces with the last chunk marked final.
pub struct FileAudioSource {
    data: Bytes,
}

impl FileAudioSource {
    /// Read `path` into memory. Unreadable input maps to
    /// [`SttError::CaptureRead`].
    pub async fn open(path: &Path) -> Result<Self, SttError> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            SttError::CaptureRead(format!("failed to read {}: {e}", path.display()))
        })?;
        if data.is_empty() {
            return Err(SttError::CaptureRead(format!(
                "audio file {} is empty",
                path.display()
            )));
        }
        Ok(Self {
            data: Bytes::from(data),
        })
    }

    /// Build a source from an in-memory buffer.
    pub fn from_bytes(data: Bytes) -> Self {
        Self { data }
    }

    /// Number of frames this source will produce for `frame_size`.
    pub fn frame_count(&self, frame_size: usize) -> usize {
        self.data.len().div_ceil(frame_size)
    }
}

#[async_trait::async_trait]
impl AudioCapture for FileAudioSource {
    async fn start(
        &mut self,
        spec: CaptureSpec,
        sink: mpsc::Sender<AudioFrame>,
    ) -> Result<(), SttError> {
        let total = self.data.len();
        let frame_size = spec.frame_size.max(1);
        let mut offset = 0;

        while offset < total {
            let end = (offset + frame_size).min(total);
            let frame = AudioFrame {
                payload: self.data.slice(offset..end),
                is_final: end == total,
            };
            offset = end;
            if sink.send(frame).await.is_err() {
                // Session went away; nothing left to deliver.
                debug!("frame sink closed with {} of {} bytes sent", offset, total);
                break;
            }
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), SttError> {
        // File replay ends with the sink; no device to release.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_source_chunks_and_marks_final_frame() {
        let mut source = FileAudioSource::from_bytes(Bytes::from(vec![7u8; 3000]));
        assert_eq!(source.frame_count(FRAME_SIZE), 3);

        let (tx, mut rx) = mpsc::channel(16);
        source.start(CaptureSpec::default(), tx).await.unwrap();

        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].payload.len(), 1280);
        assert_eq!(frames[1].payload.len(), 1280);
        assert_eq!(frames[2].payload.len(), 440);
        assert!(!frames[0].is_final);
        assert!(!frames[1].is_final);
        assert!(frames[2].is_final);
    }

    #[tokio::test]
    async fn test_file_source_exact_multiple_has_single_final() {
        let mut source = FileAudioSource::from_bytes(Bytes::from(vec![0u8; 2560]));
        let (tx, mut rx) = mpsc::channel(16);
        source.start(CaptureSpec::default(), tx).await.unwrap();

        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }

        assert_eq!(frames.len(), 2);
        assert!(!frames[0].is_final);
        assert!(frames[1].is_final);
        assert_eq!(frames.iter().filter(|f| f.is_final).count(), 1);
    }

    #[tokio::test]
    async fn test_open_missing_file_is_capture_read_error() {
        let result = FileAudioSource::open(Path::new("/nonexistent/audio.pcm")).await;
        assert!(matches!(result, Err(SttError::CaptureRead(_))));
    }
}
