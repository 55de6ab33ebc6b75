use anyhow::Result;
use std::sync::Arc;

use super::result::RecognitionResult;

/// Error reported by a recognition engine through its callback
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RecognitionError {
    /// Engine-specific error code, when the engine provides one
    pub code: Option<String>,
    pub message: String,
}

impl RecognitionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// Receiver of engine events.
///
/// Engines may call these from any thread, including threads they own, so
/// implementations must not touch the client connection directly.
pub trait RecognitionCallback: Send + Sync {
    fn on_open(&self);

    fn on_complete(&self);

    fn on_close(&self);

    fn on_event(&self, result: &dyn RecognitionResult);

    fn on_error(&self, error: &RecognitionError);
}

/// Streaming speech recognizer with a blocking call interface
///
/// Implementations:
/// - DashScope realtime recognition over WebSocket
/// - Scripted engines in tests
pub trait RecognitionEngine: Send {
    /// Open a recognition session; blocks until the engine accepts audio
    fn start(&mut self) -> Result<()>;

    /// Push one chunk of canonical PCM
    fn send_audio_frame(&mut self, frame: &[u8]) -> Result<()>;

    /// Finish the recognition session.
    ///
    /// Must be safe to call repeatedly and after a failed `start`.
    fn stop(&mut self) -> Result<()>;

    /// Engine name for logging
    fn name(&self) -> &str;
}

/// Creates one engine per session, wired to that session's callback
pub trait RecognizerFactory: Send + Sync {
    fn create(&self, callback: Arc<dyn RecognitionCallback>) -> Result<Box<dyn RecognitionEngine>>;
}
