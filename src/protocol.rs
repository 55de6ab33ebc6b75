//! Messages sent to the browser client over the session socket.
//!
//! Inbound traffic is raw binary audio and has no envelope.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Outbound WebSocket message, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    /// Interim or final recognition text
    Transcription { content: String, is_final: bool },

    /// Translation of a finalized sentence
    Translation { content: String },

    /// Error reported by the recognition engine
    Error { content: String },
}

impl OutboundMessage {
    pub fn transcription(content: impl Into<String>, is_final: bool) -> Self {
        Self::Transcription {
            content: content.into(),
            is_final,
        }
    }

    pub fn translation(content: impl Into<String>) -> Self {
        Self::Translation {
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::Error {
            content: content.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transcription { .. } => "transcription",
            Self::Translation { .. } => "translation",
            Self::Error { .. } => "error",
        }
    }
}

/// Thread-safe handle onto a session's outbound path.
///
/// Sending never blocks, so it is safe from the recognition worker, from engine callback
/// threads and from translation tasks. Only the connection's writer task touches the socket.
pub type OutboundSender = mpsc::UnboundedSender<OutboundMessage>;
pub type OutboundReceiver = mpsc::UnboundedReceiver<OutboundMessage>;

pub fn outbound_channel() -> (OutboundSender, OutboundReceiver) {
    mpsc::unbounded_channel()
}
