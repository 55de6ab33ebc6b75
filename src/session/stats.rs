use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Launching the transcoder and the recognition worker
    Connecting,
    /// Forwarding client audio
    Active,
    /// Cancelling the worker and terminating the transcoder
    Draining,
    /// All resources released
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Connecting => "connecting",
            SessionState::Active => "active",
            SessionState::Draining => "draining",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Statistics about a finished (or running) session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,

    pub state: SessionState,

    /// When the connection was accepted
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Non-empty audio frames received from the client
    pub frames_received: usize,

    /// Bytes written to the transcoder
    pub bytes_forwarded: usize,

    /// PCM chunks pushed to the recognition engine, once the worker has been joined
    pub frames_recognized: Option<usize>,
}
