use crate::session::SessionController;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Runs every client session
    pub sessions: Arc<SessionController>,

    /// Number of sessions currently connected
    pub active_sessions: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(sessions: SessionController) -> Self {
        Self {
            sessions: Arc::new(sessions),
            active_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn active_session_count(&self) -> usize {
        self.active_sessions.load(Ordering::SeqCst)
    }

    /// Count a connected session until the returned guard is dropped
    pub fn track_session(&self) -> ActiveSession {
        self.active_sessions.fetch_add(1, Ordering::SeqCst);
        ActiveSession {
            counter: Arc::clone(&self.active_sessions),
        }
    }
}

/// Registered session; leaves the active count when dropped, including on panic or cancellation
pub struct ActiveSession {
    counter: Arc<AtomicUsize>,
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
