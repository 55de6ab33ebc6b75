//! DashScope realtime speech recognition over the duplex inference WebSocket

mod messages;
mod recognizer;

pub use messages::{DashScopeEvent, DashScopeResult};
pub use recognizer::{DashScopeRecognizer, DashScopeRecognizerFactory};
