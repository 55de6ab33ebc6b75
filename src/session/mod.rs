//! Client session management
//!
//! This module provides the `SessionController` that, for each connection:
//! - Launches the transcoder and forwards client audio into it
//! - Runs the recognition worker on a dedicated thread
//! - Tears everything down in order on disconnect or error

mod config;
mod controller;
mod stats;

pub use config::SessionConfig;
pub use controller::SessionController;
pub use stats::{SessionState, SessionStats};
