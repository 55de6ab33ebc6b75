//! HTTP/WebSocket server
//!
//! - GET /ws - Live audio session (binary audio in, JSON messages out)
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::HealthResponse;
pub use routes::create_router;
pub use state::{ActiveSession, AppState};
