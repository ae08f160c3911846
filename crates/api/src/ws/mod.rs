//! WebSocket endpoint for per-file result notifications.
//!
//! A client opens one socket per uploaded file, names the file in its first
//! frame and then waits. The notification hub writes exactly one result and
//! closes the socket.

mod handler;
mod heartbeat;

pub use handler::{ws_handler, Subscribe};
pub use heartbeat::{start_expiry_sweep, start_heartbeat};
