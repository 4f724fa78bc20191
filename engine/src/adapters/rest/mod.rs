//! REST API Driving Adapter
//!
//! Exposes the agent's use cases as an HTTP API (JSON)
//!
//! Supports multiple transports:
//! - TCP (all platforms, the default)
//! - Unix sockets (Linux/macOS)

pub mod handlers;
pub mod router;
pub mod unix_socket;

pub use handlers::AppState;
pub use router::build_router;
pub use unix_socket::{serve_on_tcp, serve_on_unix_socket};
