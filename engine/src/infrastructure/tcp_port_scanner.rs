//! TCP Port Scanner
//! Bind-test implementation of the PortScanner port

use crate::domain::ports::PortScanner;
use std::net::TcpListener;
use tracing::trace;

/// Checks port availability by briefly binding it on loopback
///
/// A successful bind is immediately dropped, so the check is a point
/// in time only; the allocation table is what prevents two services
/// from racing for the same number inside this process.
pub struct TcpPortScanner;

impl TcpPortScanner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TcpPortScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl PortScanner for TcpPortScanner {
    fn is_free(&self, port: u16) -> bool {
        let free = TcpListener::bind(("127.0.0.1", port)).is_ok();
        trace!(port = port, free = free, "Port bind check");
        free
    }
}
