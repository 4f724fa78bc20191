//! HTTP Prober
//! ureq-based implementation of the HealthProber port
//!
//! ureq is synchronous, so every probe runs under `spawn_blocking`
//! with the timeout enforced by the agent itself.

use crate::domain::ports::{HealthProber, ProbeOutcome};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

/// Health prober speaking plain HTTP GET
pub struct HttpHealthProber;

impl HttpHealthProber {
    pub fn new() -> Self {
        Self
    }

    fn classify_transport(transport: &ureq::Transport) -> ProbeOutcome {
        let mut source = std::error::Error::source(transport);
        while let Some(err) = source {
            if let Some(io) = err.downcast_ref::<std::io::Error>() {
                return match io.kind() {
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                        ProbeOutcome::Timeout
                    }
                    std::io::ErrorKind::ConnectionRefused => ProbeOutcome::ConnectionRefused,
                    _ => ProbeOutcome::Failed(io.to_string()),
                };
            }
            source = err.source();
        }

        let message = transport.to_string();
        if message.contains("timed out") {
            ProbeOutcome::Timeout
        } else if message.contains("Connection refused") {
            ProbeOutcome::ConnectionRefused
        } else {
            ProbeOutcome::Failed(message)
        }
    }
}

impl Default for HttpHealthProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HealthProber for HttpHealthProber {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        let url = url.to_string();

        let outcome = tokio::task::spawn_blocking(move || {
            let agent = ureq::AgentBuilder::new().timeout(timeout).build();
            let started = Instant::now();

            match agent.get(&url).call() {
                Ok(response) => {
                    let status = response.status();
                    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                    debug!(url = %url, status = status, latency_ms = latency_ms, "Probe answered");
                    if (200..300).contains(&status) {
                        ProbeOutcome::Up { latency_ms }
                    } else {
                        ProbeOutcome::HttpError { status }
                    }
                }
                Err(ureq::Error::Status(status, _)) => {
                    debug!(url = %url, status = status, "Probe answered with error status");
                    ProbeOutcome::HttpError { status }
                }
                Err(ureq::Error::Transport(transport)) => {
                    debug!(url = %url, error = %transport, "Probe transport failure");
                    Self::classify_transport(&transport)
                }
            }
        })
        .await;

        match outcome {
            Ok(outcome) => outcome,
            Err(e) => ProbeOutcome::Failed(format!("Probe task panicked: {}", e)),
        }
    }
}
