//! HealthProber port
//! Interface for probing a service health endpoint

use async_trait::async_trait;
use std::time::Duration;

/// What one probe of a health endpoint observed
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// 2xx answer within the timeout
    Up { latency_ms: f64 },
    /// Answered with a non-2xx status
    HttpError { status: u16 },
    /// No answer within the timeout
    Timeout,
    /// Nothing listening on the port
    ConnectionRefused,
    /// Transport-level failure other than the above
    Failed(String),
}

/// Port for health endpoint probing
#[async_trait]
pub trait HealthProber: Send + Sync {
    /// Probe `url` once, classifying the outcome instead of failing
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome;
}
