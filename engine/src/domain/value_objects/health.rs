//! Health value objects
//! Verdicts recorded against running services

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch, clamped to 0 on clock skew
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
            HealthStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Outcome of one health probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthVerdict {
    pub status: HealthStatus,
    /// Probe round trip, present only for healthy verdicts
    pub latency_ms: Option<f64>,
    pub observed_at: u64,
    pub detail: Option<String>,
}

impl HealthVerdict {
    pub fn healthy(latency_ms: f64) -> Self {
        HealthVerdict {
            status: HealthStatus::Healthy,
            latency_ms: Some((latency_ms * 100.0).round() / 100.0),
            observed_at: epoch_secs(),
            detail: None,
        }
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        HealthVerdict {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            observed_at: epoch_secs(),
            detail: Some(detail.into()),
        }
    }

    pub fn unknown(detail: impl Into<String>) -> Self {
        HealthVerdict {
            status: HealthStatus::Unknown,
            latency_ms: None,
            observed_at: epoch_secs(),
            detail: Some(detail.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_healthy_rounds_latency() {
        let verdict = HealthVerdict::healthy(12.3456);
        assert_eq!(verdict.status, HealthStatus::Healthy);
        assert_eq!(verdict.latency_ms, Some(12.35));
        assert!(verdict.detail.is_none());
        assert!(verdict.observed_at > 0);
    }

    #[test]
    fn test_unhealthy_carries_detail() {
        let verdict = HealthVerdict::unhealthy("connection refused");
        assert_eq!(verdict.status, HealthStatus::Unhealthy);
        assert_eq!(verdict.detail.as_deref(), Some("connection refused"));
        assert!(verdict.latency_ms.is_none());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(HealthStatus::Healthy.to_string(), "healthy");
        assert_eq!(HealthStatus::Unhealthy.to_string(), "unhealthy");
        assert_eq!(HealthStatus::Unknown.to_string(), "unknown");
    }
}
