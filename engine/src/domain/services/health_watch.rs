//! Health Watch Service
//! Periodic health sweeps over every running service

use crate::domain::ports::ServiceRepository;
use crate::domain::services::LifecycleService;
use crate::domain::value_objects::{HealthStatus, ServiceState};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Recurring health checker
///
/// Each sweep probes every running service once and records the
/// verdict. A failing check is information for operators only; this
/// loop never stops or restarts anything.
pub struct HealthWatchService {
    repository: Arc<dyn ServiceRepository>,
    lifecycle: Arc<LifecycleService>,
    interval_sec: u64,
}

impl HealthWatchService {
    pub fn new(
        repository: Arc<dyn ServiceRepository>,
        lifecycle: Arc<LifecycleService>,
        interval_sec: u64,
    ) -> Self {
        Self {
            repository,
            lifecycle,
            interval_sec,
        }
    }

    /// Run sweeps until the cancellation token fires
    pub async fn run(&self, cancellation_token: CancellationToken) {
        info!(interval_sec = self.interval_sec, "Health watch started");
        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("Health watch received shutdown signal");
                    break;
                }
                _ = sleep(Duration::from_secs(self.interval_sec)) => {
                    self.sweep().await;
                }
            }
        }
        info!("Health watch stopped");
    }

    /// Probe every running service once
    pub async fn sweep(&self) {
        let records = match self.repository.find_all().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Failed to list services for health sweep");
                return;
            }
        };

        for record in records {
            if record.state() != ServiceState::Running {
                continue;
            }
            match self.lifecycle.check_health(record.id()).await {
                Ok(verdict) => {
                    if verdict.status == HealthStatus::Unhealthy {
                        warn!(
                            service = %record.id(),
                            detail = ?verdict.detail,
                            "Service is unhealthy"
                        );
                    } else {
                        debug!(
                            service = %record.id(),
                            status = %verdict.status,
                            "Health verdict recorded"
                        );
                    }
                }
                Err(e) => {
                    warn!(service = %record.id(), error = %e, "Health check did not complete")
                }
            }
        }
    }
}
