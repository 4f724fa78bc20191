//! StopService Command

use crate::domain::ports::StopOutcome;
use crate::domain::value_objects::{ServiceId, ServiceState};

/// Command to stop a running service
#[derive(Debug, Clone)]
pub struct StopServiceCommand {
    pub service: String,
}

impl StopServiceCommand {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

/// Response from stopping a service
#[derive(Debug, Clone)]
pub struct StopServiceResponse {
    pub service: ServiceId,
    pub state: ServiceState,
    pub outcome: StopOutcome,
}
