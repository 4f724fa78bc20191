//! RestartService Command

use crate::domain::value_objects::{ServiceId, ServiceState};
use std::collections::BTreeMap;

/// Command to restart a service, reusing its previous ports by default
#[derive(Debug, Clone, Default)]
pub struct RestartServiceCommand {
    pub service: String,
    /// Explicit ports per logical name; empty means keep the previous assignment
    pub ports: BTreeMap<String, u16>,
    /// Extra environment entries for the relaunched process
    pub env: Vec<(String, String)>,
}

impl RestartServiceCommand {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Default::default()
        }
    }
}

/// Response from restarting a service
#[derive(Debug, Clone)]
pub struct RestartServiceResponse {
    pub service: ServiceId,
    pub state: ServiceState,
    pub pid: Option<u32>,
    pub ports: BTreeMap<String, u16>,
}
