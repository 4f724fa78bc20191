//! StartService Command

use crate::domain::value_objects::{ServiceId, ServiceState};
use std::collections::BTreeMap;

/// Command to start a service
#[derive(Debug, Clone, Default)]
pub struct StartServiceCommand {
    pub service: String,
    /// Explicit ports per logical name, tried before persisted values
    pub ports: BTreeMap<String, u16>,
    /// Extra environment entries for the launched process
    pub env: Vec<(String, String)>,
    /// Plan in-band ports automatically instead of trusting defaults
    pub auto_ports: bool,
}

impl StartServiceCommand {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Default::default()
        }
    }

    pub fn with_ports(service: impl Into<String>, ports: BTreeMap<String, u16>) -> Self {
        Self {
            service: service.into(),
            ports,
            ..Default::default()
        }
    }
}

/// Response from starting a service
#[derive(Debug, Clone)]
pub struct StartServiceResponse {
    pub service: ServiceId,
    pub state: ServiceState,
    pub pid: Option<u32>,
    pub ports: BTreeMap<String, u16>,
}
