//! RefreshManifest Command

use crate::domain::value_objects::ServiceId;

/// Command to regenerate a service manifest in the background
#[derive(Debug, Clone)]
pub struct RefreshManifestCommand {
    pub service: String,
}

impl RefreshManifestCommand {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

/// Response acknowledging that regeneration was scheduled
#[derive(Debug, Clone)]
pub struct RefreshManifestResponse {
    pub service: ServiceId,
    pub scheduled: bool,
}
