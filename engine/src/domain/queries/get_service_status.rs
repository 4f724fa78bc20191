//! GetServiceStatus Query

use crate::domain::entities::ServiceRecord;

/// Query for one service in the registry
#[derive(Debug, Clone)]
pub struct GetServiceStatusQuery {
    pub service: String,
}

impl GetServiceStatusQuery {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

/// Response with the full registry record
#[derive(Debug, Clone)]
pub struct ServiceStatusResponse {
    pub service: ServiceRecord,
}
