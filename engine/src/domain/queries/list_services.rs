//! ListServices Query

use crate::domain::entities::ServiceRecord;

/// Response from listing the registry, sorted by service id
#[derive(Debug, Clone)]
pub struct ListServicesResponse {
    pub services: Vec<ServiceRecord>,
}
