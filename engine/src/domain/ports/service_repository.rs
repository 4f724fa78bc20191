//! Repository port for the service registry
//! This is an interface - implementations are in infrastructure layer

use crate::domain::{DomainError, HealthVerdict, ServiceId, ServiceRecord};
use async_trait::async_trait;

/// Repository port for service records
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    /// Save a record (create or update)
    async fn save(&self, record: ServiceRecord) -> Result<(), DomainError>;

    /// Find a record by id
    async fn find_by_id(&self, id: &ServiceId) -> Result<Option<ServiceRecord>, DomainError>;

    /// List all records
    async fn find_all(&self) -> Result<Vec<ServiceRecord>, DomainError>;

    /// Remove a record
    async fn remove(&self, id: &ServiceId) -> Result<(), DomainError>;

    /// Attach a health verdict under the store lock
    ///
    /// Health probes run outside any state change; a read-modify-save
    /// from the prober would overwrite transitions that landed in
    /// between, so the verdict is written in place instead.
    async fn update_health(&self, id: &ServiceId, verdict: HealthVerdict)
        -> Result<(), DomainError>;

    /// Find a record or fail with ServiceNotFound
    async fn get(&self, id: &ServiceId) -> Result<ServiceRecord, DomainError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::ServiceNotFound(id.to_string()))
    }
}
