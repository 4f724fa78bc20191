//! In-Memory Service Repository
//! Thread-safe implementation of the ServiceRepository port

use crate::domain::ports::ServiceRepository;
use crate::domain::{DomainError, HealthVerdict, ServiceId, ServiceRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Thread-safe in-memory service registry
///
/// The registry is rebuilt from a scan on every boot; nothing here
/// survives a restart on purpose. The per-service `.env` files carry
/// the only durable state.
#[derive(Clone)]
pub struct InMemoryServiceRepository {
    services: Arc<RwLock<HashMap<ServiceId, ServiceRecord>>>,
}

impl InMemoryServiceRepository {
    pub fn new() -> Self {
        Self {
            services: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryServiceRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceRepository for InMemoryServiceRepository {
    async fn save(&self, record: ServiceRecord) -> Result<(), DomainError> {
        debug!(
            service = %record.id(),
            state = %record.state(),
            "Saving service record"
        );
        let mut services = self.services.write().unwrap();
        services.insert(record.id().clone(), record);
        Ok(())
    }

    async fn find_by_id(&self, id: &ServiceId) -> Result<Option<ServiceRecord>, DomainError> {
        let services = self.services.read().unwrap();
        Ok(services.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<ServiceRecord>, DomainError> {
        let services = self.services.read().unwrap();
        Ok(services.values().cloned().collect())
    }

    async fn remove(&self, id: &ServiceId) -> Result<(), DomainError> {
        let mut services = self.services.write().unwrap();
        services.remove(id);
        debug!(
            service = %id,
            remaining = services.len(),
            "Removed service record"
        );
        Ok(())
    }

    async fn update_health(
        &self,
        id: &ServiceId,
        verdict: HealthVerdict,
    ) -> Result<(), DomainError> {
        let mut services = self.services.write().unwrap();
        match services.get_mut(id) {
            Some(record) => {
                record.record_health(verdict);
                Ok(())
            }
            None => Err(DomainError::ServiceNotFound(id.to_string())),
        }
    }
}
