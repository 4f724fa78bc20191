//! Mock repository implementation for testing
//! This is a simple in-memory implementation for unit tests

use crate::domain::{DomainError, HealthVerdict, ServiceId, ServiceRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::ServiceRepository;

/// In-memory mock repository for testing
#[derive(Clone)]
pub struct MockRepository {
    storage: Arc<Mutex<HashMap<ServiceId, ServiceRecord>>>,
}

impl MockRepository {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        Self {
            storage: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get the current number of records stored
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.storage.lock().unwrap().len()
    }

    /// Check if the repository is empty
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.storage.lock().unwrap().is_empty()
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceRepository for MockRepository {
    async fn save(&self, record: ServiceRecord) -> Result<(), DomainError> {
        let mut storage = self.storage.lock().unwrap();
        storage.insert(record.id().clone(), record);
        Ok(())
    }

    async fn find_by_id(&self, id: &ServiceId) -> Result<Option<ServiceRecord>, DomainError> {
        let storage = self.storage.lock().unwrap();
        Ok(storage.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<ServiceRecord>, DomainError> {
        let storage = self.storage.lock().unwrap();
        Ok(storage.values().cloned().collect())
    }

    async fn remove(&self, id: &ServiceId) -> Result<(), DomainError> {
        let mut storage = self.storage.lock().unwrap();
        storage.remove(id);
        Ok(())
    }

    async fn update_health(
        &self,
        id: &ServiceId,
        verdict: HealthVerdict,
    ) -> Result<(), DomainError> {
        let mut storage = self.storage.lock().unwrap();
        match storage.get_mut(id) {
            Some(record) => {
                record.record_health(verdict);
                Ok(())
            }
            None => Err(DomainError::ServiceNotFound(id.to_string())),
        }
    }
}
