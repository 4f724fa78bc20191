//! GetServiceStatus use case

use crate::domain::ports::ServiceRepository;
use crate::domain::value_objects::ServiceId;
use crate::domain::{DomainError, GetServiceStatusQuery, ServiceStatusResponse};
use async_trait::async_trait;
use std::sync::Arc;

/// Use case for reading one service record
#[async_trait]
pub trait GetServiceStatus: Send + Sync {
    async fn execute(
        &self,
        query: GetServiceStatusQuery,
    ) -> Result<ServiceStatusResponse, DomainError>;
}

/// Implementation of GetServiceStatus use case
pub struct GetServiceStatusUseCase {
    repository: Arc<dyn ServiceRepository>,
}

impl GetServiceStatusUseCase {
    pub fn new(repository: Arc<dyn ServiceRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl GetServiceStatus for GetServiceStatusUseCase {
    async fn execute(
        &self,
        query: GetServiceStatusQuery,
    ) -> Result<ServiceStatusResponse, DomainError> {
        let id = ServiceId::new(&query.service);
        let service = self.repository.get(&id).await?;

        Ok(ServiceStatusResponse { service })
    }
}
